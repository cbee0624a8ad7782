//! Webhook delivery log.

use sqlx::PgConnection;

use super::RepositoryError;

/// Claim a delivery id.
///
/// Returns `false` if another transaction already recorded it. Run this
/// first in the processing transaction: the primary key serializes
/// concurrent redeliveries, and a rollback releases the claim.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn claim_delivery(
    conn: &mut PgConnection,
    webhook_id: &str,
    topic: &str,
    shop_domain: Option<&str>,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        INSERT INTO storefront.webhook_event (webhook_id, topic, shop_domain)
        VALUES ($1, $2, $3)
        ON CONFLICT (webhook_id) DO NOTHING
        ",
    )
    .bind(webhook_id)
    .bind(topic)
    .bind(shop_domain)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
