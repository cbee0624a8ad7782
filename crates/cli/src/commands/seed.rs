//! Seed discount rules and email templates from YAML files.
//!
//! Both files are validated completely before the database is touched.
//! Percentages are quoted strings so they parse as exact decimals.
//!
//! ```yaml
//! # pricing.yaml
//! volume_discounts:
//!   - min_quantity: 3
//!     percent: "10"
//! bundles:
//!   - name: Starter kit
//!     product_ids: ["gid://shopify/Product/1", "gid://shopify/Product/2"]
//!     percent: "15"
//! ```
//!
//! ```yaml
//! # templates.yaml
//! - key: order_confirmation
//!   subject: "Order {{ order_number }} confirmed"
//!   html_body: "<p>Thanks, {{ name }}!</p>"
//!   text_body: "Thanks, {{ name }}!"
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{error, info, warn};

use greenleaf_admin::db::content::EmailTemplateFields;
use greenleaf_admin::db::pricing::{BundleFields, VolumeDiscountFields};
use greenleaf_admin::db::{self, EmailTemplateRepository, PricingRepository, RepositoryError};
use greenleaf_core::BundleId;
use greenleaf_core::pricing::{BundleRule, VolumeTier};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PricingSeed {
    #[serde(default)]
    pub volume_discounts: Vec<VolumeSeed>,
    #[serde(default)]
    pub bundles: Vec<BundleSeed>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VolumeSeed {
    pub min_quantity: u32,
    pub percent: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleSeed {
    pub name: String,
    pub product_ids: Vec<String>,
    pub percent: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateSeed {
    pub key: String,
    pub subject: String,
    #[serde(default)]
    pub html_body: String,
    #[serde(default)]
    pub text_body: String,
}

/// Validate every rule, collecting one message per bad entry.
fn validate_pricing(seed: &PricingSeed) -> Vec<String> {
    let mut errors = Vec::new();
    for (i, tier) in seed.volume_discounts.iter().enumerate() {
        if let Err(e) = VolumeTier::new(tier.min_quantity, tier.percent) {
            errors.push(format!("volume_discounts[{i}]: {e}"));
        } else if i32::try_from(tier.min_quantity).is_err() {
            errors.push(format!("volume_discounts[{i}]: min_quantity too large"));
        }
    }
    for (i, bundle) in seed.bundles.iter().enumerate() {
        if bundle.name.trim().is_empty() {
            errors.push(format!("bundles[{i}]: name cannot be empty"));
        }
        let rule = BundleRule {
            id: BundleId::new(0),
            name: bundle.name.clone(),
            product_ids: bundle.product_ids.clone(),
            percent: bundle.percent,
        };
        if let Err(e) = rule.validate() {
            errors.push(format!("bundles[{i}] ({}): {e}", bundle.name));
        }
    }
    errors
}

fn validate_templates(seed: &[TemplateSeed]) -> Vec<String> {
    let mut errors = Vec::new();
    for (i, template) in seed.iter().enumerate() {
        let key = template.key.trim();
        if key.is_empty() {
            errors.push(format!("templates[{i}]: key cannot be empty"));
        }
        if template.subject.trim().is_empty() {
            errors.push(format!("templates[{i}] ({key}): subject cannot be empty"));
        }
        if template.html_body.trim().is_empty() && template.text_body.trim().is_empty() {
            errors.push(format!("templates[{i}] ({key}): needs an HTML or a text body"));
        }
        if seed.iter().take(i).any(|earlier| earlier.key.trim() == key) {
            errors.push(format!("templates[{i}]: duplicate key {key}"));
        }
    }
    errors
}

async fn read_yaml<T: for<'de> Deserialize<'de>>(
    file_path: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }
    info!(path = %file_path, "Loading seed file");
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_yaml::from_str(&content)?)
}

fn report(errors: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    if errors.is_empty() {
        return Ok(());
    }
    error!("Seed validation failed:");
    for err in errors {
        error!("  - {err}");
    }
    Err(format!("{} validation errors found", errors.len()).into())
}

async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("ADMIN_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "ADMIN_DATABASE_URL not set")?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");
    Ok(pool)
}

/// Insert volume tiers and bundles. Rules that already exist are skipped.
///
/// # Errors
///
/// Returns an error if the file is missing or invalid, or a database
/// operation fails.
pub async fn pricing(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let seed: PricingSeed = read_yaml(file_path).await?;
    report(&validate_pricing(&seed))?;

    let pool = connect().await?;
    let repo = PricingRepository::new(&pool);
    let (mut inserted, mut skipped) = (0_usize, 0_usize);

    for tier in seed.volume_discounts {
        let fields = VolumeDiscountFields {
            min_quantity: i32::try_from(tier.min_quantity)?,
            percent: tier.percent,
            active: true,
        };
        match repo.create_volume_discount(fields).await {
            Ok(_) => inserted += 1,
            Err(RepositoryError::Conflict(msg)) => {
                warn!(min_quantity = tier.min_quantity, "Skipped: {msg}");
                skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let existing = repo.list_bundles().await?;
    for bundle in seed.bundles {
        let name = bundle.name.trim().to_owned();
        if existing.iter().any(|b| b.name == name) {
            warn!(%name, "Skipped: bundle already exists");
            skipped += 1;
            continue;
        }
        let mut product_ids: Vec<String> = Vec::with_capacity(bundle.product_ids.len());
        for id in bundle.product_ids {
            let id = id.trim().to_owned();
            if !product_ids.contains(&id) {
                product_ids.push(id);
            }
        }
        repo.create_bundle(&BundleFields {
            name,
            product_ids,
            percent: bundle.percent,
            active: true,
        })
        .await?;
        inserted += 1;
    }

    info!("Seeding complete!");
    info!("  Rules inserted: {inserted}");
    info!("  Rules skipped (already exist): {skipped}");
    Ok(())
}

/// Upsert email templates by key.
///
/// # Errors
///
/// Returns an error if the file is missing or invalid, or a database
/// operation fails.
pub async fn templates(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let seed: Vec<TemplateSeed> = read_yaml(file_path).await?;
    report(&validate_templates(&seed))?;

    let pool = connect().await?;
    let repo = EmailTemplateRepository::new(&pool);
    for template in seed {
        let saved = repo
            .upsert(&EmailTemplateFields {
                key: template.key.trim().to_owned(),
                subject: template.subject.trim().to_owned(),
                html_body: template.html_body.trim().to_owned(),
                text_body: template.text_body.trim().to_owned(),
            })
            .await?;
        info!(key = %saved.key, "Template saved");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pricing_seed_parses() {
        let seed: PricingSeed = serde_yaml::from_str(
            r#"
volume_discounts:
  - min_quantity: 3
    percent: "10"
bundles:
  - name: Starter kit
    product_ids: ["gid://shopify/Product/1", "gid://shopify/Product/2"]
    percent: "12.5"
"#,
        )
        .unwrap();
        assert_eq!(seed.volume_discounts.len(), 1);
        assert_eq!(seed.bundles[0].percent, Decimal::new(125, 1));
        assert!(validate_pricing(&seed).is_empty());
    }

    #[test]
    fn test_pricing_seed_reports_every_bad_rule() {
        let seed = PricingSeed {
            volume_discounts: vec![VolumeSeed {
                min_quantity: 0,
                percent: Decimal::TEN,
            }],
            bundles: vec![BundleSeed {
                name: "Solo".into(),
                product_ids: vec!["gid://shopify/Product/1".into()],
                percent: Decimal::TEN,
            }],
        };
        assert_eq!(validate_pricing(&seed).len(), 2);
    }

    #[test]
    fn test_template_seed_rejects_duplicates() {
        let seed: Vec<TemplateSeed> = serde_yaml::from_str(
            r#"
- key: welcome
  subject: Hi
  text_body: Hello {{ name }}
- key: welcome
  subject: Hi again
  html_body: <p>Hello</p>
"#,
        )
        .unwrap();
        let errors = validate_templates(&seed);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("duplicate key"));
    }
}
