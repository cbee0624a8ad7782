//! Realtime change feed.
//!
//! Database triggers `pg_notify` on the `donations`, `orders` and
//! `product_sales` channels. One `PgListener` per process forwards those
//! notifications into a broadcast channel that SSE subscribers read from.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Events buffered per subscriber before it starts lagging.
const CHANNEL_CAPACITY: usize = 256;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// A notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedChannel {
    Donations,
    Orders,
    ProductSales,
}

impl FeedChannel {
    /// Every channel the hub listens on.
    pub const ALL: [Self; 3] = [Self::Donations, Self::Orders, Self::ProductSales];

    /// Postgres channel name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Donations => "donations",
            Self::Orders => "orders",
            Self::ProductSales => "product_sales",
        }
    }

    /// Parse a comma-separated list; empty input means every channel.
    ///
    /// # Errors
    ///
    /// Returns the first unknown channel name.
    pub fn parse_list(list: &str) -> Result<Vec<Self>, String> {
        let mut channels = Vec::new();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let channel = name.parse()?;
            if !channels.contains(&channel) {
                channels.push(channel);
            }
        }
        if channels.is_empty() {
            return Ok(Self::ALL.to_vec());
        }
        Ok(channels)
    }
}

impl fmt::Display for FeedChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "donations" => Ok(Self::Donations),
            "orders" => Ok(Self::Orders),
            "product_sales" => Ok(Self::ProductSales),
            other => Err(other.to_owned()),
        }
    }
}

/// One row change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub channel: FeedChannel,
    /// `INSERT` or `UPDATE`.
    pub op: String,
    pub row: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct NotifyPayload {
    op: String,
    row: serde_json::Value,
}

impl ChangeEvent {
    /// Decode a trigger payload.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown channels or malformed JSON.
    pub fn from_notification(channel: &str, payload: &str) -> Result<Self, String> {
        let channel = channel.parse()?;
        let NotifyPayload { op, row } =
            serde_json::from_str(payload).map_err(|e| e.to_string())?;
        Ok(Self { channel, op, row })
    }
}

/// Fan-out point for change events.
#[derive(Clone)]
pub struct RealtimeHub {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeHub {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Receive every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Current number of subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish an event, returning how many subscribers got it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Start forwarding Postgres notifications to subscribers.
    ///
    /// The task reconnects after errors and runs until the runtime shuts down.
    #[must_use]
    pub fn spawn_listener(&self, pool: PgPool) -> JoinHandle<()> {
        let hub = self.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = hub.listen(&pool).await {
                    warn!(error = %e, "Realtime listener failed, reconnecting");
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        })
    }

    async fn listen(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        let mut listener = PgListener::connect_with(pool).await?;
        listener
            .listen_all(FeedChannel::ALL.iter().map(|c| c.as_str()))
            .await?;
        info!("Realtime listener connected");

        loop {
            let notification = listener.recv().await?;
            match ChangeEvent::from_notification(notification.channel(), notification.payload()) {
                Ok(event) => {
                    let delivered = self.publish(event);
                    debug!(channel = notification.channel(), delivered, "Forwarded change");
                }
                Err(e) => warn!(
                    channel = notification.channel(),
                    error = %e,
                    "Ignoring malformed notification"
                ),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channel_list() {
        assert_eq!(FeedChannel::parse_list("").unwrap(), FeedChannel::ALL.to_vec());
        assert_eq!(
            FeedChannel::parse_list("orders, donations,orders").unwrap(),
            vec![FeedChannel::Orders, FeedChannel::Donations]
        );
        assert_eq!(FeedChannel::parse_list("orders,users"), Err("users".to_owned()));
    }

    #[test]
    fn test_change_event_from_notification() {
        let event = ChangeEvent::from_notification(
            "donations",
            r#"{"op":"INSERT","row":{"id":7,"amount":"6.60"}}"#,
        )
        .unwrap();
        assert_eq!(event.channel, FeedChannel::Donations);
        assert_eq!(event.op, "INSERT");
        assert_eq!(event.row["id"], 7);

        assert!(ChangeEvent::from_notification("nope", "{}").is_err());
        assert!(ChangeEvent::from_notification("orders", "not json").is_err());
    }

    #[tokio::test]
    async fn test_hub_fan_out() {
        let hub = RealtimeHub::new();
        assert_eq!(hub.publish(event()), 0);

        let mut a = hub.subscribe();
        let mut b = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);
        assert_eq!(hub.publish(event()), 2);

        assert_eq!(a.recv().await.unwrap().channel, FeedChannel::Orders);
        assert_eq!(b.recv().await.unwrap().op, "UPDATE");

        drop(a);
        assert_eq!(hub.subscriber_count(), 1);
    }

    fn event() -> ChangeEvent {
        ChangeEvent {
            channel: FeedChannel::Orders,
            op: "UPDATE".to_owned(),
            row: serde_json::json!({"id": 1, "status": "fulfilled"}),
        }
    }
}
