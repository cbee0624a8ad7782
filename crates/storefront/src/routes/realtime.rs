//! Server-sent change feed.
//!
//! Each event is named after its channel (`donations`, `orders`,
//! `product_sales`) and carries the [`ChangeEvent`] as JSON. Slow clients
//! that fall behind the broadcast buffer get a `lagged` comment and resume
//! from the newest events.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, instrument};

use crate::error::{AppError, Result};
use crate::services::{ChangeEvent, FeedChannel};
use crate::state::AppState;

const KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Feed query parameters.
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// Comma-separated channel names; all channels when omitted.
    #[serde(default)]
    pub channels: String,
}

/// Subscribe to row changes.
///
/// GET /api/realtime?channels=donations,orders
#[instrument(skip(state))]
pub async fn stream(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let channels = FeedChannel::parse_list(&query.channels)
        .map_err(|name| AppError::BadRequest(format!("unknown channel: {name}")))?;
    let rx = state.realtime().subscribe();
    debug!(
        subscribers = state.realtime().subscriber_count(),
        "Realtime subscriber connected"
    );

    let stream = stream::unfold((rx, channels), |(mut rx, channels)| async move {
        loop {
            match rx.recv().await {
                Ok(event) if channels.contains(&event.channel) => {
                    return Some((Ok(to_sse(&event)), (rx, channels)));
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Realtime subscriber lagged");
                    return Some((Ok(Event::default().comment("lagged")), (rx, channels)));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE).text("ping")))
}

fn to_sse(event: &ChangeEvent) -> Event {
    let json = serde_json::to_string(event).unwrap_or_default();
    Event::default().event(event.channel.as_str()).data(json)
}
