//! Periodic server info/metrics refresh for the status display.

use crate::api::ServerApi;
use crate::events::StatusEvent;
use crate::sink::EventSink;
use std::time::Duration;
use tracing::warn;

/// Indefinitely repeating status refresh for one server. Either API call
/// failing skips the tick.
pub async fn run_status_refresh<S: EventSink>(
    api: ServerApi,
    sink: S,
    server_name: String,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let info = match api.get_info().await {
            Ok(info) => info,
            Err(err) => {
                warn!(server = %server_name, %err, "status refresh skipped");
                continue;
            }
        };
        let metrics = match api.get_metrics().await {
            Ok(metrics) => metrics,
            Err(err) => {
                warn!(server = %server_name, %err, "status refresh skipped");
                continue;
            }
        };

        sink.status(StatusEvent {
            server_name: server_name.clone(),
            info,
            metrics,
        })
        .await;
    }
}
