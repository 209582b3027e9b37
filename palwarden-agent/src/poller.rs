//! Presence polling: per-server roster fetch + reconciliation loop.

use crate::api::{PlayerEntry, ServerApi};
use crate::error::ApiError;
use crate::helpers::now;
use crate::sessions::{Roster, SessionTracker};
use crate::sink::EventSink;
use palwarden_db::{Database, DbError, PlayerRecord, ServerConfig};
use std::time::Duration;
use tracing::{error, warn};

/// Indefinitely repeating presence poll for one server.
///
/// Any error inside one iteration is absorbed at the iteration boundary; the
/// fixed interval itself is the retry mechanism.
pub async fn run_presence_poller<S: EventSink>(
    db: Database,
    api: ServerApi,
    sink: S,
    server: ServerConfig,
    interval: Duration,
) {
    let mut tracker = SessionTracker::new(db.clone(), server.server_name.clone());
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if let Err(err) = poll_once(&db, &api, &sink, &server, &mut tracker).await {
            error!(server = %server.server_name, %err, "presence poll failed");
        }
    }
}

async fn poll_once<S: EventSink>(
    db: &Database,
    api: &ServerApi,
    sink: &S,
    server: &ServerConfig,
    tracker: &mut SessionTracker,
) -> Result<(), DbError> {
    let timestamp = now();

    let events = match api.get_players().await {
        Ok(players) => {
            for player in &players {
                db.upsert_player(to_record(player)).await?;
            }
            let roster: Roster = players
                .iter()
                .map(|p| (p.user_id.clone(), display_name(p)))
                .collect();
            tracker.reconcile(&roster, timestamp).await?
        }
        Err(ApiError::AuthFailed) => {
            // Distinct from an outage so operators can spot misconfiguration
            error!(
                server = %server.server_name,
                "credential rejected, check the configured admin password"
            );
            tracker.close_all(timestamp).await?
        }
        Err(err) => {
            // Fail-safe: an unreachable server has zero players
            warn!(server = %server.server_name, %err, "roster unavailable, closing open sessions");
            tracker.close_all(timestamp).await?
        }
    };

    for event in events {
        sink.presence(event).await;
    }

    Ok(())
}

fn display_name(player: &PlayerEntry) -> String {
    if player.account_name.is_empty() {
        player.name.clone()
    } else {
        player.account_name.clone()
    }
}

fn to_record(player: &PlayerEntry) -> PlayerRecord {
    PlayerRecord {
        user_id: player.user_id.clone(),
        name: player.name.clone(),
        account_name: player.account_name.clone(),
        ip: player.ip.clone(),
        ping: player.ping,
        location_x: player.location_x,
        location_y: player.location_y,
        level: player.level,
    }
}
