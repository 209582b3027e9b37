//! Kick players that connect with a placeholder user id.
//!
//! The game occasionally admits players whose id never resolved; they show
//! up in the roster with a `null_` prefix and break every id-keyed lookup.

use crate::api::ServerApi;
use std::time::Duration;
use tracing::{debug, info, warn};

const NULL_ID_MARKER: &str = "null_";
const KICK_REASON: &str = "Invalid ID detected.";

/// Indefinitely repeating null-ID sweep for one server.
pub async fn run_null_sweep(api: ServerApi, server_name: String, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let players = match api.get_players().await {
            Ok(players) => players,
            Err(err) => {
                debug!(server = %server_name, %err, "null sweep skipped");
                continue;
            }
        };

        for player in players {
            if !player.user_id.contains(NULL_ID_MARKER) {
                continue;
            }
            match api.kick(&player.user_id, KICK_REASON).await {
                Ok(()) => {
                    info!(server = %server_name, user_id = %player.user_id, "kicked null-id player")
                }
                Err(err) => {
                    warn!(server = %server_name, user_id = %player.user_id, %err, "null-id kick failed")
                }
            }
        }
    }
}
