//! Roster reconciliation and session-duration accrual.

use crate::events::{PresenceEvent, PresenceKind};
use palwarden_db::{Database, DbError};
use std::collections::BTreeMap;
use tracing::debug;

/// Observed roster: user id mapped to account name.
pub type Roster = BTreeMap<String, String>;

/// Per-server reconciliation state, owned exclusively by that server's
/// poller task.
///
/// The tracker starts cold: the first successfully observed roster becomes
/// the baseline without emitting join events, so a restart never produces a
/// mass-join burst. Accrual happens only when a session closes; an open
/// session's duration is always computed on demand from `session_start`, so
/// long sessions and restarts never drift.
pub struct SessionTracker {
    db: Database,
    server_name: String,
    previous: Option<Roster>,
}

impl SessionTracker {
    pub fn new(db: Database, server_name: String) -> Self {
        Self {
            db,
            server_name,
            previous: None,
        }
    }

    /// Whether a baseline roster has been observed since (re)start.
    pub fn is_tracking(&self) -> bool {
        self.previous.is_some()
    }

    /// Compare `current` against the previously tracked roster, open/close
    /// sessions accordingly and derive join/leave events.
    pub async fn reconcile(&mut self, current: &Roster, now: i64) -> Result<Vec<PresenceEvent>, DbError> {
        let Some(previous) = &self.previous else {
            // Cold start: the observed set becomes the baseline with no join
            // events, but accrual still starts for everyone present.
            debug!(server = %self.server_name, players = current.len(), "roster baseline");
            for user_id in current.keys() {
                self.db.open_session(user_id.clone(), now).await?;
            }
            self.previous = Some(current.clone());
            return Ok(Vec::new());
        };

        let mut events = Vec::new();

        for (user_id, account_name) in current {
            if previous.contains_key(user_id) {
                // Continuing member, untouched
                continue;
            }
            // Open or reopen; a no-op when a session is already open under
            // this uid on another server (accepted double-count edge)
            self.db.open_session(user_id.clone(), now).await?;
            events.push(PresenceEvent {
                kind: PresenceKind::Joined,
                user_id: user_id.clone(),
                account_name: account_name.clone(),
                server_name: self.server_name.clone(),
                timestamp: now,
            });
        }

        for (user_id, account_name) in previous {
            if current.contains_key(user_id) {
                continue;
            }
            let delta = self.db.close_session(user_id.clone(), now).await?;
            debug!(server = %self.server_name, %user_id, ?delta, "session closed");
            events.push(PresenceEvent {
                kind: PresenceKind::Left,
                user_id: user_id.clone(),
                account_name: account_name.clone(),
                server_name: self.server_name.clone(),
                timestamp: now,
            });
        }

        self.previous = Some(current.clone());
        Ok(events)
    }

    /// Fail-safe closure for a tick with no usable roster: an unreachable
    /// server is treated as having zero players. A no-op while still cold.
    pub async fn close_all(&mut self, now: i64) -> Result<Vec<PresenceEvent>, DbError> {
        if !self.is_tracking() {
            return Ok(Vec::new());
        }
        self.reconcile(&Roster::new(), now).await
    }
}
