use crate::api::{ServerInfo, ServerMetrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceKind {
    Joined,
    Left,
}

/// A derived join/leave notification for one player on one server.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceEvent {
    pub kind: PresenceKind,
    pub user_id: String,
    pub account_name: String,
    pub server_name: String,
    /// Unix timestamp of the reconciliation that derived this event
    pub timestamp: i64,
}

/// A chat line lifted from a server's log file.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEvent {
    /// Chat channel tag (e.g. "Global")
    pub channel: String,
    pub username: String,
    pub message: String,
    pub server_name: String,
}

/// A periodic snapshot of one server's info and metrics.
#[derive(Debug, Clone)]
pub struct StatusEvent {
    pub server_name: String,
    pub info: ServerInfo,
    pub metrics: ServerMetrics,
}
