/// A configured game server, keyed by (guild_id, server_name).
#[derive(Debug, Clone)]
pub struct ServerConfig {
  /// Discord guild ID this server belongs to
  pub guild_id: u64,
  /// User-provided server name, unique within the guild
  pub server_name: String,
  /// Hostname or IP of the game server
  pub host: String,
  /// Admin password used for both the REST API and RCON
  pub password: String,
  /// REST API port
  pub api_port: u16,
  /// RCON port, carried for the external command executor
  pub rcon_port: u16,
}

/// Last-seen profile of a player, upserted on every successful roster poll.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRecord {
  pub user_id: String,
  pub name: String,
  pub account_name: String,
  pub ip: String,
  pub ping: f64,
  pub location_x: f64,
  pub location_y: f64,
  pub level: i64,
}

/// Accumulated online time for one player, global across servers.
///
/// `session_start` is non-null exactly while the tracker believes the player
/// is online somewhere. Accrual happens only when a session closes; the
/// duration of an open session is computed on demand.
#[derive(Debug, Clone)]
pub struct PlayerSession {
  pub user_id: String,
  /// Total accumulated whole seconds over all closed sessions
  pub total_time: i64,
  /// Unix timestamp of the current session's start, if one is open
  pub session_start: Option<i64>,
  /// Duration in seconds of the most recently closed session
  pub last_session: i64,
}

impl PlayerSession {
  /// Time online including the open session, if any.
  pub fn time_online(&self, now: i64) -> i64 {
    match self.session_start {
      Some(start) => self.total_time + (now - start).max(0),
      None => self.total_time,
    }
  }
}

/// Chat relay configuration for one server's log tailer.
#[derive(Debug, Clone)]
pub struct ChatRelay {
  pub guild_id: u64,
  pub server_name: String,
  /// Directory the game server writes its chat logs into
  pub log_dir: String,
  /// Webhook the filtered chat lines are forwarded to
  pub webhook_url: String,
}
