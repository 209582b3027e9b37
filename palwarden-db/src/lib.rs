mod error;
mod models;

pub use error::{DbError, Result};
pub use models::{ChatRelay, PlayerRecord, PlayerSession, ServerConfig};

use std::path::Path;
use tokio_rusqlite::Connection;
use tokio_rusqlite::rusqlite::{OptionalExtension, params};
use tracing::{debug, info};

/// Database wrapper for all Palwarden operations.
#[derive(Clone)]
pub struct Database {
  conn: Connection,
}

impl Database {
  /// Open or create a database at the given path.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = Connection::open(path)
      .await
      .map_err(|e| DbError::Connection(e.into()))?;
    let db = Self { conn };
    db.initialize().await?;
    Ok(db)
  }

  /// Create an in-memory database (useful for testing).
  pub async fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .await
      .map_err(|e| DbError::Connection(e.into()))?;
    let db = Self { conn };
    db.initialize().await?;
    Ok(db)
  }

  /// Initialize the database schema.
  async fn initialize(&self) -> Result<()> {
    self.conn
            .call(|conn| {
                // Enable WAL mode for better concurrent read/write performance
                conn.pragma_update(None, "journal_mode", "WAL")?;

                conn.execute_batch(
                    r#"
                    -- Configured game servers, one row per (guild, name)
                    CREATE TABLE IF NOT EXISTS servers (
                        guild_id INTEGER NOT NULL,
                        server_name TEXT NOT NULL,
                        host TEXT NOT NULL,
                        password TEXT NOT NULL,
                        api_port INTEGER NOT NULL,
                        rcon_port INTEGER NOT NULL,
                        PRIMARY KEY (guild_id, server_name)
                    );

                    -- Last-seen player profiles
                    CREATE TABLE IF NOT EXISTS players (
                        user_id TEXT PRIMARY KEY,
                        name TEXT NOT NULL,
                        account_name TEXT NOT NULL,
                        ip TEXT NOT NULL,
                        ping REAL NOT NULL,
                        location_x REAL NOT NULL,
                        location_y REAL NOT NULL,
                        level INTEGER NOT NULL
                    );

                    -- Accumulated online time, user_id is a global key
                    CREATE TABLE IF NOT EXISTS player_sessions (
                        user_id TEXT PRIMARY KEY,
                        total_time INTEGER NOT NULL DEFAULT 0,
                        session_start INTEGER,
                        last_session INTEGER NOT NULL DEFAULT 0
                    );

                    -- Chat relay configuration per (guild, server)
                    CREATE TABLE IF NOT EXISTS chat_relays (
                        guild_id INTEGER NOT NULL,
                        server_name TEXT NOT NULL,
                        log_dir TEXT NOT NULL,
                        webhook_url TEXT NOT NULL,
                        PRIMARY KEY (guild_id, server_name)
                    );

                    -- Index for fast guild lookups
                    CREATE INDEX IF NOT EXISTS idx_servers_guild ON servers(guild_id);
                    "#,
                )?;
                Ok(())
            })
            .await?;

    info!("database initialized");
    Ok(())
  }

  // ========================================================================
  // Servers
  // ========================================================================

  /// Register a new server. The (guild, name) pair must be unique.
  pub async fn add_server(&self, server: ServerConfig) -> Result<ServerConfig> {
    let result = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists: bool = tx
          .prepare_cached(
            "SELECT EXISTS(SELECT 1 FROM servers WHERE guild_id = ?1 AND server_name = ?2)",
          )?
          .query_row(params![server.guild_id, &server.server_name], |row| {
            row.get(0)
          })?;

        if exists {
          return Ok(Err(DbError::ServerNameConflict));
        }

        tx.prepare_cached(
          "INSERT INTO servers (guild_id, server_name, host, password, api_port, rcon_port)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?
        .execute(params![
          server.guild_id,
          &server.server_name,
          &server.host,
          &server.password,
          server.api_port,
          server.rcon_port
        ])?;

        tx.commit()?;
        Ok(Ok(server))
      })
      .await??;

    debug!(result.guild_id, %result.server_name, "added server");
    Ok(result)
  }

  /// Look up one server's configuration.
  /// Returns None when no server with that name is configured for the guild.
  pub async fn get_server(&self, guild_id: u64, server_name: String) -> Result<Option<ServerConfig>> {
    let server = self
      .conn
      .call(move |conn| {
        conn
          .prepare_cached(
            "SELECT guild_id, server_name, host, password, api_port, rcon_port
                         FROM servers WHERE guild_id = ?1 AND server_name = ?2",
          )?
          .query_row(params![guild_id, &server_name], |row| {
            Ok(ServerConfig {
              guild_id: row.get(0)?,
              server_name: row.get(1)?,
              host: row.get(2)?,
              password: row.get(3)?,
              api_port: row.get(4)?,
              rcon_port: row.get(5)?,
            })
          })
          .optional()
      })
      .await?;

    Ok(server)
  }

  /// Get every configured server across all guilds. The background loops
  /// iterate over this listing.
  pub async fn list_servers(&self) -> Result<Vec<ServerConfig>> {
    let servers = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare_cached(
          "SELECT guild_id, server_name, host, password, api_port, rcon_port
                     FROM servers ORDER BY guild_id, server_name",
        )?;

        let servers = stmt
          .query_map([], |row| {
            Ok(ServerConfig {
              guild_id: row.get(0)?,
              server_name: row.get(1)?,
              host: row.get(2)?,
              password: row.get(3)?,
              api_port: row.get(4)?,
              rcon_port: row.get(5)?,
            })
          })?
          .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(servers)
      })
      .await?;

    Ok(servers)
  }

  /// Get all servers configured for a guild.
  pub async fn list_servers_by_guild(&self, guild_id: u64) -> Result<Vec<ServerConfig>> {
    let servers = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "SELECT guild_id, server_name, host, password, api_port, rcon_port
                     FROM servers WHERE guild_id = ?1 ORDER BY server_name",
        )?;

        let servers = stmt
          .query_map(params![guild_id], |row| {
            Ok(ServerConfig {
              guild_id: row.get(0)?,
              server_name: row.get(1)?,
              host: row.get(2)?,
              password: row.get(3)?,
              api_port: row.get(4)?,
              rcon_port: row.get(5)?,
            })
          })?
          .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(servers)
      })
      .await?;

    Ok(servers)
  }

  /// Server names in a guild matching a prefix (autocomplete backing).
  pub async fn server_names(&self, guild_id: u64, prefix: String) -> Result<Vec<String>> {
    let names = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "SELECT server_name FROM servers
                     WHERE guild_id = ?1 AND server_name LIKE ?2 ORDER BY server_name",
        )?;

        let pattern = format!("{prefix}%");
        let names = stmt
          .query_map(params![guild_id, &pattern], |row| row.get(0))?
          .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(names)
      })
      .await?;

    Ok(names)
  }

  /// Delete a server by guild and name.
  pub async fn delete_server(&self, guild_id: u64, server_name: String) -> Result<()> {
    let result = self
      .conn
      .call(move |conn| {
        let deleted = conn
          .prepare_cached("DELETE FROM servers WHERE guild_id = ?1 AND server_name = ?2")?
          .execute(params![guild_id, &server_name])?;

        if deleted == 0 {
          return Ok(Err(DbError::ServerNotFound));
        }

        Ok(Ok(()))
      })
      .await??;

    debug!(guild_id, "deleted server");
    Ok(result)
  }

  // ========================================================================
  // Player profiles
  // ========================================================================

  /// Insert or replace a player's last-seen profile.
  pub async fn upsert_player(&self, player: PlayerRecord) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn
          .prepare_cached(
            "INSERT OR REPLACE INTO players
                         (user_id, name, account_name, ip, ping, location_x, location_y, level)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          )?
          .execute(params![
            &player.user_id,
            &player.name,
            &player.account_name,
            &player.ip,
            player.ping,
            player.location_x,
            player.location_y,
            player.level
          ])?;
        Ok(())
      })
      .await?;

    Ok(())
  }

  /// Fetch a player's last-seen profile.
  pub async fn get_player(&self, user_id: String) -> Result<Option<PlayerRecord>> {
    let player = self
      .conn
      .call(move |conn| {
        conn
          .prepare_cached(
            "SELECT user_id, name, account_name, ip, ping, location_x, location_y, level
                         FROM players WHERE user_id = ?1",
          )?
          .query_row(params![&user_id], |row| {
            Ok(PlayerRecord {
              user_id: row.get(0)?,
              name: row.get(1)?,
              account_name: row.get(2)?,
              ip: row.get(3)?,
              ping: row.get(4)?,
              location_x: row.get(5)?,
              location_y: row.get(6)?,
              level: row.get(7)?,
            })
          })
          .optional()
      })
      .await?;

    Ok(player)
  }

  // ========================================================================
  // Sessions
  // ========================================================================

  /// Open a session for a player at `now`, creating the row on first sight.
  /// A no-op when a session is already open, which defends against duplicate
  /// reconcile calls and the same uid appearing on two servers at once.
  pub async fn open_session(&self, user_id: String, now: i64) -> Result<()> {
    let user_id_log = user_id.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let row: Option<Option<i64>> = tx
          .prepare_cached("SELECT session_start FROM player_sessions WHERE user_id = ?1")?
          .query_row(params![&user_id], |row| row.get(0))
          .optional()?;

        match row {
          None => {
            tx.prepare_cached(
              "INSERT INTO player_sessions (user_id, total_time, session_start, last_session)
                             VALUES (?1, 0, ?2, 0)",
            )?
            .execute(params![&user_id, now])?;
          }
          Some(None) => {
            tx.prepare_cached(
              "UPDATE player_sessions SET session_start = ?2 WHERE user_id = ?1",
            )?
            .execute(params![&user_id, now])?;
          }
          // Session already open, leave it alone
          Some(Some(_)) => {}
        }

        tx.commit()?;
        Ok(())
      })
      .await?;

    debug!(user_id = %user_id_log, "opened session");
    Ok(())
  }

  /// Close a player's open session at `now`, accruing the elapsed delta into
  /// `total_time`. Returns the delta, or None when no session was open.
  pub async fn close_session(&self, user_id: String, now: i64) -> Result<Option<i64>> {
    let user_id_log = user_id.clone();

    let delta = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let row: Option<(Option<i64>, i64)> = tx
          .prepare_cached(
            "SELECT session_start, total_time FROM player_sessions WHERE user_id = ?1",
          )?
          .query_row(params![&user_id], |row| Ok((row.get(0)?, row.get(1)?)))
          .optional()?;

        let delta = match row {
          Some((Some(start), total)) => {
            let delta = (now - start).max(0);
            tx.prepare_cached(
              "UPDATE player_sessions
                             SET total_time = ?2, session_start = NULL, last_session = ?3
                             WHERE user_id = ?1",
            )?
            .execute(params![&user_id, total + delta, delta])?;
            Some(delta)
          }
          _ => None,
        };

        tx.commit()?;
        Ok(delta)
      })
      .await?;

    if let Some(delta) = delta {
      debug!(user_id = %user_id_log, delta, "closed session");
    }
    Ok(delta)
  }

  /// Fetch a player's session row.
  pub async fn get_session(&self, user_id: String) -> Result<Option<PlayerSession>> {
    let session = self
      .conn
      .call(move |conn| {
        conn
          .prepare_cached(
            "SELECT user_id, total_time, session_start, last_session
                         FROM player_sessions WHERE user_id = ?1",
          )?
          .query_row(params![&user_id], |row| {
            Ok(PlayerSession {
              user_id: row.get(0)?,
              total_time: row.get(1)?,
              session_start: row.get(2)?,
              last_session: row.get(3)?,
            })
          })
          .optional()
      })
      .await?;

    Ok(session)
  }

  // ========================================================================
  // Chat relays
  // ========================================================================

  /// Create or replace the chat relay configuration for a server.
  pub async fn set_chat_relay(&self, relay: ChatRelay) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn
          .prepare_cached(
            "INSERT OR REPLACE INTO chat_relays (guild_id, server_name, log_dir, webhook_url)
                         VALUES (?1, ?2, ?3, ?4)",
          )?
          .execute(params![
            relay.guild_id,
            &relay.server_name,
            &relay.log_dir,
            &relay.webhook_url
          ])?;
        Ok(())
      })
      .await?;

    Ok(())
  }

  /// Get every configured chat relay. One tailer task runs per row.
  pub async fn list_chat_relays(&self) -> Result<Vec<ChatRelay>> {
    let relays = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare_cached(
          "SELECT guild_id, server_name, log_dir, webhook_url
                     FROM chat_relays ORDER BY guild_id, server_name",
        )?;

        let relays = stmt
          .query_map([], |row| {
            Ok(ChatRelay {
              guild_id: row.get(0)?,
              server_name: row.get(1)?,
              log_dir: row.get(2)?,
              webhook_url: row.get(3)?,
            })
          })?
          .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(relays)
      })
      .await?;

    Ok(relays)
  }

  /// Delete a server's chat relay configuration.
  pub async fn delete_chat_relay(&self, guild_id: u64, server_name: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn
          .prepare_cached("DELETE FROM chat_relays WHERE guild_id = ?1 AND server_name = ?2")?
          .execute(params![guild_id, &server_name])?;
        Ok(())
      })
      .await?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn now() -> i64 {
    1700000000 // Fixed timestamp for testing
  }

  fn test_server(guild_id: u64, name: &str) -> ServerConfig {
    ServerConfig {
      guild_id,
      server_name: name.to_string(),
      host: "127.0.0.1".to_string(),
      password: "hunter2".to_string(),
      api_port: 8212,
      rcon_port: 25575,
    }
  }

  #[tokio::test]
  async fn test_server_lifecycle() {
    let db = Database::open_in_memory().await.unwrap();

    let server = db.add_server(test_server(12345, "Main")).await.unwrap();
    assert_eq!(server.server_name, "Main");

    let server = db
      .get_server(12345, "Main".to_string())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(server.host, "127.0.0.1");
    assert_eq!(server.api_port, 8212);

    // Unknown name is an explicit not-found, not an error
    assert!(
      db.get_server(12345, "Creative".to_string())
        .await
        .unwrap()
        .is_none()
    );

    let servers = db.list_servers_by_guild(12345).await.unwrap();
    assert_eq!(servers.len(), 1);

    db.delete_server(12345, "Main".to_string()).await.unwrap();
    assert!(
      db.get_server(12345, "Main".to_string())
        .await
        .unwrap()
        .is_none()
    );
  }

  #[tokio::test]
  async fn test_server_name_conflict() {
    let db = Database::open_in_memory().await.unwrap();

    db.add_server(test_server(12345, "Main")).await.unwrap();
    let result = db.add_server(test_server(12345, "Main")).await;
    assert!(matches!(result, Err(DbError::ServerNameConflict)));

    // Same name in a different guild is fine
    db.add_server(test_server(67890, "Main")).await.unwrap();
  }

  #[tokio::test]
  async fn test_server_names_prefix() {
    let db = Database::open_in_memory().await.unwrap();

    db.add_server(test_server(1, "Main")).await.unwrap();
    db.add_server(test_server(1, "Modded")).await.unwrap();
    db.add_server(test_server(1, "Events")).await.unwrap();

    let names = db.server_names(1, "M".to_string()).await.unwrap();
    assert_eq!(names, vec!["Main", "Modded"]);

    let names = db.server_names(1, "".to_string()).await.unwrap();
    assert_eq!(names.len(), 3);
  }

  #[tokio::test]
  async fn test_session_open_close_accrual() {
    let db = Database::open_in_memory().await.unwrap();

    // First sight creates the row with an open session
    db.open_session("steam_1".to_string(), now()).await.unwrap();
    let session = db
      .get_session("steam_1".to_string())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(session.total_time, 0);
    assert_eq!(session.session_start, Some(now()));

    // Close 100 seconds later
    let delta = db
      .close_session("steam_1".to_string(), now() + 100)
      .await
      .unwrap();
    assert_eq!(delta, Some(100));

    let session = db
      .get_session("steam_1".to_string())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(session.total_time, 100);
    assert_eq!(session.session_start, None);
    assert_eq!(session.last_session, 100);

    // Reopen and close again, total accrues
    db.open_session("steam_1".to_string(), now() + 200)
      .await
      .unwrap();
    let delta = db
      .close_session("steam_1".to_string(), now() + 250)
      .await
      .unwrap();
    assert_eq!(delta, Some(50));

    let session = db
      .get_session("steam_1".to_string())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(session.total_time, 150);
    assert_eq!(session.last_session, 50);
  }

  #[tokio::test]
  async fn test_open_session_is_idempotent() {
    let db = Database::open_in_memory().await.unwrap();

    db.open_session("steam_1".to_string(), now()).await.unwrap();
    // A second open must not move the start time
    db.open_session("steam_1".to_string(), now() + 60)
      .await
      .unwrap();

    let session = db
      .get_session("steam_1".to_string())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(session.session_start, Some(now()));
  }

  #[tokio::test]
  async fn test_close_without_open_is_noop() {
    let db = Database::open_in_memory().await.unwrap();

    assert_eq!(
      db.close_session("steam_1".to_string(), now()).await.unwrap(),
      None
    );

    db.open_session("steam_1".to_string(), now()).await.unwrap();
    db.close_session("steam_1".to_string(), now() + 10)
      .await
      .unwrap();
    // Second close finds no open session
    assert_eq!(
      db.close_session("steam_1".to_string(), now() + 20)
        .await
        .unwrap(),
      None
    );
  }

  #[tokio::test]
  async fn test_time_online_includes_open_session() {
    let db = Database::open_in_memory().await.unwrap();

    db.open_session("steam_1".to_string(), now()).await.unwrap();
    db.close_session("steam_1".to_string(), now() + 100)
      .await
      .unwrap();
    db.open_session("steam_1".to_string(), now() + 200)
      .await
      .unwrap();

    let session = db
      .get_session("steam_1".to_string())
      .await
      .unwrap()
      .unwrap();
    // 100 closed + 50 elapsed of the open session
    assert_eq!(session.time_online(now() + 250), 150);
  }

  #[tokio::test]
  async fn test_player_profile_upsert() {
    let db = Database::open_in_memory().await.unwrap();

    let mut player = PlayerRecord {
      user_id: "steam_1".to_string(),
      name: "Bob".to_string(),
      account_name: "bob42".to_string(),
      ip: "10.0.0.5".to_string(),
      ping: 31.5,
      location_x: 1000.0,
      location_y: -2000.0,
      level: 17,
    };
    db.upsert_player(player.clone()).await.unwrap();

    player.level = 18;
    player.ping = 40.0;
    db.upsert_player(player.clone()).await.unwrap();

    let stored = db
      .get_player("steam_1".to_string())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(stored, player);
  }

  #[tokio::test]
  async fn test_chat_relay_lifecycle() {
    let db = Database::open_in_memory().await.unwrap();

    db.set_chat_relay(ChatRelay {
      guild_id: 1,
      server_name: "Main".to_string(),
      log_dir: "/srv/pal/logs".to_string(),
      webhook_url: "https://example.invalid/hook".to_string(),
    })
    .await
    .unwrap();

    let relays = db.list_chat_relays().await.unwrap();
    assert_eq!(relays.len(), 1);
    assert_eq!(relays[0].log_dir, "/srv/pal/logs");

    // Replacing the row keeps the (guild, server) key unique
    db.set_chat_relay(ChatRelay {
      guild_id: 1,
      server_name: "Main".to_string(),
      log_dir: "/srv/pal/logs2".to_string(),
      webhook_url: "https://example.invalid/hook".to_string(),
    })
    .await
    .unwrap();
    let relays = db.list_chat_relays().await.unwrap();
    assert_eq!(relays.len(), 1);
    assert_eq!(relays[0].log_dir, "/srv/pal/logs2");

    db.delete_chat_relay(1, "Main".to_string()).await.unwrap();
    assert!(db.list_chat_relays().await.unwrap().is_empty());
  }
}
