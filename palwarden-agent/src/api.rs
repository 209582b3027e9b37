//! Typed client for a Palworld server's REST API.
//!
//! Upstream payloads are inconsistent about key casing across server
//! versions (`currentplayernum` vs `currentPlayerNum` vs `currentPlayers`);
//! the serde aliases on the structs below are the only place that variance
//! is known. Callers always see the canonical shape.

use crate::error::ApiError;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const API_USER: &str = "admin";

/// Build the shared HTTP client with the fixed per-request timeout.
pub fn build_http_client() -> reqwest::Result<Client> {
    Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .user_agent(concat!("palwarden/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// One roster entry as reported by `/v1/api/players`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlayerEntry {
    #[serde(alias = "userId", alias = "userid")]
    pub user_id: String,
    pub name: String,
    #[serde(default, alias = "accountName", alias = "accountname")]
    pub account_name: String,
    #[serde(default, alias = "playerId", alias = "playerid")]
    pub player_id: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub ping: f64,
    #[serde(default, alias = "locationX")]
    pub location_x: f64,
    #[serde(default, alias = "locationY")]
    pub location_y: f64,
    #[serde(default)]
    pub level: i64,
}

#[derive(Debug, Deserialize)]
struct PlayersResponse {
    players: Vec<PlayerEntry>,
}

/// Response of `/v1/api/info`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    #[serde(default, alias = "serverName", alias = "server_name")]
    pub servername: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, alias = "worldGuid", alias = "world_guid")]
    pub worldguid: String,
}

/// Response of `/v1/api/metrics`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerMetrics {
    #[serde(
        default,
        alias = "currentplayernum",
        alias = "currentPlayerNum",
        alias = "currentPlayers"
    )]
    pub current_players: u32,
    #[serde(
        default,
        alias = "maxplayernum",
        alias = "maxPlayerNum",
        alias = "maxPlayers"
    )]
    pub max_players: u32,
    #[serde(default, alias = "serverfps", alias = "serverFps", alias = "serverFPS")]
    pub server_fps: u32,
    #[serde(default, alias = "serverframetime", alias = "serverFrameTime")]
    pub frame_time_ms: f64,
    /// Server uptime in seconds
    #[serde(default)]
    pub uptime: u64,
    /// In-game days passed
    #[serde(default)]
    pub days: u32,
}

/// Client for one server's REST API, authenticated with the admin credential.
#[derive(Debug, Clone)]
pub struct ServerApi {
    http: Client,
    base: String,
    password: String,
}

impl ServerApi {
    pub fn new(http: Client, host: &str, api_port: u16, password: &str) -> Self {
        Self {
            http,
            base: format!("http://{host}:{api_port}/v1/api"),
            password: password.to_string(),
        }
    }

    /// Current roster of connected players.
    pub async fn get_players(&self) -> Result<Vec<PlayerEntry>, ApiError> {
        let resp: PlayersResponse = self.get("players").await?;
        Ok(resp.players)
    }

    /// Static server information.
    pub async fn get_info(&self) -> Result<ServerInfo, ApiError> {
        self.get("info").await
    }

    /// Live server metrics.
    pub async fn get_metrics(&self) -> Result<ServerMetrics, ApiError> {
        self.get("metrics").await
    }

    /// Kick a player.
    pub async fn kick(&self, user_id: &str, reason: &str) -> Result<(), ApiError> {
        self.post("kick", json!({ "userid": user_id, "message": reason }))
            .await
    }

    /// Ban a player.
    pub async fn ban(&self, user_id: &str, reason: &str) -> Result<(), ApiError> {
        self.post("ban", json!({ "userid": user_id, "message": reason }))
            .await
    }

    /// Lift a player's ban.
    pub async fn unban(&self, user_id: &str) -> Result<(), ApiError> {
        self.post("unban", json!({ "userid": user_id })).await
    }

    /// Broadcast a message in-game.
    pub async fn announce(&self, message: &str) -> Result<(), ApiError> {
        self.post("announce", json!({ "message": message })).await
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        let resp = self
            .http
            .get(format!("{}/{endpoint}", self.base))
            .basic_auth(API_USER, Some(&self.password))
            .send()
            .await
            .map_err(classify)?;

        let resp = check_status(resp)?;
        resp.json().await.map_err(classify)
    }

    async fn post(&self, endpoint: &str, body: serde_json::Value) -> Result<(), ApiError> {
        let resp = self
            .http
            .post(format!("{}/{endpoint}", self.base))
            .basic_auth(API_USER, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(classify)?;

        check_status(resp)?;
        Ok(())
    }
}

fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    match resp.status() {
        s if s.is_success() => Ok(resp),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::AuthFailed),
        s => Err(ApiError::Malformed(format!("unexpected status {s}"))),
    }
}

/// Map a reqwest error into the client taxonomy.
fn classify(err: reqwest::Error) -> ApiError {
    if err.is_decode() {
        ApiError::Malformed(err.to_string())
    } else {
        // Timeouts, refused connections, DNS failures
        ApiError::Unreachable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_players_payload_variants_normalize() {
        let lowercase: PlayersResponse = serde_json::from_str(
            r#"{"players":[{"userid":"steam_1","name":"Bob","accountname":"bob42",
                "playerid":"123","ip":"10.0.0.5","ping":31.5,
                "location_x":1000.0,"location_y":-2000.0,"level":17}]}"#,
        )
        .unwrap();
        let camel: PlayersResponse = serde_json::from_str(
            r#"{"players":[{"userId":"steam_1","name":"Bob","accountName":"bob42",
                "playerId":"123","ip":"10.0.0.5","ping":31.5,
                "locationX":1000.0,"locationY":-2000.0,"level":17}]}"#,
        )
        .unwrap();
        assert_eq!(lowercase.players, camel.players);
        assert_eq!(lowercase.players[0].user_id, "steam_1");
        assert_eq!(lowercase.players[0].location_x, 1000.0);
    }

    #[test]
    fn test_players_payload_tolerates_missing_optional_fields() {
        let resp: PlayersResponse =
            serde_json::from_str(r#"{"players":[{"userId":"steam_1","name":"Bob"}]}"#).unwrap();
        assert_eq!(resp.players[0].account_name, "");
        assert_eq!(resp.players[0].level, 0);
    }

    #[test]
    fn test_players_payload_without_roster_is_an_error() {
        assert!(serde_json::from_str::<PlayersResponse>(r#"{"status":"ok"}"#).is_err());
    }

    #[test]
    fn test_metrics_key_variants_normalize() {
        for raw in [
            r#"{"currentplayernum":3,"maxplayernum":32,"serverfps":60,
                "serverframetime":16.6,"uptime":3600,"days":12}"#,
            r#"{"currentPlayerNum":3,"maxPlayerNum":32,"serverFps":60,
                "serverFrameTime":16.6,"uptime":3600,"days":12}"#,
            r#"{"currentPlayers":3,"maxPlayers":32,"serverFPS":60,
                "serverFrameTime":16.6,"uptime":3600,"days":12}"#,
        ] {
            let metrics: ServerMetrics = serde_json::from_str(raw).unwrap();
            assert_eq!(metrics.current_players, 3);
            assert_eq!(metrics.max_players, 32);
            assert_eq!(metrics.server_fps, 60);
        }
    }

    #[test]
    fn test_info_payload_normalizes() {
        let info: ServerInfo = serde_json::from_str(
            r#"{"servername":"Main","description":"A server","version":"v0.3.4",
                "worldguid":"ABCDEF"}"#,
        )
        .unwrap();
        assert_eq!(info.servername, "Main");
        assert_eq!(info.worldguid, "ABCDEF");
    }
}
