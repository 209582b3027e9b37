//! Inbound chat: one-shot forwarding of a message from the external side
//! back into the game server. Independent of the tailing state machine.

use crate::api::ServerApi;
use crate::error::RelayError;
use palwarden_db::Database;
use reqwest::Client;

/// Announce a chat message in-game on the named server.
///
/// A missing server configuration surfaces as [`RelayError::ConfigMissing`]
/// rather than a fault.
pub async fn forward_inbound_chat(
    db: &Database,
    http: &Client,
    guild_id: u64,
    server_name: &str,
    author: &str,
    content: &str,
) -> Result<(), RelayError> {
    let Some(server) = db.get_server(guild_id, server_name.to_string()).await? else {
        return Err(RelayError::ConfigMissing(server_name.to_string()));
    };

    let api = ServerApi::new(http.clone(), &server.host, server.api_port, &server.password);
    api.announce(&format!("[{author}]: {content}")).await?;
    Ok(())
}
