//! Delivery of derived events to the outside world.
//!
//! Delivery is fire-and-forget: a failed post is logged and has no effect on
//! tracker or cursor state.

use crate::events::{ChatEvent, PresenceEvent, PresenceKind, StatusEvent};
use reqwest::Client;
use serde_json::json;
use std::future::Future;
use tracing::warn;

/// Destination for presence, chat and status events.
pub trait EventSink: Send + Sync {
    fn presence(&self, event: PresenceEvent) -> impl Future<Output = ()> + Send;
    fn chat(&self, event: ChatEvent) -> impl Future<Output = ()> + Send;
    fn status(&self, event: StatusEvent) -> impl Future<Output = ()> + Send;
}

/// Sink posting to Discord-style webhooks.
///
/// Chat lines go to the per-server relay webhook; presence and status
/// notifications go to an optional shared events webhook.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    http: Client,
    chat_url: Option<String>,
    events_url: Option<String>,
}

impl WebhookSink {
    pub fn new(http: Client, chat_url: Option<String>, events_url: Option<String>) -> Self {
        Self {
            http,
            chat_url,
            events_url,
        }
    }

    async fn post(&self, url: &str, body: serde_json::Value) {
        if let Err(err) = self.http.post(url).json(&body).send().await {
            warn!(%err, "webhook delivery failed");
        }
    }
}

impl EventSink for WebhookSink {
    async fn presence(&self, event: PresenceEvent) {
        let Some(url) = &self.events_url else { return };
        let verb = match event.kind {
            PresenceKind::Joined => "joined",
            PresenceKind::Left => "left",
        };
        let content = format!(
            "Player `{} ({})` has {verb} {}.",
            event.account_name, event.user_id, event.server_name
        );
        self.post(url, json!({ "content": content })).await;
    }

    async fn chat(&self, event: ChatEvent) {
        let Some(url) = &self.chat_url else { return };
        self.post(
            url,
            json!({
                "username": format!("{} ({})", event.username, event.server_name),
                "content": event.message,
            }),
        )
        .await;
    }

    async fn status(&self, event: StatusEvent) {
        let Some(url) = &self.events_url else { return };
        let content = format!(
            "**{}** — {}/{} players, {} fps, day {}, up {} min",
            event.server_name,
            event.metrics.current_players,
            event.metrics.max_players,
            event.metrics.server_fps,
            event.metrics.days,
            event.metrics.uptime / 60,
        );
        self.post(url, json!({ "content": content })).await;
    }
}
