pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod helpers;
pub mod poller;
pub mod relay;
pub mod sessions;
pub mod sink;
pub mod status;
pub mod sweep;
pub mod tailer;
