//! Log tailing: relay unseen chat lines from rotating server log files.

use crate::error::TailError;
use crate::events::ChatEvent;
use crate::sink::EventSink;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// File extensions considered when picking the active log file.
const LOG_EXTENSIONS: &[&str] = &["txt", "log"];

/// Channel tags whose lines are never relayed.
const EXCLUDED_CHANNELS: &[&str] = &["local", "guild"];

/// Privileged command prefixes that must never leave the server.
const BLOCKED_PHRASES: &[&str] = &["/adminpassword", "/creativemenu", "/"];

/// Tails the newest log file in one server's log directory.
///
/// The cursor is remembered by line content, not byte offset: after every
/// tick `last_seen_line` holds the file's final line, and the next tick
/// relays only the lines strictly after its first exact match. When the
/// newest file changes (rotation, startup) the cursor re-baselines to that
/// file's final line without emitting anything, so historical content is
/// never replayed. All cursor state is in-process and safely re-derived on
/// restart.
pub struct LogTailer {
    server_name: String,
    log_dir: PathBuf,
    chat_pattern: Regex,
    current_file: Option<PathBuf>,
    last_seen_line: Option<String>,
}

impl LogTailer {
    pub fn new(server_name: String, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            server_name,
            log_dir: log_dir.into(),
            chat_pattern: Regex::new(r"\[Chat::(Global|Local|Guild)\]\['([^']+)'.*?\]: (.*)")
                .expect("chat pattern is valid"),
            current_file: None,
            last_seen_line: None,
        }
    }

    /// Run one tailing pass and return the chat events that became visible.
    pub fn tick(&mut self) -> Result<Vec<ChatEvent>, TailError> {
        let Some(newest) = self.newest_log_file()? else {
            return Ok(Vec::new());
        };

        let content = fs::read_to_string(&newest)?;
        let lines: Vec<&str> = content.lines().collect();

        if self.current_file.as_deref() != Some(newest.as_path()) {
            // New file (rotation or first tick): baseline on its final line
            // and emit nothing, regardless of content.
            debug!(server = %self.server_name, file = %newest.display(), "log cursor reset");
            self.current_file = Some(newest);
            self.last_seen_line = lines.last().map(|l| l.to_string());
            return Ok(Vec::new());
        }

        // Lines strictly after the first exact cursor match are new. A
        // missing match (truncation, or the cursor line recurring earlier)
        // treats the whole content as new; rare duplicates are accepted.
        let start = match &self.last_seen_line {
            Some(last) => lines
                .iter()
                .position(|line| line == last)
                .map(|pos| pos + 1)
                .unwrap_or(0),
            None => 0,
        };

        let events = lines[start..]
            .iter()
            .filter_map(|line| self.parse_chat_line(line))
            .collect();

        // The cursor always advances to the final line, even when nothing
        // was emitted, so already-seen content is never re-scanned.
        if let Some(last) = lines.last() {
            self.last_seen_line = Some(last.to_string());
        }

        Ok(events)
    }

    /// The most recently modified log file in the directory, if any.
    fn newest_log_file(&self) -> Result<Option<PathBuf>, TailError> {
        let mut newest: Option<(SystemTime, PathBuf)> = None;

        for entry in fs::read_dir(&self.log_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !has_log_extension(&path) {
                continue;
            }
            // A file disappearing between listing and stat is a skip
            let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
                continue;
            };
            match &newest {
                Some((best, _)) if *best >= modified => {}
                _ => newest = Some((modified, path)),
            }
        }

        Ok(newest.map(|(_, path)| path))
    }

    /// Match a line against the chat grammar and apply the channel and
    /// phrase filters. Returns None for anything that must not be relayed.
    fn parse_chat_line(&self, line: &str) -> Option<ChatEvent> {
        let captures = self.chat_pattern.captures(line)?;
        let channel = &captures[1];
        let username = &captures[2];
        let message = &captures[3];

        if EXCLUDED_CHANNELS.contains(&channel.to_lowercase().as_str()) {
            return None;
        }
        if BLOCKED_PHRASES.iter().any(|phrase| message.contains(phrase)) {
            return None;
        }

        Some(ChatEvent {
            channel: channel.to_string(),
            username: username.to_string(),
            message: message.to_string(),
            server_name: self.server_name.clone(),
        })
    }
}

fn has_log_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| LOG_EXTENSIONS.contains(&ext))
}

/// Indefinitely repeating tailing task for one server's chat relay.
///
/// Successive emissions are paced with a fixed delay to respect downstream
/// rate limits. Filesystem trouble is absorbed as "no data this tick".
pub async fn run_log_tailer<S: EventSink>(
    mut tailer: LogTailer,
    sink: S,
    interval: Duration,
    pace: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        match tailer.tick() {
            Ok(events) => {
                for event in events {
                    sink.chat(event).await;
                    tokio::time::sleep(pace).await;
                }
            }
            Err(err) => {
                warn!(server = %tailer.server_name, %err, "log check failed");
            }
        }
    }
}
