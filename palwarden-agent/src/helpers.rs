use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix timestamp in whole seconds. All session arithmetic uses this
/// single timestamp type end-to-end.
pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
