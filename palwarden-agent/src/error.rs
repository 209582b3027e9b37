use thiserror::Error;

/// Failure classes for calls against a game server's REST API.
///
/// Ordinary network trouble never escapes the client layer as anything other
/// than one of these variants; the background loops branch on them instead of
/// catching broad faults.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network failure or timeout reaching the server
    #[error("server unreachable: {0}")]
    Unreachable(String),

    /// The server rejected the admin credential
    #[error("credential rejected by server")]
    AuthFailed,

    /// The server answered with an unexpected payload or status
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Failure classes for the log tailer's filesystem access.
#[derive(Debug, Error)]
pub enum TailError {
    #[error("log directory unreadable: {0}")]
    Filesystem(#[from] std::io::Error),
}

/// Failures of on-demand operations (as opposed to background loops, which
/// absorb their errors at the iteration boundary).
#[derive(Debug, Error)]
pub enum RelayError {
    /// No ServerConfig exists for the requested (guild, server) key
    #[error("no configuration for server '{0}'")]
    ConfigMissing(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Db(#[from] palwarden_db::DbError),
}
