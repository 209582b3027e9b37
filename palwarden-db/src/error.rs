use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlite(#[from] tokio_rusqlite::rusqlite::Error),

    #[error("database connection error: {0}")]
    Connection(#[from] tokio_rusqlite::Error),

    #[error("server not found")]
    ServerNotFound,

    #[error("server name already exists in this guild")]
    ServerNameConflict,
}

pub type Result<T> = std::result::Result<T, DbError>;
