//! Error types for opening and configuring SQLite connections.

use std::path::PathBuf;

/// Errors raised while opening or configuring a connection.
///
/// Statement failures during persistence are reported by the engine as
/// `oxide_record::RecordError`, not through this type.
#[derive(Debug, thiserror::Error)]
pub enum SqliteError {
    /// The database URL is not a SQLite URL.
    #[error("Unsupported database URL '{0}': expected sqlite:<path> or sqlite::memory:")]
    UnsupportedUrl(String),

    /// Error reported by SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error while reading a configuration file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {source}")]
    Config {
        /// Path to the configuration file.
        path: PathBuf,
        /// Parse failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for SQLite connection management.
pub type Result<T> = std::result::Result<T, SqliteError>;
