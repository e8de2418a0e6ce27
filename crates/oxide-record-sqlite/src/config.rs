//! Connection configuration.
//!
//! A [`SqliteConfig`] names the database with a URL in the same form the
//! `DATABASE_URL` environment variable uses:
//!
//! - `sqlite:db.sqlite3`, `sqlite://path/to/db.sqlite3` - a database file
//! - `sqlite::memory:` - a private in-memory database
//!
//! Query strings such as `?mode=rwc` are accepted and ignored.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::connection::SqliteConnection;
use crate::error::{Result, SqliteError};

/// URL used when nothing else is configured.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:db.sqlite3";

/// Environment variable read by [`SqliteConfig::from_env`].
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Where a database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A private in-memory database.
    Memory,
    /// A database file.
    File(PathBuf),
}

/// Settings for opening a [`SqliteConnection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database URL.
    pub url: String,
    /// Enforce `FOREIGN KEY` constraints.
    pub foreign_keys: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            url: String::from(DEFAULT_DATABASE_URL),
            foreign_keys: true,
        }
    }
}

impl SqliteConfig {
    /// Configuration for `url` with default settings.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Configuration from the `DATABASE_URL` environment variable, falling
    /// back to [`DEFAULT_DATABASE_URL`].
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var(DATABASE_URL_ENV).map_or_else(|_| Self::default(), Self::from_url)
    }

    /// Reads a JSON configuration file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| SqliteError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Enables or disables foreign key enforcement.
    #[must_use]
    pub const fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Parses the URL.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::UnsupportedUrl`] for anything but a `sqlite:`
    /// URL with a non-empty path.
    pub fn location(&self) -> Result<Location> {
        let unsupported = || SqliteError::UnsupportedUrl(self.url.clone());

        let rest = self.url.strip_prefix("sqlite:").ok_or_else(unsupported)?;
        let rest = rest.split_once('?').map_or(rest, |(path, _)| path);
        if rest == ":memory:" || rest == "//:memory:" {
            return Ok(Location::Memory);
        }

        let path = rest.strip_prefix("//").unwrap_or(rest);
        if path.is_empty() {
            return Err(unsupported());
        }
        Ok(Location::File(PathBuf::from(path)))
    }

    /// Opens a connection and applies the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not supported or SQLite fails to open
    /// or configure the database.
    pub fn open(&self) -> Result<SqliteConnection> {
        debug!(url = %self.url, foreign_keys = self.foreign_keys, "opening database");
        let conn = match self.location()? {
            Location::Memory => SqliteConnection::open_in_memory()?,
            Location::File(path) => SqliteConnection::open(path)?,
        };
        conn.set_foreign_keys(self.foreign_keys)?;
        Ok(conn)
    }
}
