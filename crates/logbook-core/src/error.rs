//! Error types for logbook-core

use thiserror::Error;

/// Result type alias using logbook-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in logbook-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local database unavailable, corrupt, or rejected a write
    #[error("Storage error: {0}")]
    Storage(String),

    /// libSQL error
    #[error("Storage error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote unreachable or answered with a non-success status
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP transport error (includes timeouts)
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Entry not found in the local store
    #[error("Entry not found: {0}")]
    NotFound(i64),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Missing or unusable configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Local database failures, including filesystem errors around it.
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::LibSql(_) | Self::Io(_))
    }

    /// Remote failures of any kind, transport or status.
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Http(_))
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_error_kinds() {
        assert!(Error::Storage("disk full".into()).is_storage());
        assert!(Error::Network("HTTP 503".into()).is_network());
        assert!(Error::NotFound(7).is_not_found());
        assert!(!Error::InvalidInput("blank".into()).is_network());
        assert!(!Error::Network("HTTP 503".into()).is_storage());
    }

    #[test]
    fn not_found_message_names_the_id() {
        assert_eq!(Error::NotFound(-3).to_string(), "Entry not found: -3");
    }
}
