use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] logbook_core::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Entry not found: {0}")]
    EntryNotFound(i64),
    #[error("Watch interval must be at least one second")]
    InvalidInterval,
    #[error(
        "Remote API is not configured. Pass --api-url, set LOGBOOK_API_URL, or add api_url to the config file."
    )]
    RemoteNotConfigured,
}
