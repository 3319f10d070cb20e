use thiserror::Error;

/// Errors surfaced by role agents, the orchestrator and session storage
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConsultError {
    /// Role name outside the closed set of supported roles
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// The generation oracle failed to load, tokenize or produce output
    #[error("Oracle error: {0}")]
    OracleError(String),

    /// An operation that needs an uploaded report ran before one existed
    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

pub type Result<T> = std::result::Result<T, ConsultError>;
