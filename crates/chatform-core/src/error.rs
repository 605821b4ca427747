use thiserror::Error;

/// A convenience `Result` alias using [`ChatformError`].
pub type ChatformResult<T> = Result<T, ChatformError>;

/// Top-level error type for the Chatform session engine.
///
/// Each variant corresponds to a subsystem that can produce errors. Nothing
/// in this taxonomy is fatal to the enclosing form: transport and store
/// errors are recoverable and the in-memory transcript remains the source of
/// truth for the current session.
#[derive(Error, Debug)]
pub enum ChatformError {
    /// An error from the real-time voice transport (connection, send).
    #[error("Transport error: {0}")]
    Transport(String),

    /// An error related to session identity or transcript handling.
    #[error("Session error: {0}")]
    Session(String),

    /// An error from the conversation store (load or persist).
    #[error("Store error: {0}")]
    Store(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
