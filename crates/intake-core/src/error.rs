use crate::event::SessionId;
use thiserror::Error;

/// A convenience `Result` alias using [`IntakeError`].
pub type IntakeResult<T> = Result<T, IntakeError>;

/// Top-level error type for the intake bot.
///
/// Each variant corresponds to a subsystem that can produce errors. Malformed
/// user input is never an `IntakeError`; see [`crate::ValidationError`].
#[derive(Error, Debug)]
pub enum IntakeError {
    /// No session exists for the given identifier.
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    /// An error from a communication channel (e.g. the Telegram Bot API).
    #[error("Channel error: {0}")]
    Channel(String),

    /// An error from the ingress gateway layer.
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// An error from an outbound HTTP request.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
