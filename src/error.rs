//! Error types for Tangerine
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Tangerine operations
///
/// This enum encompasses all possible errors that can occur during
/// model loading, generation, session storage, and configuration
/// handling.
#[derive(Error, Debug)]
pub enum TangerineError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model load errors (non-fatal, the user may retry with another model)
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// Generation errors (terminate the current turn only)
    #[error("Generation error: {0}")]
    Generation(String),

    /// Session storage errors (file I/O, serialization of session documents)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Requested session does not exist
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A generation is already in flight; concurrent sends are rejected, not queued
    #[error("A generation is already in progress")]
    GenerationInFlight,

    /// No model has been loaded yet
    #[error("No model is loaded")]
    ModelNotLoaded,

    /// User message was empty after trimming
    #[error("Cannot send an empty message")]
    EmptyMessage,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Tangerine operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = TangerineError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_model_load_error_display() {
        let error = TangerineError::ModelLoad("file not found".to_string());
        assert_eq!(error.to_string(), "Model load error: file not found");
    }

    #[test]
    fn test_generation_error_display() {
        let error = TangerineError::Generation("runtime disconnected".to_string());
        assert_eq!(error.to_string(), "Generation error: runtime disconnected");
    }

    #[test]
    fn test_storage_error_display() {
        let error = TangerineError::Storage("permission denied".to_string());
        assert_eq!(error.to_string(), "Storage error: permission denied");
    }

    #[test]
    fn test_session_not_found_display() {
        let error = TangerineError::SessionNotFound("1700000000_missing".to_string());
        assert_eq!(error.to_string(), "Session not found: 1700000000_missing");
    }

    #[test]
    fn test_generation_in_flight_display() {
        let error = TangerineError::GenerationInFlight;
        assert_eq!(error.to_string(), "A generation is already in progress");
    }

    #[test]
    fn test_model_not_loaded_display() {
        let error = TangerineError::ModelNotLoaded;
        assert_eq!(error.to_string(), "No model is loaded");
    }

    #[test]
    fn test_empty_message_display() {
        let error = TangerineError::EmptyMessage;
        assert_eq!(error.to_string(), "Cannot send an empty message");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: TangerineError = io_error.into();
        assert!(matches!(error, TangerineError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_str = "{invalid json}";
        let json_error = serde_json::from_str::<serde_json::Value>(json_str).unwrap_err();
        let error: TangerineError = json_error.into();
        assert!(matches!(error, TangerineError::Serialization(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TangerineError>();
    }
}
