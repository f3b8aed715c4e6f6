//! Error types for Lectern
//!
//! This module defines the error type used throughout the library.
//! We use thiserror for convenient error type definitions and anyhow for
//! application-level error handling in the binary.
//!
//! None of these errors are meant to reach the host page as a failure: the
//! player logs them and degrades the affected feature instead.

use thiserror::Error;

/// Main error type for Lectern
#[derive(Error, Debug)]
pub enum PlayerError {
    /// Playback engine errors (bad source, missing SDK, engine failure)
    #[error("Engine error: {0}")]
    Engine(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Preference store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Host API transport errors (non-success status, unreachable host)
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O errors
    #[error("File error: {0}")]
    FileIO(#[from] std::io::Error),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Generic error for unexpected situations
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results in Lectern
pub type Result<T> = std::result::Result<T, PlayerError>;

impl PlayerError {
    /// Whether the host could not be reached or answered with a failure
    pub fn is_transport(&self) -> bool {
        matches!(self, PlayerError::Transport(_) | PlayerError::Http(_))
    }
}

/// Extension trait for converting other errors to PlayerError
pub trait IntoPlayerError<T> {
    /// Convert this error into a PlayerError with the given context
    fn engine_err(self, context: &str) -> Result<T>;
    fn config_err(self, context: &str) -> Result<T>;
    fn storage_err(self, context: &str) -> Result<T>;
    fn transport_err(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> IntoPlayerError<T> for std::result::Result<T, E> {
    fn engine_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PlayerError::Engine(format!("{}: {}", context, e)))
    }

    fn config_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PlayerError::Config(format!("{}: {}", context, e)))
    }

    fn storage_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PlayerError::Storage(format!("{}: {}", context, e)))
    }

    fn transport_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PlayerError::Transport(format!("{}: {}", context, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlayerError::Engine("no playable source".to_string());
        assert_eq!(err.to_string(), "Engine error: no playable source");

        let err = PlayerError::Transport("HTTP 500".to_string());
        assert_eq!(err.to_string(), "Transport error: HTTP 500");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let player_err: PlayerError = io_err.into();
        assert!(matches!(player_err, PlayerError::FileIO(_)));
    }

    #[test]
    fn test_into_player_error_trait() {
        let result: std::result::Result<(), &str> = Err("connection refused");
        let converted = result.transport_err("Posting save state");

        match converted {
            Err(PlayerError::Transport(msg)) => {
                assert_eq!(msg, "Posting save state: connection refused");
            }
            _ => panic!("Expected Transport error"),
        }
    }

    #[test]
    fn test_transport_classification() {
        assert!(PlayerError::Transport("HTTP 404".to_string()).is_transport());
        assert!(!PlayerError::Engine("no source".to_string()).is_transport());
        assert!(!PlayerError::NotFound("slot".to_string()).is_transport());
    }
}
