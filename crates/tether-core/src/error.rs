//! Error types for tether-core

use thiserror::Error;

/// Result type alias using tether-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, assembling or persisting messages
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A recorded event line could not be decoded
    #[error("Invalid event on line {line}: {message}")]
    InvalidEvent { line: usize, message: String },

    /// No session with the given id exists
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A transcript file could not be read (yet)
    #[error("Transcript unavailable: {0}")]
    TranscriptUnavailable(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create an invalid-event error for a 1-based line number
    pub fn invalid_event(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidEvent {
            line,
            message: message.into(),
        }
    }

    /// Check if this error only means "nothing to show yet".
    ///
    /// Transcript files are written by another process while we poll them, so a
    /// missing file or a half-written line is expected and retried later.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::TranscriptUnavailable(_) => true,
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::NotFound
                    | std::io::ErrorKind::PermissionDenied
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_missing_file() {
        let e = Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ));
        assert!(e.is_transient());
    }

    #[test]
    fn test_transient_unavailable() {
        assert!(Error::TranscriptUnavailable("/tmp/agent.jsonl".into()).is_transient());
    }

    #[test]
    fn test_not_transient_invalid_event() {
        assert!(!Error::invalid_event(3, "expected value").is_transient());
        assert!(!Error::SessionNotFound("abc".into()).is_transient());
    }

    #[test]
    fn test_invalid_event_display() {
        let e = Error::invalid_event(7, "missing field `index`");
        assert_eq!(
            e.to_string(),
            "Invalid event on line 7: missing field `index`"
        );
    }
}
