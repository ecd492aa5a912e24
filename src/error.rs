//! Error types for Know Thy Taste
//!
//! Structured errors are defined with thiserror. Scoring, extraction and
//! vagueness analysis never produce errors; everything here comes from the
//! collaborators around them (storage, cipher, configuration).

use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for Know Thy Taste operations
#[derive(Error, Debug)]
pub enum KttError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool could not hand out or run a connection
    #[error("Connection pool error: {0}")]
    Pool(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Sealing a response failed
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// A single record could not be decrypted
    #[error(transparent)]
    Decryption(#[from] DecryptionFailure),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Consent that cannot be withdrawn or is missing
    #[error("Consent required: {0}")]
    ConsentRequired(String),

    /// Invalid operation (e.g. answering a question after the session completed)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Know Thy Taste operations
pub type Result<T> = std::result::Result<T, KttError>;

impl From<anyhow::Error> for KttError {
    fn from(err: anyhow::Error) -> Self {
        KttError::Other(format!("{:#}", err))
    }
}

/// A ciphertext could not be turned back into plaintext.
///
/// Always non-fatal for batch work: the record is skipped and the run goes on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to decrypt record: {reason}")]
pub struct DecryptionFailure {
    pub reason: String,
}

impl DecryptionFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KttError::NotFound("session 42".to_string());
        assert_eq!(err.to_string(), "Not found: session 42");
    }

    #[test]
    fn test_decryption_failure_is_transparent() {
        let err: KttError = DecryptionFailure::new("bad header").into();
        assert!(matches!(err, KttError::Decryption(_)));
        assert_eq!(err.to_string(), "Failed to decrypt record: bad header");
    }

    #[test]
    fn test_anyhow_conversion_keeps_context() {
        let err = anyhow::anyhow!("root cause").context("while sealing");
        let converted: KttError = err.into();
        assert_eq!(converted.to_string(), "while sealing: root cause");
    }
}
