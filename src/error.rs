//! Crate-level error type
//!
//! `Eip712Error` carries the precise failure inside the library; `SignerError`
//! is the flat, serializable form handed to callers such as the CLI.

use crate::eip712::Eip712Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Serializable error with a stable code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl SignerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, msg)
    }
}

impl fmt::Display for SignerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for SignerError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Schema errors
    DuplicateType,
    UnknownReference,
    CyclicType,
    InvalidType,
    InvalidPrimaryType,

    // Value errors
    TypeMismatch,
    ValueOutOfRange,
    MissingField,
    UnexpectedField,
    ArityMismatch,
    InvalidAddress,

    // Crypto errors
    InvalidSignature,
    InvalidPrivateKey,

    // Input errors
    InvalidInput,
    JsonError,
    ConfigError,
    IoError,
}

/// Result type alias for signer operations
pub type SignerResult<T> = Result<T, SignerError>;

impl From<Eip712Error> for SignerError {
    fn from(e: Eip712Error) -> Self {
        let code = match &e {
            Eip712Error::DuplicateType(_) => ErrorCode::DuplicateType,
            Eip712Error::UnknownReference { .. } => ErrorCode::UnknownReference,
            Eip712Error::CyclicType(_) => ErrorCode::CyclicType,
            Eip712Error::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            Eip712Error::ValueOutOfRange { .. } => ErrorCode::ValueOutOfRange,
            Eip712Error::InvalidSignature(_) => ErrorCode::InvalidSignature,
            Eip712Error::InvalidType(_) => ErrorCode::InvalidType,
            Eip712Error::InvalidPrimaryType(_) => ErrorCode::InvalidPrimaryType,
            Eip712Error::MissingField(_) => ErrorCode::MissingField,
            Eip712Error::UnexpectedField(_) => ErrorCode::UnexpectedField,
            Eip712Error::ArityMismatch { .. } => ErrorCode::ArityMismatch,
            Eip712Error::InvalidAddress(_) => ErrorCode::InvalidAddress,
            Eip712Error::InvalidJson(_) => ErrorCode::JsonError,
            Eip712Error::SigningError(_) => ErrorCode::InvalidPrivateKey,
        };
        SignerError::new(code, e.to_string())
    }
}

impl From<serde_json::Error> for SignerError {
    fn from(e: serde_json::Error) -> Self {
        SignerError::new(ErrorCode::JsonError, e.to_string())
    }
}

impl From<std::io::Error> for SignerError {
    fn from(e: std::io::Error) -> Self {
        SignerError::new(ErrorCode::IoError, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = SignerError::invalid_input("missing --private-key").with_details("or set TYPED_SIGNER_PRIVATE_KEY");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"code\":\"invalid_input\""));
        assert!(json.contains("TYPED_SIGNER_PRIVATE_KEY"));

        let bare = serde_json::to_string(&SignerError::config("x")).unwrap();
        assert!(!bare.contains("details"));
    }

    #[test]
    fn test_from_eip712_error() {
        let err: SignerError = Eip712Error::CyclicType("A -> B -> A".into()).into();
        assert_eq!(err.code, ErrorCode::CyclicType);
        assert!(err.message.contains("A -> B -> A"));

        let err: SignerError = Eip712Error::mismatch("Mail.from", "Person", "string").into();
        assert_eq!(err.code, ErrorCode::TypeMismatch);
        assert!(err.message.contains("Mail.from"));

        let err: SignerError = Eip712Error::SigningError("bad key".into()).into();
        assert_eq!(err.code, ErrorCode::InvalidPrivateKey);
    }

    #[test]
    fn test_display() {
        let err = SignerError::new(ErrorCode::InvalidSignature, "bad v").with_details("0x1d");
        assert_eq!(err.to_string(), "[InvalidSignature] bad v (0x1d)");
    }
}
