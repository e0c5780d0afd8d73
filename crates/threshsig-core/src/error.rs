//! Error types for threshold RSA operations

use thiserror::Error;

/// Result type alias for threshold RSA operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during key generation, signing or combination
#[derive(Debug, Error)]
pub enum Error {
    /// Bad key size, threshold or exponent
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Prime search exhausted its retry budget
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// Fewer distinct signature shares than the threshold
    #[error("Insufficient shares: required {required}, got {actual}")]
    InsufficientShares { required: usize, actual: usize },

    /// Share index out of range or repeated
    #[error("Invalid share index {index}: {reason}")]
    InvalidIndex { index: usize, reason: &'static str },

    /// Wrapped key share failed to decode
    #[error("Malformed key share: {0}")]
    MalformedShare(String),

    /// Message could not be encoded for the modulus
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Signature did not verify under the group key
    #[error("Invalid signature")]
    InvalidSignature,
}

impl From<bincode::error::DecodeError> for Error {
    fn from(e: bincode::error::DecodeError) -> Self {
        Error::MalformedShare(e.to_string())
    }
}

impl From<bincode::error::EncodeError> for Error {
    fn from(e: bincode::error::EncodeError) -> Self {
        Error::Encoding(e.to_string())
    }
}
