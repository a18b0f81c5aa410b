//! Common error types for AxiomPass.

use thiserror::Error;

/// Errors produced by the password derivation engine.
///
/// Every variant is final for the call that produced it: derivation is a pure
/// function of its inputs, so retrying with the same inputs cannot succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerivationError {
    /// KDF cost parameters or the character set are invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Charset expansion could not reach the requested length.
    ///
    /// This indicates a broken internal invariant and should be reported as a bug.
    #[error("Insufficient key material: produced {produced} of {required} characters")]
    InsufficientMaterial { produced: usize, required: usize },

    /// A secure buffer could not be allocated.
    #[error("Secure buffer allocation failed for {0} bytes")]
    Allocation(usize),

    /// Requested password length is outside the supported range.
    #[error("Invalid password length {length}: must be between {min} and {max}")]
    InvalidLength { length: usize, min: usize, max: usize },
}

/// Result type alias for derivation operations.
pub type DerivationResult<T> = std::result::Result<T, DerivationError>;

/// Top-level error type for AxiomPass operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Password derivation failed.
    #[error(transparent)]
    Derivation(#[from] DerivationError),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
