//! Common types used throughout AxiomPass.

use std::fmt;

use crate::error::{DerivationError, DerivationResult};

/// Shortest password the engine will produce.
pub const MIN_OUTPUT_LENGTH: usize = 4;

/// Longest password the engine will produce.
pub const MAX_OUTPUT_LENGTH: usize = 128;

/// Number of characters in a generated password.
///
/// Always within `MIN_OUTPUT_LENGTH..=MAX_OUTPUT_LENGTH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutputLength(usize);

impl OutputLength {
    /// Validate a requested password length.
    ///
    /// # Errors
    /// - `DerivationError::InvalidLength` if `length` is out of range
    pub fn new(length: usize) -> DerivationResult<Self> {
        if !(MIN_OUTPUT_LENGTH..=MAX_OUTPUT_LENGTH).contains(&length) {
            return Err(DerivationError::InvalidLength {
                length,
                min: MIN_OUTPUT_LENGTH,
                max: MAX_OUTPUT_LENGTH,
            });
        }
        Ok(Self(length))
    }

    /// Get the length as a plain integer.
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for OutputLength {
    fn default() -> Self {
        Self(16)
    }
}

impl TryFrom<usize> for OutputLength {
    type Error = DerivationError;

    fn try_from(length: usize) -> DerivationResult<Self> {
        Self::new(length)
    }
}

impl fmt::Display for OutputLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
