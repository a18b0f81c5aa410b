//! Common utilities and types shared across AxiomPass modules.
//!
//! This module provides the error taxonomy and the secure memory type that
//! every other crate builds on, so sensitive bytes have a single owner and a
//! single wipe discipline throughout the workspace.

pub mod error;
pub mod secure;
pub mod types;

pub use error::{DerivationError, DerivationResult, Error, Result};
pub use secure::SecureBytes;
pub use types::{OutputLength, MAX_OUTPUT_LENGTH, MIN_OUTPUT_LENGTH};
