//! Cryptographic core of AxiomPass.
//!
//! This module provides:
//! - Pools of pre-zeroed scratch buffers for sensitive data
//! - Salt derivation from service and account identifiers
//! - Key derivation using Argon2id
//! - Expansion of key material into printable passwords
//! - The `generate_password` pipeline tying them together
//!
//! # Security Guarantees
//! - All key material is wiped on drop, on success and error paths alike
//! - Nothing in this crate performs I/O or logging
//! - Output depends only on the inputs, on every platform

pub mod charset;
pub mod generator;
pub mod kdf;
pub mod pool;
pub mod salt;

pub use charset::{entropy_bits, expand, expand_with, CHARSET, CHARSET_LEN};
pub use generator::{generate_password, DerivationRequest, PasswordGenerator};
pub use kdf::{derive_key, derive_key_into, KdfParams};
pub use pool::{SecureAllocator, SecureBufferPool, DEFAULT_POOL_CAPACITY};
pub use salt::{derive_salt, Salt, SALT_LENGTH, SALT_VERSION};

pub use axiompass_common::{DerivationError, OutputLength, SecureBytes};
