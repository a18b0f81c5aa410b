//! Deterministic password generation pipeline.
//!
//! salt derivation -> Argon2id -> charset expansion. The master secret and all
//! intermediate key material live in `SecureBytes` and are wiped on every exit
//! path; scratch buffers come from a [`SecureAllocator`].

use std::fmt;
use std::sync::Arc;

use crate::charset::{expand_with, CHARSET};
use crate::kdf::{derive_key_pooled, KdfParams};
use crate::pool::SecureAllocator;
use crate::salt::{derive_salt, SALT_VERSION};
use axiompass_common::{DerivationResult, OutputLength, SecureBytes};

/// Everything besides the master secret that determines a password.
///
/// The pepper is kept in a [`SecureBytes`] and wiped when the request is
/// dropped, so a request is not `Clone`.
#[derive(PartialEq, Eq)]
pub struct DerivationRequest {
    service_id: String,
    account_id: String,
    pepper: SecureBytes,
    output_length: OutputLength,
    kdf_params: KdfParams,
}

impl DerivationRequest {
    /// Create a request with an empty pepper.
    pub fn new(
        service_id: impl Into<String>,
        account_id: impl Into<String>,
        output_length: OutputLength,
        kdf_params: KdfParams,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            account_id: account_id.into(),
            pepper: SecureBytes::default(),
            output_length,
            kdf_params,
        }
    }

    /// Set the pepper mixed into the salt.
    ///
    /// The string's allocation moves into the request and is wiped with it.
    pub fn with_pepper(mut self, pepper: impl Into<String>) -> Self {
        self.pepper = SecureBytes::from(pepper.into());
        self
    }

    /// Get the service identifier.
    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Get the account identifier.
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Get the pepper, empty when none was set.
    pub fn pepper(&self) -> &str {
        // Always built from a `String`, so the bytes are valid UTF-8.
        self.pepper.as_str().unwrap_or_default()
    }

    /// Get the requested password length.
    pub fn output_length(&self) -> OutputLength {
        self.output_length
    }

    /// Get the Argon2id parameters.
    pub fn kdf_params(&self) -> &KdfParams {
        &self.kdf_params
    }
}

impl fmt::Debug for DerivationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivationRequest")
            .field("service_id", &self.service_id)
            .field("account_id", &self.account_id)
            .field("pepper", &"[REDACTED]")
            .field("output_length", &self.output_length)
            .field("kdf_params", &self.kdf_params)
            .finish()
    }
}

/// Password generator bound to a buffer allocator.
#[derive(Clone)]
pub struct PasswordGenerator {
    allocator: Arc<SecureAllocator>,
}

impl PasswordGenerator {
    /// Create a generator using the process-wide allocator.
    pub fn new() -> Self {
        Self::with_allocator(SecureAllocator::global())
    }

    /// Create a generator using a caller-provided allocator.
    pub fn with_allocator(allocator: Arc<SecureAllocator>) -> Self {
        Self { allocator }
    }

    /// Allocator used for scratch buffers.
    pub fn allocator(&self) -> &Arc<SecureAllocator> {
        &self.allocator
    }

    /// Derive the password for `request` from `master_secret`.
    ///
    /// # Preconditions
    /// - `master_secret` should be non-empty; the caller enforces this
    ///
    /// # Postconditions
    /// - Returns exactly `request.output_length()` characters from `CHARSET`
    /// - Identical inputs always yield identical output
    /// - `master_secret` and the derived key are wiped before returning
    ///
    /// # Errors
    /// - `DerivationError::Configuration` for invalid KDF parameters
    /// - `DerivationError::InsufficientMaterial` if expansion falls short
    /// - `DerivationError::Allocation` if a secure buffer cannot be allocated
    pub fn generate(
        &self,
        master_secret: SecureBytes,
        request: &DerivationRequest,
    ) -> DerivationResult<SecureBytes> {
        let salt = derive_salt(
            &request.service_id,
            &request.account_id,
            request.pepper(),
            SALT_VERSION,
        );

        let key = derive_key_pooled(
            &self.allocator,
            &master_secret,
            &salt,
            &request.kdf_params,
            request.output_length,
        )?;
        drop(master_secret);

        let password = expand_with(
            &self.allocator,
            key.as_slice(),
            CHARSET,
            request.output_length.get(),
        );
        self.allocator.put(key);
        password
    }
}

impl Default for PasswordGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive a password using the process-wide allocator.
///
/// # Errors
/// - `DerivationError::InvalidLength` if `output_length` is outside `4..=128`
/// - any error of [`PasswordGenerator::generate`]
pub fn generate_password(
    master_secret: SecureBytes,
    service_id: &str,
    account_id: &str,
    pepper: &str,
    output_length: usize,
    kdf_params: &KdfParams,
) -> DerivationResult<SecureBytes> {
    let output_length = OutputLength::new(output_length)?;
    let request =
        DerivationRequest::new(service_id, account_id, output_length, *kdf_params).with_pepper(pepper);
    PasswordGenerator::new().generate(master_secret, &request)
}
