//! Key derivation using Argon2id.
//!
//! Argon2id is a memory-hard password hashing function that provides
//! resistance to both GPU and time-memory trade-off attacks.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use crate::pool::SecureAllocator;
use crate::salt::Salt;
use axiompass_common::{DerivationError, DerivationResult, OutputLength, SecureBytes};

/// Parameters for Argon2id key derivation.
///
/// Fields missing from a serialized form take the [`KdfParams::standard`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    /// Number of iterations.
    pub time_cost: u32,
    /// Memory cost in KiB (e.g., 262144 = 256 MiB).
    pub memory_cost_kib: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
    /// Minimum number of key bytes to derive.
    pub key_length: u32,
}

impl KdfParams {
    /// Default parameters for password generation.
    pub fn standard() -> Self {
        Self {
            time_cost: 3,
            memory_cost_kib: 262144, // 256 MiB
            parallelism: 4,
            key_length: 32,
        }
    }

    /// Create parameters suitable for interactive use.
    ///
    /// Targets well under a second on desktop hardware.
    pub fn interactive() -> Self {
        Self {
            time_cost: 3,
            memory_cost_kib: 65536, // 64 MiB
            parallelism: 4,
            key_length: 32,
        }
    }

    /// Create moderate parameters for mobile devices.
    pub fn moderate() -> Self {
        Self {
            time_cost: 3,
            memory_cost_kib: 32768, // 32 MiB
            parallelism: 2,
            key_length: 32,
        }
    }

    /// Higher security parameters that may take several seconds.
    pub fn sensitive() -> Self {
        Self {
            time_cost: 4,
            memory_cost_kib: 262144, // 256 MiB
            parallelism: 4,
            key_length: 32,
        }
    }

    /// Reject parameters that cannot drive a derivation.
    ///
    /// No value is ever replaced by a default here; that is left to the
    /// configuration layer.
    ///
    /// # Errors
    /// - `DerivationError::Configuration` for a zero cost or key length, or
    ///   any combination Argon2 refuses
    pub fn validate(&self) -> DerivationResult<()> {
        self.argon2_params(self.key_length as usize).map(|_| ())
    }

    /// Number of key bytes derived for a password of `output_length` characters.
    ///
    /// At least twice the character count, so expansion rarely needs to re-hash.
    pub fn derived_key_len(&self, output_length: OutputLength) -> usize {
        (self.key_length as usize).max(2 * output_length.get())
    }

    fn argon2_params(&self, output_len: usize) -> DerivationResult<Params> {
        if self.time_cost == 0 {
            return Err(invalid("time cost must be non-zero"));
        }
        if self.memory_cost_kib == 0 {
            return Err(invalid("memory cost must be non-zero"));
        }
        if self.parallelism == 0 {
            return Err(invalid("parallelism must be non-zero"));
        }
        if self.key_length == 0 {
            return Err(invalid("key length must be non-zero"));
        }

        Params::new(
            self.memory_cost_kib,
            self.time_cost,
            self.parallelism,
            Some(output_len),
        )
        .map_err(|e| invalid(&format!("invalid KDF parameters: {}", e)))
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::standard()
    }
}

fn invalid(msg: &str) -> DerivationError {
    DerivationError::Configuration(msg.to_string())
}

/// Derive raw key material from a master secret and salt using Argon2id.
///
/// # Postconditions
/// - Returns `params.derived_key_len(output_length)` bytes
/// - The derived key is deterministic given the same inputs
///
/// # Errors
/// - `DerivationError::Configuration` if `params` are invalid
/// - `DerivationError::Allocation` if the output buffer cannot be allocated
///
/// # Security
/// - The returned buffer is wiped when dropped
pub fn derive_key(
    master_secret: &SecureBytes,
    salt: &Salt,
    params: &KdfParams,
    output_length: OutputLength,
) -> DerivationResult<SecureBytes> {
    params.validate()?;
    let mut key = SecureBytes::zeroed(params.derived_key_len(output_length))?;
    derive_key_into(master_secret, salt, params, key.as_mut_slice())?;
    Ok(key)
}

/// Derive key material into `out`, deriving exactly `out.len()` bytes.
///
/// `out` is left zeroed if derivation fails.
pub fn derive_key_into(
    master_secret: &SecureBytes,
    salt: &Salt,
    params: &KdfParams,
    out: &mut [u8],
) -> DerivationResult<()> {
    let argon2_params = params.argon2_params(out.len())?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    argon2
        .hash_password_into(master_secret.as_slice(), salt.as_bytes(), out)
        .map_err(|e| {
            out.fill(0);
            invalid(&format!("key derivation failed: {}", e))
        })
}

/// Derive key material into a buffer taken from `allocator`.
///
/// On failure the buffer is scrubbed and returned to its pool.
pub(crate) fn derive_key_pooled(
    allocator: &SecureAllocator,
    master_secret: &SecureBytes,
    salt: &Salt,
    params: &KdfParams,
    output_length: OutputLength,
) -> DerivationResult<SecureBytes> {
    params.validate()?;
    let mut key = allocator.get(params.derived_key_len(output_length))?;
    match derive_key_into(master_secret, salt, params, key.as_mut_slice()) {
        Ok(()) => Ok(key),
        Err(e) => {
            allocator.put(key);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> KdfParams {
        KdfParams {
            time_cost: 1,
            memory_cost_kib: 64,
            parallelism: 1,
            key_length: 32,
        }
    }

    fn length(n: usize) -> OutputLength {
        OutputLength::new(n).unwrap()
    }

    #[test]
    fn test_derive_key_deterministic() {
        let secret = SecureBytes::from_bytes(b"test-password-123");
        let salt = Salt::from_bytes([42u8; 16]);
        let params = fast_params();

        let key1 = derive_key(&secret, &salt, &params, length(16)).unwrap();
        let key2 = derive_key(&secret, &salt, &params, length(16)).unwrap();

        assert_eq!(key1.as_slice(), key2.as_slice());
    }

    #[test]
    fn test_derive_key_different_salt() {
        let secret = SecureBytes::from_bytes(b"test-password-123");
        let params = fast_params();

        let key1 = derive_key(&secret, &Salt::from_bytes([1u8; 16]), &params, length(16)).unwrap();
        let key2 = derive_key(&secret, &Salt::from_bytes([2u8; 16]), &params, length(16)).unwrap();

        assert_ne!(key1.as_slice(), key2.as_slice());
    }

    #[test]
    fn test_derive_key_different_secret() {
        let salt = Salt::from_bytes([42u8; 16]);
        let params = fast_params();

        let key1 = derive_key(&SecureBytes::from_bytes(b"password1"), &salt, &params, length(16))
            .unwrap();
        let key2 = derive_key(&SecureBytes::from_bytes(b"password2"), &salt, &params, length(16))
            .unwrap();

        assert_ne!(key1.as_slice(), key2.as_slice());
    }

    #[test]
    fn test_derive_key_length_is_at_least_double_output() {
        let secret = SecureBytes::from_bytes(b"secret");
        let salt = Salt::from_bytes([7u8; 16]);
        let params = fast_params();

        assert_eq!(derive_key(&secret, &salt, &params, length(4)).unwrap().len(), 32);
        assert_eq!(derive_key(&secret, &salt, &params, length(16)).unwrap().len(), 32);
        assert_eq!(derive_key(&secret, &salt, &params, length(20)).unwrap().len(), 40);
        assert_eq!(derive_key(&secret, &salt, &params, length(128)).unwrap().len(), 256);
    }

    #[test]
    fn test_longer_output_is_not_prefix_extension() {
        // Argon2 mixes the output length into its initial hash.
        let secret = SecureBytes::from_bytes(b"secret");
        let salt = Salt::from_bytes([7u8; 16]);
        let params = fast_params();

        let short = derive_key(&secret, &salt, &params, length(16)).unwrap();
        let long = derive_key(&secret, &salt, &params, length(64)).unwrap();
        assert_ne!(short.as_slice(), &long.as_slice()[..short.len()]);
    }

    #[test]
    fn test_zero_parameters_rejected() {
        let secret = SecureBytes::from_bytes(b"secret");
        let salt = Salt::from_bytes([0u8; 16]);

        let cases = [
            KdfParams { time_cost: 0, ..fast_params() },
            KdfParams { memory_cost_kib: 0, ..fast_params() },
            KdfParams { parallelism: 0, ..fast_params() },
            KdfParams { key_length: 0, ..fast_params() },
        ];

        for params in cases {
            let err = derive_key(&secret, &salt, &params, length(16)).unwrap_err();
            assert!(
                matches!(err, DerivationError::Configuration(_)),
                "{:?} accepted",
                params
            );
        }
    }

    #[test]
    fn test_memory_below_argon2_minimum_rejected() {
        let params = KdfParams {
            memory_cost_kib: 8,
            parallelism: 4,
            ..fast_params()
        };
        assert!(matches!(
            params.validate(),
            Err(DerivationError::Configuration(_))
        ));
    }

    #[test]
    fn test_presets_are_valid() {
        for params in [
            KdfParams::standard(),
            KdfParams::interactive(),
            KdfParams::moderate(),
            KdfParams::sensitive(),
        ] {
            assert!(params.validate().is_ok());
        }
        assert_eq!(KdfParams::default(), KdfParams::standard());
    }

    #[test]
    fn test_derive_key_pooled_matches_direct() {
        let allocator = SecureAllocator::new();
        let secret = SecureBytes::from_bytes(b"pooled");
        let salt = Salt::from_bytes([3u8; 16]);
        let params = fast_params();

        let direct = derive_key(&secret, &salt, &params, length(16)).unwrap();
        let pooled = derive_key_pooled(&allocator, &secret, &salt, &params, length(16)).unwrap();
        assert_eq!(direct, pooled);
    }
}
