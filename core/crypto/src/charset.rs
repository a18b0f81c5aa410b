//! Mapping of derived key material onto printable characters.
//!
//! The key material is read as one big-endian unsigned integer and written out
//! in base `R`, where `R` is the size of the character set. Every byte of the
//! material contributes to the result. When the integer runs out before the
//! password is long enough, the expansion continues from
//! `SHA-256(previous material ++ characters so far)`.
//!
//! Every heap buffer holding key material or output comes from the pool and is
//! scrubbed on return. The one exception is the `Sha256` state used for
//! re-hashing: `sha2` 0.10 offers no way to zeroize it, so its chaining value
//! and the trailing partial block of its input stay on the stack after the
//! round. This stack residue is accepted.

use sha2::digest::generic_array::GenericArray;
use sha2::{Digest, Sha256};

use crate::pool::SecureAllocator;
use axiompass_common::{DerivationError, DerivationResult, SecureBytes};

/// Number of characters in [`CHARSET`].
pub const CHARSET_LEN: usize = 90;

/// Alphabet for generated passwords, in radix order.
///
/// Uppercase letters (26), lowercase letters (26), digits (10) and 28 symbols.
/// The order is part of the output format: changing it changes every password.
pub const CHARSET: &[u8; CHARSET_LEN] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()_+-=[]{}|;:,.<>?~/";

/// Upper bound on re-hash rounds during a single expansion.
pub const MAX_EXTENSION_ROUNDS: usize = 1024;

const DIGEST_LEN: usize = 32;

/// Entropy in bits of a uniformly random `length`-character password over
/// [`CHARSET`].
pub fn entropy_bits(length: usize) -> f64 {
    length as f64 * (CHARSET_LEN as f64).log2()
}

/// Expand `key_material` into `target_length` characters drawn from `charset`.
///
/// `target_length` is expected to be validated by the caller.
///
/// # Errors
/// - `DerivationError::Configuration` if `charset` has fewer than 2 or more
///   than 256 entries
/// - `DerivationError::InsufficientMaterial` if the expansion cannot produce
///   `target_length` characters
/// - `DerivationError::Allocation` if scratch buffers cannot be allocated
pub fn expand(
    key_material: &[u8],
    charset: &[u8],
    target_length: usize,
) -> DerivationResult<SecureBytes> {
    expand_with(&SecureAllocator::global(), key_material, charset, target_length)
}

/// Same as [`expand`], taking scratch buffers from `allocator`.
pub fn expand_with(
    allocator: &SecureAllocator,
    key_material: &[u8],
    charset: &[u8],
    target_length: usize,
) -> DerivationResult<SecureBytes> {
    if !(2..=256).contains(&charset.len()) {
        return Err(DerivationError::Configuration(format!(
            "charset must have between 2 and 256 characters, got {}",
            charset.len()
        )));
    }

    let mut output = allocator.get(target_length)?;
    let mut number = allocator.get(key_material.len())?;
    number.as_mut_slice().copy_from_slice(key_material);

    let mut produced = emit_digits(number.as_mut_slice(), charset, output.as_mut_slice(), 0);

    let mut seed: Option<SecureBytes> = None;
    let mut rounds = 0;
    while produced < target_length {
        if rounds == MAX_EXTENSION_ROUNDS {
            return Err(DerivationError::InsufficientMaterial {
                produced,
                required: target_length,
            });
        }
        rounds += 1;

        // Hasher state is not wiped; see the module documentation.
        let mut hasher = Sha256::new();
        hasher.update(seed.as_ref().map_or(key_material, SecureBytes::as_slice));
        hasher.update(&output.as_slice()[..produced]);

        let mut next = allocator.get(DIGEST_LEN)?;
        hasher.finalize_into(GenericArray::from_mut_slice(next.as_mut_slice()));

        allocator.put(number);
        number = allocator.get(DIGEST_LEN)?;
        number.as_mut_slice().copy_from_slice(next.as_slice());
        if let Some(previous) = seed.replace(next) {
            allocator.put(previous);
        }

        produced = emit_digits(number.as_mut_slice(), charset, output.as_mut_slice(), produced);
    }

    allocator.put(number);
    if let Some(seed) = seed {
        allocator.put(seed);
    }

    if produced != target_length || output.len() != target_length {
        return Err(DerivationError::InsufficientMaterial {
            produced,
            required: target_length,
        });
    }
    Ok(output)
}

/// Write base-`charset.len()` digits of `number` into `output[produced..]`,
/// least significant first, until the number is zero or the output is full.
///
/// `number` is consumed by the division. Returns the new `produced` count.
fn emit_digits(number: &mut [u8], charset: &[u8], output: &mut [u8], mut produced: usize) -> usize {
    let radix = charset.len() as u32;
    let mut start = first_nonzero(number, 0);

    while start < number.len() && produced < output.len() {
        let digit = divmod_in_place(&mut number[start..], radix);
        output[produced] = charset[digit as usize];
        produced += 1;
        start = first_nonzero(number, start);
    }
    produced
}

/// Divide the big-endian integer in `number` by `radix`, returning the remainder.
fn divmod_in_place(number: &mut [u8], radix: u32) -> u32 {
    let mut remainder = 0u32;
    for byte in number.iter_mut() {
        let acc = (remainder << 8) | u32::from(*byte);
        *byte = (acc / radix) as u8;
        remainder = acc % radix;
    }
    remainder
}

fn first_nonzero(number: &[u8], from: usize) -> usize {
    number[from..]
        .iter()
        .position(|&b| b != 0)
        .map_or(number.len(), |offset| from + offset)
}
