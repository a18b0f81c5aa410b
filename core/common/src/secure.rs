//! Owned byte buffer for sensitive data.
//!
//! `SecureBytes` is the only container the engine uses for master secrets,
//! derived key material and generated passwords. It has a single owner, it is
//! never cloned, and its memory is overwritten with random bytes and then
//! zeros before being released, on every exit path.
//!
//! # Abort condition
//! The infallible constructors (`from_bytes`, `from_vec`) go through the global
//! allocator, which aborts the process when an allocation fails. That is the
//! intended behaviour: a process that cannot allocate cannot be trusted to
//! finish wiping the secrets it already holds. Use [`SecureBytes::zeroed`]
//! when the failure must be reported as [`DerivationError::Allocation`].

use rand::{Rng, RngCore};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{DerivationError, DerivationResult};

/// Sensitive byte buffer that is wiped on drop.
///
/// The backing `Vec` is never grown after construction, so the bytes are never
/// copied to a second allocation behind the owner's back.
#[derive(Default)]
pub struct SecureBytes {
    data: Vec<u8>,
}

impl SecureBytes {
    /// Copy `data` into a new owned buffer.
    ///
    /// The caller stays responsible for wiping its own copy of `data`.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    /// Take ownership of `data` without copying it.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Allocate an all-zero buffer of exactly `len` bytes.
    ///
    /// # Errors
    /// - `DerivationError::Allocation` if the memory cannot be reserved
    pub fn zeroed(len: usize) -> DerivationResult<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| DerivationError::Allocation(len))?;
        data.resize(len, 0);
        Ok(Self { data })
    }

    /// Read-only view of the bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Mutable view of the bytes. The length cannot change through it.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// View the bytes as UTF-8 text, if they are valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    /// Get the length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Compare with `other` in time independent of where the contents differ.
    ///
    /// Lengths are compared first; they are not considered secret.
    pub fn constant_time_eq(&self, other: &SecureBytes) -> bool {
        self.data.as_slice().ct_eq(other.data.as_slice()).into()
    }

    /// Overwrite the contents with random bytes, then zeros.
    ///
    /// The spare capacity of the backing `Vec` is overwritten as well, since a
    /// vector handed to [`SecureBytes::from_vec`] may hold old bytes past its
    /// length. The allocation and length are kept, so the buffer can be reused.
    pub fn scrub(&mut self) {
        wipe(&mut self.data);

        let spare = self.data.spare_capacity_mut();
        if spare.is_empty() {
            return;
        }
        let mut rng = rand::thread_rng();
        for slot in spare.iter_mut() {
            slot.write(rng.gen());
        }
        spare.zeroize();
    }

    /// Wipe the contents and release the allocation.
    ///
    /// Safe to call repeatedly; afterwards the buffer behaves as empty.
    pub fn clear(&mut self) {
        self.scrub();
        drop(std::mem::take(&mut self.data));
    }
}

/// Overwrite `buf` with random bytes, then zeros.
pub fn wipe(buf: &mut [u8]) {
    if buf.is_empty() {
        return;
    }
    rand::thread_rng().fill_bytes(buf);
    buf.zeroize();
}

impl Drop for SecureBytes {
    fn drop(&mut self) {
        self.clear();
    }
}

impl ZeroizeOnDrop for SecureBytes {}

impl PartialEq for SecureBytes {
    fn eq(&self, other: &Self) -> bool {
        self.constant_time_eq(other)
    }
}

impl Eq for SecureBytes {}

impl From<Vec<u8>> for SecureBytes {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}

impl From<String> for SecureBytes {
    fn from(data: String) -> Self {
        Self::from_vec(data.into_bytes())
    }
}

impl fmt::Debug for SecureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureBytes([REDACTED; {} bytes])", self.data.len())
    }
}
