//! Pools of pre-zeroed scratch buffers for sensitive data.
//!
//! Derivation needs a handful of short-lived buffers per call (key material,
//! long-division scratch, re-hash seeds, the output itself). The pools keep
//! those allocations around between calls while upholding two rules:
//! - a buffer handed out by `get` is all zero
//! - a buffer accepted by `put` is scrubbed before it is stored or dropped

use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use zeroize::Zeroize;

use axiompass_common::{DerivationResult, SecureBytes};

/// Number of buffers each pool retains by default.
pub const DEFAULT_POOL_CAPACITY: usize = 10;

static GLOBAL_ALLOCATOR: Lazy<Arc<SecureAllocator>> =
    Lazy::new(|| Arc::new(SecureAllocator::new()));

/// Pool of buffers that all have the same size.
pub struct SecureBufferPool {
    buffer_size: usize,
    capacity: usize,
    free: Mutex<Vec<SecureBytes>>,
}

impl SecureBufferPool {
    /// Create an empty pool for buffers of `buffer_size` bytes.
    pub fn new(buffer_size: usize, capacity: usize) -> Self {
        Self {
            buffer_size,
            capacity,
            free: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Take a zeroed buffer of exactly `buffer_size` bytes.
    ///
    /// Falls back to a fresh allocation when the pool is empty; callers cannot
    /// tell the two apart.
    ///
    /// # Errors
    /// - `DerivationError::Allocation` if a fresh buffer cannot be allocated
    pub fn get(&self) -> DerivationResult<SecureBytes> {
        let pooled = self.lock().pop();
        match pooled {
            Some(mut buf) => {
                buf.as_mut_slice().zeroize();
                Ok(buf)
            }
            None => SecureBytes::zeroed(self.buffer_size),
        }
    }

    /// Return a buffer to the pool.
    ///
    /// The buffer is scrubbed first. It is kept only if it has this pool's
    /// size and the pool is below capacity; otherwise it is dropped.
    pub fn put(&self, mut buf: SecureBytes) {
        buf.scrub();
        if buf.len() != self.buffer_size {
            return;
        }

        let mut free = self.lock();
        if free.len() < self.capacity {
            free.push(buf);
        }
    }

    /// Size of the buffers in this pool.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Maximum number of idle buffers retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of idle buffers currently held.
    pub fn available(&self) -> usize {
        self.lock().len()
    }

    // Every stored buffer is scrubbed before it is pushed, so a poisoned
    // lock never exposes unwiped data.
    fn lock(&self) -> MutexGuard<'_, Vec<SecureBytes>> {
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registry of per-size buffer pools.
///
/// Pools are created on first use of a size. Lookups take a read lock; the
/// write lock is only taken to insert a missing pool, and the map is checked
/// again under it so concurrent first use creates exactly one pool.
pub struct SecureAllocator {
    pools: RwLock<HashMap<usize, Arc<SecureBufferPool>>>,
    pool_capacity: usize,
}

impl SecureAllocator {
    /// Create an allocator whose pools hold `DEFAULT_POOL_CAPACITY` buffers.
    pub fn new() -> Self {
        Self::with_pool_capacity(DEFAULT_POOL_CAPACITY)
    }

    /// Create an allocator with a custom per-pool capacity.
    pub fn with_pool_capacity(pool_capacity: usize) -> Self {
        Self {
            pools: RwLock::new(HashMap::new()),
            pool_capacity,
        }
    }

    /// Process-wide allocator shared by default generators.
    pub fn global() -> Arc<SecureAllocator> {
        Arc::clone(&GLOBAL_ALLOCATOR)
    }

    /// Get the pool for `size`, creating it if needed.
    pub fn pool(&self, size: usize) -> Arc<SecureBufferPool> {
        {
            let pools = self.pools.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(pool) = pools.get(&size) {
                return Arc::clone(pool);
            }
        }

        let mut pools = self.pools.write().unwrap_or_else(PoisonError::into_inner);
        let pool = pools
            .entry(size)
            .or_insert_with(|| Arc::new(SecureBufferPool::new(size, self.pool_capacity)));
        Arc::clone(pool)
    }

    /// Take a zeroed buffer of exactly `size` bytes.
    pub fn get(&self, size: usize) -> DerivationResult<SecureBytes> {
        self.pool(size).get()
    }

    /// Scrub `buf` and return it to the pool matching its length.
    pub fn put(&self, buf: SecureBytes) {
        if buf.is_empty() {
            return;
        }
        self.pool(buf.len()).put(buf);
    }

    /// Idle buffer count per pool size.
    pub fn stats(&self) -> BTreeMap<usize, usize> {
        let pools = self.pools.read().unwrap_or_else(PoisonError::into_inner);
        pools
            .iter()
            .map(|(size, pool)| (*size, pool.available()))
            .collect()
    }
}

impl Default for SecureAllocator {
    fn default() -> Self {
        Self::new()
    }
}
