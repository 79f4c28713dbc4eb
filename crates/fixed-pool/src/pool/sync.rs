//! External-lock concurrency extension.
//!
//! The core pool is single-threaded by construction: `alloc` and `free` take
//! `&mut self`, so exactly one logical owner can mutate a handle. This module
//! is the explicit opt-in for shared use, the *external lock model*: one
//! mutex guarding the whole free-list head, `&self` operations, callers
//! serialized.
//!
//! The alternative lock-free model (compare-and-exchange on a
//! generation-tagged head to dodge the ABA hazard) is mutually exclusive with
//! this one per handle and is intentionally not implemented: a tagged head
//! does not fit the one-word header of the relocatable image. See DESIGN.md.

use core::ptr::NonNull;

use parking_lot::Mutex;

use super::{FixedPool, PoolConfig, PoolStats};
use crate::error::PoolResult;

/// A [`FixedPool`] behind a mutex, usable from several threads.
///
/// Every operation locks, mutates or reads, and unlocks; none of them blocks
/// on anything other than the lock itself. Exhaustion is still reported by
/// value.
///
/// # Example
/// ```
/// use fixed_pool::{suggested_size, SyncPool};
///
/// #[repr(align(8))]
/// struct Backing([u8; 256]);
///
/// let bytes = suggested_size(16, 8)?;
/// let mut backing = Backing([0; 256]);
/// let pool = SyncPool::initialize(&mut backing.0[..bytes], 16)?;
///
/// std::thread::scope(|scope| {
///     for _ in 0..4 {
///         scope.spawn(|| {
///             let block = pool.alloc().expect("a block per thread fits");
///             // SAFETY: the block came from this pool, freed exactly once.
///             unsafe { pool.free(block).unwrap() };
///         });
///     }
/// });
/// assert_eq!(pool.count_free(), 8);
/// # Ok::<(), fixed_pool::PoolError>(())
/// ```
pub struct SyncPool<'buf> {
    inner: Mutex<FixedPool<'buf>>,
}

impl<'buf> SyncPool<'buf> {
    /// Lays a pool out over `buffer` and wraps it in a lock.
    ///
    /// Same contract as [`FixedPool::initialize`].
    pub fn initialize(buffer: &'buf mut [u8], block_size: usize) -> PoolResult<Self> {
        FixedPool::initialize(buffer, block_size).map(Self::from_pool)
    }

    /// [`initialize`](SyncPool::initialize) with an explicit configuration.
    pub fn with_config(
        buffer: &'buf mut [u8],
        block_size: usize,
        config: PoolConfig,
    ) -> PoolResult<Self> {
        FixedPool::with_config(buffer, block_size, config).map(Self::from_pool)
    }

    /// Wraps an existing pool handle in a lock.
    #[must_use]
    pub fn from_pool(pool: FixedPool<'buf>) -> Self {
        Self {
            inner: Mutex::new(pool),
        }
    }

    /// Takes a block out of the pool. `None` when exhausted. O(1) plus the
    /// lock.
    pub fn alloc(&self) -> Option<NonNull<u8>> {
        self.inner.lock().alloc()
    }

    /// Returns a block to the pool.
    ///
    /// # Safety
    ///
    /// Same contract as [`FixedPool::free`]: the pointer must come from
    /// [`alloc`](SyncPool::alloc) on this pool and must not already be free.
    pub unsafe fn free(&self, ptr: NonNull<u8>) -> PoolResult<()> {
        // SAFETY: forwarded contract.
        unsafe { self.inner.lock().free(ptr) }
    }

    /// Counts the free blocks. O(block count).
    pub fn count_free(&self) -> usize {
        self.inner.lock().count_free()
    }

    /// Aligned size of each block in bytes.
    pub fn block_size(&self) -> usize {
        self.inner.lock().block_size()
    }

    /// Total number of blocks.
    pub fn block_count(&self) -> usize {
        self.inner.lock().block_count()
    }

    /// Usable capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// True when no free block remains.
    pub fn is_exhausted(&self) -> bool {
        self.inner.lock().is_exhausted()
    }

    /// Counter snapshot, if tracking is enabled.
    pub fn stats(&self) -> Option<PoolStats> {
        self.inner.lock().stats()
    }

    /// Runs `body` with the lock held, for compound operations that must not
    /// interleave with other callers.
    pub fn with<R>(&self, body: impl FnOnce(&mut FixedPool<'buf>) -> R) -> R {
        body(&mut self.inner.lock())
    }

    /// Unwraps the lock, returning the single-threaded handle.
    #[must_use]
    pub fn into_inner(self) -> FixedPool<'buf> {
        self.inner.into_inner()
    }
}

impl core::fmt::Debug for SyncPool<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SyncPool")
            .field("inner", &self.inner)
            .finish()
    }
}
