//! The pool allocator.
//!
//! # Safety
//!
//! This module manages a caller-supplied byte buffer through raw pointers:
//! - The handle exclusively borrows the buffer for its whole lifetime; all
//!   raw accesses derive from that borrow.
//! - Free blocks store the offset of the next free block in their first word
//!   (intrusive list); allocated blocks are never touched until freed.
//! - Every offset on the free list names a block start inside the managed
//!   region (`HEADER_SIZE + k * block_size`, `k < block_count`), so offset
//!   arithmetic stays inside the allocation.
//! - Word reads/writes are aligned: the buffer base is word-aligned
//!   (validated) and block offsets are word multiples by construction.

use core::fmt;
use core::marker::PhantomData;
use core::ptr::{self, NonNull};

use super::layout::{FREE_LIST_END, HEADER_SIZE, Header, WORD_SIZE, align_block_size};
use super::{PoolConfig, PoolStats};
use crate::error::{PoolError, PoolResult};
use crate::pool::stats::Counters;
use crate::utils::is_aligned;

/// Fixed-size block allocator over a caller-supplied buffer.
///
/// Carves the buffer into `[Header][Block_0]..[Block_{N-1}]` and serves
/// allocation and deallocation in O(1) from a free list threaded through the
/// unused blocks themselves. The allocator owns no memory: the caller's
/// buffer is exclusively borrowed for the handle's lifetime and never grows,
/// shrinks or moves.
///
/// Allocation and deallocation take `&mut self`: exactly one logical owner
/// mutates the free list at a time, enforced at compile time. For shared
/// use behind a lock see `SyncPool` (feature `sync`).
///
/// # Example
/// ```
/// use fixed_pool::{suggested_size, FixedPool};
///
/// #[repr(align(8))]
/// struct Backing([u8; 256]);
///
/// let bytes = suggested_size(24, 4)?;
/// let mut backing = Backing([0; 256]);
/// let mut pool = FixedPool::initialize(&mut backing.0[..bytes], 24)?;
///
/// assert_eq!(pool.count_free(), 4);
/// let block = pool.alloc().expect("pool has free blocks");
/// assert_eq!(pool.count_free(), 3);
/// // SAFETY: `block` came from this pool and is freed exactly once.
/// unsafe { pool.free(block)? };
/// assert_eq!(pool.count_free(), 4);
/// # Ok::<(), fixed_pool::PoolError>(())
/// ```
pub struct FixedPool<'buf> {
    /// Base address of the pool image (the header lives here).
    base: NonNull<u8>,
    /// Bytes under management: header plus all whole blocks. Trailing bytes
    /// of the buffer that do not fit a block are ignored.
    managed_len: usize,
    /// Aligned size of each block.
    block_size: usize,
    /// Total number of blocks.
    block_count: usize,
    /// Blocks currently handed out.
    in_use: usize,
    config: PoolConfig,
    counters: Counters,
    _buffer: PhantomData<&'buf mut [u8]>,
}

// SAFETY: the handle exclusively borrows the caller's buffer for 'buf and all
// remaining state is owned plain data; sending the handle moves the only path
// to that memory.
unsafe impl Send for FixedPool<'_> {}

// SAFETY: `&FixedPool` exposes only reads of the image (count_free and
// introspection); every image mutation requires `&mut self`.
unsafe impl Sync for FixedPool<'_> {}

/// Validated pool geometry derived from a buffer and a requested block size.
struct Geometry {
    block_size: usize,
    block_count: usize,
    managed_len: usize,
}

impl Geometry {
    fn for_buffer(buffer: &[u8], block_size: usize) -> PoolResult<Self> {
        let addr = buffer.as_ptr() as usize;
        if !is_aligned(addr, WORD_SIZE) {
            return Err(PoolError::UnalignedBuffer {
                addr,
                required: WORD_SIZE,
            });
        }
        if block_size > buffer.len() {
            return Err(PoolError::BufferTooSmall {
                provided: buffer.len(),
                required: HEADER_SIZE.saturating_add(block_size),
            });
        }
        // block_size is bounded by the slice length here, so the round-up
        // cannot overflow.
        let block_size = align_block_size(block_size);
        let required = HEADER_SIZE + block_size;
        if buffer.len() < required {
            return Err(PoolError::BufferTooSmall {
                provided: buffer.len(),
                required,
            });
        }
        let block_count = (buffer.len() - HEADER_SIZE) / block_size;
        Ok(Self {
            block_size,
            block_count,
            managed_len: HEADER_SIZE + block_count * block_size,
        })
    }
}

impl<'buf> FixedPool<'buf> {
    /// Lays a pool out over `buffer` with the default [`PoolConfig`].
    ///
    /// The buffer must be word-aligned and large enough for the header plus
    /// at least one aligned block ([`suggested_size`](crate::suggested_size)
    /// computes the exact byte count for a desired block count). Violations
    /// are rejected before any write to the buffer. Trailing bytes that do
    /// not fit a whole block are ignored.
    ///
    /// O(block count): threads the free list through the blocks.
    pub fn initialize(buffer: &'buf mut [u8], block_size: usize) -> PoolResult<Self> {
        Self::with_config(buffer, block_size, PoolConfig::default())
    }

    /// Lays a pool out over `buffer` with an explicit configuration.
    pub fn with_config(
        buffer: &'buf mut [u8],
        block_size: usize,
        config: PoolConfig,
    ) -> PoolResult<Self> {
        let geometry = Geometry::for_buffer(buffer, block_size)?;
        if let Some(pattern) = config.free_pattern {
            buffer[HEADER_SIZE..geometry.managed_len].fill(pattern);
        }
        let mut pool = Self::from_parts(buffer, geometry, config);
        pool.thread_free_list();
        #[cfg(feature = "logging")]
        tracing::trace!(
            block_size = pool.block_size,
            block_count = pool.block_count,
            "pool initialized"
        );
        Ok(pool)
    }

    /// Re-attaches a handle to an already-initialized pool image.
    ///
    /// The image is position-independent (links are offsets, not addresses),
    /// so a memcpy'd, remapped or shared-memory copy of a pool stays valid.
    /// Geometry is validated and the image's free list is walked once,
    /// checking every traversed offset, to rebuild handle-local accounting;
    /// malformed images are rejected with [`PoolError::CorruptImage`].
    ///
    /// # Safety
    ///
    /// `buffer` must hold an image produced by [`initialize`] (possibly
    /// copied or remapped since) for this same `block_size`, with no other
    /// handle mutating it; block contents are trusted.
    ///
    /// [`initialize`]: FixedPool::initialize
    pub unsafe fn adopt(buffer: &'buf mut [u8], block_size: usize) -> PoolResult<Self> {
        // SAFETY: forwarded contract.
        unsafe { Self::adopt_with_config(buffer, block_size, PoolConfig::default()) }
    }

    /// [`adopt`](FixedPool::adopt) with an explicit configuration.
    ///
    /// # Safety
    ///
    /// Same contract as [`adopt`](FixedPool::adopt).
    pub unsafe fn adopt_with_config(
        buffer: &'buf mut [u8],
        block_size: usize,
        config: PoolConfig,
    ) -> PoolResult<Self> {
        let geometry = Geometry::for_buffer(buffer, block_size)?;
        let mut pool = Self::from_parts(buffer, geometry, config);
        let mut free = 0usize;
        let mut cursor = pool.free_head();
        while cursor != FREE_LIST_END {
            if free == pool.block_count || !pool.is_block_offset(cursor) {
                return Err(PoolError::CorruptImage { offset: cursor });
            }
            // SAFETY: cursor was range- and boundary-checked just above.
            cursor = unsafe { pool.next_of(cursor) };
            free += 1;
        }
        pool.in_use = pool.block_count - free;
        #[cfg(feature = "logging")]
        tracing::trace!(
            block_count = pool.block_count,
            free_blocks = free,
            "pool image adopted"
        );
        Ok(pool)
    }

    fn from_parts(buffer: &'buf mut [u8], geometry: Geometry, config: PoolConfig) -> Self {
        Self {
            base: NonNull::from(buffer).cast::<u8>(),
            managed_len: geometry.managed_len,
            block_size: geometry.block_size,
            block_count: geometry.block_count,
            in_use: 0,
            config,
            counters: Counters::default(),
            _buffer: PhantomData,
        }
    }

    /// Takes a block out of the pool.
    ///
    /// Returns `None` when every block is in use; exhaustion is an ordinary
    /// outcome signaled by value, never an error. O(1).
    ///
    /// The returned block is word-aligned, spans
    /// [`block_size`](FixedPool::block_size) bytes and belongs exclusively to
    /// the caller until passed back to [`free`](FixedPool::free). Its
    /// contents are whatever the last use left behind; never assume zeroed
    /// memory (with [`PoolConfig::alloc_pattern`] set, it is filled with that
    /// pattern instead).
    pub fn alloc(&mut self) -> Option<NonNull<u8>> {
        let head = self.free_head();
        if head == FREE_LIST_END {
            if self.config.track_stats {
                self.counters.failed_allocs += 1;
            }
            return None;
        }
        // SAFETY: head came off the free list, which holds only valid block
        // offsets.
        let next = unsafe { self.next_of(head) };
        self.set_free_head(next);
        self.in_use += 1;
        if self.config.track_stats {
            self.counters.total_allocs += 1;
            if self.in_use > self.counters.peak_used {
                self.counters.peak_used = self.in_use;
            }
        }
        // SAFETY: same free-list invariant.
        let block = unsafe { self.block_ptr(head) };
        if let Some(pattern) = self.config.alloc_pattern {
            // SAFETY: the block spans block_size bytes and is now owned by
            // the caller.
            unsafe { ptr::write_bytes(block.as_ptr(), pattern, self.block_size) };
        }
        Some(block)
    }

    /// Returns a block to the pool, making it the new free-list head.
    ///
    /// O(1) in the default mode. With [`PoolConfig::validate_frees`] enabled
    /// the pointer is checked first (range, block boundary, not already
    /// free; the double-free sweep costs O(free blocks)) and misuse is
    /// rejected with a [`PoolError`] before any list mutation.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`alloc`](FixedPool::alloc) on this
    /// same pool and must not have been freed since. With `validate_frees`
    /// enabled, violations are caught and reported; without it they are
    /// undefined behavior: the zero-overhead contract leaves pointer
    /// discipline to the caller.
    pub unsafe fn free(&mut self, ptr: NonNull<u8>) -> PoolResult<()> {
        let offset = if self.config.validate_frees {
            match self.validate_block_ptr(ptr) {
                Ok(offset) => offset,
                Err(err) => {
                    if self.config.track_stats {
                        self.counters.rejected_frees += 1;
                    }
                    #[cfg(feature = "logging")]
                    tracing::warn!(error = %err, "free rejected");
                    return Err(err);
                }
            }
        } else {
            (ptr.as_ptr() as usize).wrapping_sub(self.base.as_ptr() as usize)
        };
        if let Some(pattern) = self.config.free_pattern {
            // SAFETY: the caller owns the block until this call completes;
            // it spans block_size bytes.
            unsafe { ptr::write_bytes(ptr.as_ptr(), pattern, self.block_size) };
        }
        let head = self.free_head();
        // SAFETY: offset names the caller's block (validated above, or per
        // the contract).
        unsafe { self.set_next(offset, head) };
        self.set_free_head(offset);
        self.in_use = self.in_use.saturating_sub(1);
        if self.config.track_stats {
            self.counters.total_frees += 1;
        }
        Ok(())
    }

    /// Counts the free blocks by walking the list to the end sentinel.
    ///
    /// O(block count) time, O(1) space; introspection and testing, not a hot
    /// path. Traversal is bounded by the block count as a corruption
    /// backstop.
    pub fn count_free(&self) -> usize {
        let mut count = 0;
        let mut cursor = self.free_head();
        while cursor != FREE_LIST_END && count < self.block_count {
            // SAFETY: offsets on the free list name valid blocks inside the
            // managed region.
            cursor = unsafe { self.next_of(cursor) };
            count += 1;
        }
        debug_assert_eq!(cursor, FREE_LIST_END, "free list exceeds block count");
        count
    }

    /// Rethreads the free list as if the pool were freshly initialized.
    ///
    /// # Safety
    ///
    /// No block from this pool may still be in use; every outstanding
    /// pointer dangles after the reset.
    pub unsafe fn reset(&mut self) {
        if let Some(pattern) = self.config.free_pattern {
            // SAFETY: per the contract above every block is back under the
            // pool's control; the region spans the managed blocks exactly.
            unsafe {
                ptr::write_bytes(
                    self.base.as_ptr().add(HEADER_SIZE),
                    pattern,
                    self.managed_len - HEADER_SIZE,
                );
            }
        }
        self.thread_free_list();
    }

    /// Aligned size of each block in bytes.
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Total number of blocks.
    #[must_use]
    pub const fn block_count(&self) -> usize {
        self.block_count
    }

    /// Usable capacity in bytes (blocks only, header excluded).
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.block_size * self.block_count
    }

    /// Blocks currently handed out.
    #[must_use]
    pub const fn used_blocks(&self) -> usize {
        self.in_use
    }

    /// True when no free block remains. O(1).
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.free_head() == FREE_LIST_END
    }

    /// True when every block is free. O(1).
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.in_use == 0
    }

    /// Whether `ptr` points into this pool's block region.
    #[must_use]
    pub fn contains(&self, ptr: *const u8) -> bool {
        let addr = ptr as usize;
        let base = self.base.as_ptr() as usize;
        addr >= base + HEADER_SIZE && addr < base + self.managed_len
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Counter snapshot, if [`PoolConfig::track_stats`] is enabled.
    #[must_use]
    pub fn stats(&self) -> Option<PoolStats> {
        if !self.config.track_stats {
            return None;
        }
        Some(PoolStats {
            total_allocs: self.counters.total_allocs,
            total_frees: self.counters.total_frees,
            failed_allocs: self.counters.failed_allocs,
            rejected_frees: self.counters.rejected_frees,
            peak_used: self.counters.peak_used,
            used_blocks: self.in_use,
            free_blocks: self.block_count - self.in_use,
            block_size: self.block_size,
            block_count: self.block_count,
        })
    }

    /// Links every block to its successor and points the header at the first.
    fn thread_free_list(&mut self) {
        let mut offset = HEADER_SIZE;
        for index in 0..self.block_count {
            let next = if index + 1 == self.block_count {
                FREE_LIST_END
            } else {
                offset + self.block_size
            };
            // SAFETY: offset walks exactly the block starts of the managed
            // region.
            unsafe { self.set_next(offset, next) };
            offset += self.block_size;
        }
        self.set_free_head(HEADER_SIZE);
        self.in_use = 0;
    }

    /// Checks a pointer against the pool before a validated free.
    fn validate_block_ptr(&self, ptr: NonNull<u8>) -> PoolResult<usize> {
        let addr = ptr.as_ptr() as usize;
        let base = self.base.as_ptr() as usize;
        if addr < base + HEADER_SIZE || addr >= base + self.managed_len {
            return Err(PoolError::ForeignPointer { addr });
        }
        let offset = addr - base;
        if (offset - HEADER_SIZE) % self.block_size != 0 {
            return Err(PoolError::MisalignedPointer { addr });
        }
        let mut cursor = self.free_head();
        let mut steps = 0;
        while cursor != FREE_LIST_END && steps < self.block_count {
            if cursor == offset {
                return Err(PoolError::DoubleFree { offset });
            }
            // SAFETY: free-list offsets name valid blocks.
            cursor = unsafe { self.next_of(cursor) };
            steps += 1;
        }
        Ok(offset)
    }

    fn is_block_offset(&self, offset: usize) -> bool {
        offset >= HEADER_SIZE
            && offset < self.managed_len
            && (offset - HEADER_SIZE) % self.block_size == 0
    }

    fn header(&self) -> *mut Header {
        self.base.as_ptr().cast::<Header>()
    }

    fn free_head(&self) -> usize {
        // SAFETY: the header occupies the first word of the borrowed buffer
        // and the base is word-aligned.
        unsafe { (*self.header()).free_head }
    }

    fn set_free_head(&mut self, offset: usize) {
        // SAFETY: as in free_head, plus &mut self for exclusive access.
        unsafe { (*self.header()).free_head = offset };
    }

    /// Reads the next-link stored in the first word of a free block.
    ///
    /// # Safety
    ///
    /// `offset` must name a block start inside the managed region.
    unsafe fn next_of(&self, offset: usize) -> usize {
        debug_assert!(self.is_block_offset(offset));
        // SAFETY: per the caller's contract the word lies inside the managed
        // region, on a word boundary.
        unsafe { self.base.as_ptr().add(offset).cast::<usize>().read() }
    }

    /// Writes the next-link into the first word of a free block.
    ///
    /// # Safety
    ///
    /// `offset` must name a block start inside the managed region, and the
    /// block must be under the pool's control (free or mid-transition).
    unsafe fn set_next(&mut self, offset: usize, next: usize) {
        debug_assert!(self.is_block_offset(offset));
        // SAFETY: as in next_of, plus &mut self for exclusive access.
        unsafe { self.base.as_ptr().add(offset).cast::<usize>().write(next) };
    }

    /// Materializes a block pointer from its offset.
    ///
    /// # Safety
    ///
    /// `offset` must name a block start inside the managed region.
    unsafe fn block_ptr(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(self.is_block_offset(offset));
        // SAFETY: the offset stays inside the borrowed allocation, so the
        // add cannot leave it and the result is non-null.
        unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset)) }
    }
}

impl fmt::Debug for FixedPool<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedPool")
            .field("block_size", &self.block_size)
            .field("block_count", &self.block_count)
            .field("used_blocks", &self.in_use)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::layout::suggested_size;

    #[repr(align(8))]
    struct Backing<const N: usize>([u8; N]);

    impl<const N: usize> Backing<N> {
        fn new() -> Self {
            Self([0; N])
        }
    }

    #[test]
    fn initialize_rejects_a_buffer_without_room_for_one_block() {
        let mut backing = Backing::<8>::new();
        let err = FixedPool::initialize(&mut backing.0, 8).unwrap_err();
        assert!(matches!(err, PoolError::BufferTooSmall { .. }));
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn initialize_rejects_an_unaligned_base() {
        let mut backing = Backing::<96>::new();
        let err = FixedPool::initialize(&mut backing.0[1..89], 8).unwrap_err();
        assert!(matches!(err, PoolError::UnalignedBuffer { .. }));
    }

    #[test]
    fn initialize_rejects_before_writing() {
        let mut backing = Backing::<8>::new();
        backing.0 = [0xAB; 8];
        let _ = FixedPool::initialize(&mut backing.0, 64).unwrap_err();
        assert_eq!(backing.0, [0xAB; 8]);
    }

    #[test]
    fn whole_pool_drains_and_refills() {
        let bytes = suggested_size(16, 4).unwrap();
        let mut backing = Backing::<128>::new();
        let mut pool =
            FixedPool::with_config(&mut backing.0[..bytes], 16, PoolConfig::debug()).unwrap();

        assert_eq!(pool.count_free(), 4);
        let blocks: Vec<_> = core::iter::from_fn(|| pool.alloc()).collect();
        assert_eq!(blocks.len(), 4);
        assert!(pool.is_exhausted());
        assert_eq!(pool.count_free(), 0);

        for block in blocks {
            // SAFETY: each block came from this pool, freed exactly once.
            unsafe { pool.free(block).unwrap() };
        }
        assert_eq!(pool.count_free(), 4);
        assert!(pool.is_idle());
    }

    #[test]
    fn alloc_pattern_fills_handed_out_blocks() {
        let bytes = suggested_size(8, 2).unwrap();
        let config = PoolConfig {
            alloc_pattern: Some(0x5A),
            ..PoolConfig::production()
        };
        let mut backing = Backing::<64>::new();
        let mut pool = FixedPool::with_config(&mut backing.0[..bytes], 8, config).unwrap();

        let block = pool.alloc().unwrap();
        // SAFETY: the block is ours and spans block_size bytes.
        let seen = unsafe { core::slice::from_raw_parts(block.as_ptr(), pool.block_size()) };
        assert!(seen.iter().all(|&byte| byte == 0x5A));
    }

    #[test]
    fn stats_follow_the_traffic() {
        let bytes = suggested_size(8, 2).unwrap();
        let mut backing = Backing::<64>::new();
        let mut pool =
            FixedPool::with_config(&mut backing.0[..bytes], 8, PoolConfig::debug()).unwrap();

        let a = pool.alloc().unwrap();
        let b = pool.alloc().unwrap();
        assert!(pool.alloc().is_none());
        // SAFETY: both blocks came from this pool.
        unsafe {
            pool.free(a).unwrap();
            pool.free(b).unwrap();
        }

        let stats = pool.stats().unwrap();
        assert_eq!(stats.total_allocs, 2);
        assert_eq!(stats.total_frees, 2);
        assert_eq!(stats.failed_allocs, 1);
        assert_eq!(stats.peak_used, 2);
        assert_eq!(stats.used_blocks, 0);
        assert_eq!(stats.free_blocks, 2);
    }

    #[test]
    fn reset_restores_a_drained_pool() {
        let bytes = suggested_size(8, 3).unwrap();
        let mut backing = Backing::<64>::new();
        let mut pool = FixedPool::initialize(&mut backing.0[..bytes], 8).unwrap();

        while pool.alloc().is_some() {}
        assert!(pool.is_exhausted());
        // SAFETY: the drained blocks are abandoned, no pointer outlives this.
        unsafe { pool.reset() };
        assert_eq!(pool.count_free(), 3);
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        // 7 spare bytes beyond the last whole block.
        let bytes = suggested_size(8, 3).unwrap() + 7;
        let mut backing = Backing::<64>::new();
        let pool = FixedPool::initialize(&mut backing.0[..bytes], 8).unwrap();
        assert_eq!(pool.block_count(), 3);
        assert_eq!(pool.count_free(), 3);
    }
}
