//! Pool statistics.

/// Snapshot of a pool's counters and geometry.
///
/// Counters live in the handle, never in the pool image, so the byte image
/// keeps the exact documented layout. Returned by
/// [`FixedPool::stats`](crate::FixedPool::stats) when tracking is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Successful allocations over the handle's lifetime.
    pub total_allocs: u64,
    /// Successful frees over the handle's lifetime.
    pub total_frees: u64,
    /// Allocations that found the free list empty.
    pub failed_allocs: u64,
    /// Frees rejected by the validated mode.
    pub rejected_frees: u64,
    /// Most blocks simultaneously in use.
    pub peak_used: usize,
    /// Blocks currently in use.
    pub used_blocks: usize,
    /// Blocks currently free.
    pub free_blocks: usize,
    /// Aligned size of each block in bytes.
    pub block_size: usize,
    /// Total number of blocks.
    pub block_count: usize,
}

/// Handle-local counters backing [`PoolStats`].
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Counters {
    pub(crate) total_allocs: u64,
    pub(crate) total_frees: u64,
    pub(crate) failed_allocs: u64,
    pub(crate) rejected_frees: u64,
    pub(crate) peak_used: usize,
}
