//! Error types for pool operations.
//!
//! All failures are surfaced synchronously as return values. Pool exhaustion
//! is deliberately *not* an error: [`FixedPool::alloc`](crate::FixedPool::alloc)
//! reports it by value as `None`, because running out of blocks is an
//! ordinary, recoverable outcome the caller must check. Only the
//! `Result`-shaped typed layer (`PoolBox`, feature `sync`) converts it into
//! [`PoolError::Exhausted`].

use thiserror::Error;

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Pool operation errors.
///
/// Two classes exist: invalid arguments (rejected before any write to the
/// caller's buffer) and misuse of `free` (rejected only when the validated
/// mode is enabled, see [`PoolConfig::validate_frees`](crate::PoolConfig)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PoolError {
    /// The buffer cannot hold the header plus at least one aligned block.
    #[error("buffer too small: {provided} bytes provided, at least {required} required")]
    BufferTooSmall {
        /// Bytes the caller provided.
        provided: usize,
        /// Minimum bytes required for the requested block size.
        required: usize,
    },

    /// The buffer base address is not word-aligned.
    ///
    /// The header and the free-list links are read and written as machine
    /// words, so the image must start on a word boundary.
    #[error("buffer base {addr:#x} is not aligned to {required} bytes")]
    UnalignedBuffer {
        /// The offending base address.
        addr: usize,
        /// Required alignment in bytes.
        required: usize,
    },

    /// The requested geometry does not fit in `usize` arithmetic.
    #[error("pool geometry overflows: {block_count} blocks of {block_size} bytes")]
    SizeOverflow {
        /// Requested (unaligned) block size.
        block_size: usize,
        /// Requested block count.
        block_count: usize,
    },

    /// Every block is in use.
    ///
    /// Produced only by the typed layer; the raw [`alloc`] path signals
    /// exhaustion by returning `None`.
    ///
    /// [`alloc`]: crate::FixedPool::alloc
    #[error("pool exhausted: all {block_count} blocks are in use")]
    Exhausted {
        /// Total blocks in the pool.
        block_count: usize,
    },

    /// A freed pointer does not point into this pool's block region.
    #[error("pointer {addr:#x} does not belong to this pool")]
    ForeignPointer {
        /// The offending address.
        addr: usize,
    },

    /// A freed pointer is inside the pool but not on a block boundary.
    #[error("pointer {addr:#x} is not on a block boundary")]
    MisalignedPointer {
        /// The offending address.
        addr: usize,
    },

    /// A freed block is already on the free list.
    #[error("block at offset {offset} is already free")]
    DoubleFree {
        /// Offset of the block from the pool base.
        offset: usize,
    },

    /// A value does not fit in one block.
    #[error("value of {requested} bytes does not fit a {block_size}-byte block")]
    BlockTooLarge {
        /// Bytes the value requires.
        requested: usize,
        /// Bytes one block provides.
        block_size: usize,
    },

    /// A type's alignment exceeds what block placement guarantees.
    #[error("alignment {requested} exceeds the pool's {available}-byte guarantee")]
    OverAlignedType {
        /// Alignment the type requires.
        requested: usize,
        /// Alignment the pool guarantees.
        available: usize,
    },

    /// An adopted image's free list is malformed.
    #[error("adopted image has a malformed free list at offset {offset:#x}")]
    CorruptImage {
        /// The offset at which traversal failed validation.
        offset: usize,
    },
}

impl PoolError {
    /// True for failures rejected at the API boundary before any buffer write.
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::BufferTooSmall { .. }
                | Self::UnalignedBuffer { .. }
                | Self::SizeOverflow { .. }
                | Self::BlockTooLarge { .. }
                | Self::OverAlignedType { .. }
                | Self::CorruptImage { .. }
        )
    }

    /// True for `free` precondition violations caught by the validated mode.
    #[must_use]
    pub const fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::ForeignPointer { .. } | Self::MisalignedPointer { .. } | Self::DoubleFree { .. }
        )
    }
}
