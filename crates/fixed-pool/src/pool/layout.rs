//! Pool image layout: header record, word constants and the size calculator.
//!
//! The byte image is `[Header][Block_0]..[Block_{N-1}]`. The header is a
//! single machine word holding the offset of the first free block; offset `0`
//! is the empty sentinel (it names the header's own location, which can never
//! be a block). Because every link is an offset from the image base rather
//! than an address, the image is position-independent: it can be memcpy'd,
//! remapped or placed in shared memory and stays valid.

use crate::error::{PoolError, PoolResult};
use crate::utils::align_up;

/// Machine word size in bytes.
///
/// The smallest possible block: a free block must have room for the offset of
/// the next free block, and word multiples preserve natural alignment for
/// typical payloads.
pub const WORD_SIZE: usize = core::mem::size_of::<usize>();

/// Control record at offset 0 of the pool image.
#[repr(transparent)]
pub(crate) struct Header {
    /// Offset of the first free block, or [`FREE_LIST_END`].
    pub(crate) free_head: usize,
}

/// Size of the [`Header`] record in bytes; blocks start at this offset.
pub const HEADER_SIZE: usize = core::mem::size_of::<Header>();

/// Free-list terminator and empty-list sentinel.
pub(crate) const FREE_LIST_END: usize = 0;

/// Rounds a requested block size up to a usable one.
///
/// Sizes below one word become exactly one word; word multiples pass through
/// unchanged; everything else rounds up to the next word multiple.
///
/// # Examples
/// ```
/// use fixed_pool::{align_block_size, WORD_SIZE};
///
/// assert_eq!(align_block_size(1), WORD_SIZE);
/// assert_eq!(align_block_size(WORD_SIZE), WORD_SIZE);
/// assert_eq!(align_block_size(WORD_SIZE + 1), 2 * WORD_SIZE);
/// ```
#[inline]
#[must_use]
pub const fn align_block_size(block_size: usize) -> usize {
    if block_size <= WORD_SIZE {
        WORD_SIZE
    } else {
        align_up(block_size, WORD_SIZE)
    }
}

/// Exact byte count a caller must provide to hold `block_count` blocks of
/// `block_size` bytes: `HEADER_SIZE + block_count * align_block_size(block_size)`.
///
/// Pure, O(1). Geometry that overflows `usize` is rejected as
/// [`PoolError::SizeOverflow`] instead of wrapping.
///
/// # Examples
/// ```
/// use fixed_pool::{align_block_size, suggested_size, HEADER_SIZE};
///
/// let bytes = suggested_size(8, 10).unwrap();
/// assert_eq!(bytes, HEADER_SIZE + 10 * align_block_size(8));
/// ```
pub fn suggested_size(block_size: usize, block_count: usize) -> PoolResult<usize> {
    let overflow = PoolError::SizeOverflow {
        block_size,
        block_count,
    };
    if block_size > usize::MAX - (WORD_SIZE - 1) {
        return Err(overflow);
    }
    align_block_size(block_size)
        .checked_mul(block_count)
        .and_then(|blocks| blocks.checked_add(HEADER_SIZE))
        .ok_or(overflow)
}
