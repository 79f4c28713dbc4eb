//! RAII typed handle over a pool block.

use core::fmt;
use core::mem::ManuallyDrop;
use core::ptr::{self, NonNull};

use super::SyncPool;
use super::layout::WORD_SIZE;
use crate::error::{PoolError, PoolResult};

/// A value placed into a pool block, returned to the pool on drop.
///
/// Like `Box`, but backed by a [`SyncPool`] block instead of the heap. The
/// value must fit in one block and must not require more alignment than
/// block placement guarantees (one machine word).
///
/// # Example
/// ```
/// use fixed_pool::{suggested_size, PoolBox, SyncPool};
///
/// #[repr(align(8))]
/// struct Backing([u8; 128]);
///
/// let bytes = suggested_size(16, 4)?;
/// let mut backing = Backing([0; 128]);
/// let pool = SyncPool::initialize(&mut backing.0[..bytes], 16)?;
///
/// let mut boxed = PoolBox::new_in([1usize, 2usize], &pool)?;
/// boxed[0] = 99;
/// assert_eq!(*boxed, [99, 2]);
/// drop(boxed);
/// assert_eq!(pool.count_free(), 4);
/// # Ok::<(), fixed_pool::PoolError>(())
/// ```
pub struct PoolBox<'pool, 'buf, T> {
    ptr: NonNull<T>,
    pool: &'pool SyncPool<'buf>,
}

impl<'pool, 'buf, T> PoolBox<'pool, 'buf, T> {
    /// Moves `value` into a block allocated from `pool`.
    ///
    /// Fails with an invalid-argument error when `T` does not fit a block or
    /// needs more than word alignment, and with [`PoolError::Exhausted`]
    /// when no block is free.
    pub fn new_in(value: T, pool: &'pool SyncPool<'buf>) -> PoolResult<Self> {
        let size = size_of::<T>();
        let align = align_of::<T>();
        let block_size = pool.block_size();
        if size > block_size {
            return Err(PoolError::BlockTooLarge {
                requested: size,
                block_size,
            });
        }
        if align > WORD_SIZE {
            return Err(PoolError::OverAlignedType {
                requested: align,
                available: WORD_SIZE,
            });
        }
        let raw = pool.alloc().ok_or(PoolError::Exhausted {
            block_count: pool.block_count(),
        })?;
        let ptr = raw.cast::<T>();
        // SAFETY: the block spans at least size_of::<T>() bytes and is
        // word-aligned, which suffices for T (both checked above); it is
        // exclusively ours until freed.
        unsafe { ptr.as_ptr().write(value) };
        Ok(Self { ptr, pool })
    }

    /// Consumes the box and returns the value, releasing the block.
    #[must_use]
    pub fn into_inner(self) -> T {
        let this = ManuallyDrop::new(self);
        // SAFETY: ptr holds an initialized T; read moves it out and Drop no
        // longer runs, so the destructor fires exactly once, in the caller.
        let value = unsafe { ptr::read(this.ptr.as_ptr()) };
        // SAFETY: the block came from this pool and is freed exactly once.
        let freed = unsafe { this.pool.free(this.ptr.cast::<u8>()) };
        debug_assert!(freed.is_ok());
        value
    }

    /// Raw pointer to the contained value.
    #[must_use]
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }
}

impl<T> core::ops::Deref for PoolBox<'_, '_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: ptr points at an initialized T owned by this box; the
        // lifetime is tied to &self.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> core::ops::DerefMut for PoolBox<'_, '_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as in Deref, with &mut self for exclusivity.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T> Drop for PoolBox<'_, '_, T> {
    fn drop(&mut self) {
        // SAFETY: ptr holds an initialized T this box exclusively owns; the
        // destructor runs once, then the block returns to its pool.
        unsafe {
            ptr::drop_in_place(self.ptr.as_ptr());
            let freed = self.pool.free(self.ptr.cast::<u8>());
            debug_assert!(freed.is_ok());
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PoolBox<'_, '_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
