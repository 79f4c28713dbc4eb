//! Fixed-size block allocator over caller-supplied memory.
//!
//! This crate carves a contiguous byte buffer, owned and provided by the
//! caller, into equal word-aligned blocks and serves allocation and
//! deallocation in O(1) without ever touching a general-purpose heap. It is
//! built for environments where heap allocation is undesirable or forbidden
//! (embedded targets, real-time paths, shared or mapped memory) and where
//! allocation sizes are uniform and known ahead of time.
//!
//! # Layout
//!
//! ```text
//! [Header][Block_0][Block_1]...[Block_{N-1}]
//!     │       │
//!     │       └── while free: first word = offset of the next free block
//!     └── one word: offset of the first free block, 0 = empty
//! ```
//!
//! Links are byte offsets from the buffer base, never addresses, so the
//! whole image is position-independent: it can be copied, remapped or shared
//! between processes and stays valid
//! ([`FixedPool::adopt`] re-attaches a handle to such an image).
//!
//! # Features
//!
//! - `std` (default): standard library support
//! - `sync`: `SyncPool` and `PoolBox` for shared use behind a lock
//! - `logging`: `tracing` events on initialization and rejected frees
//!
//! # Example
//!
//! ```
//! use fixed_pool::{suggested_size, FixedPool};
//!
//! #[repr(align(8))]
//! struct Backing([u8; 128]);
//!
//! let bytes = suggested_size(32, 3)?;
//! let mut backing = Backing([0; 128]);
//! let mut pool = FixedPool::initialize(&mut backing.0[..bytes], 32)?;
//!
//! let block = pool.alloc().expect("3 blocks free");
//! // ... use the block ...
//! // SAFETY: the block came from this pool and is freed exactly once.
//! unsafe { pool.free(block)? };
//! # Ok::<(), fixed_pool::PoolError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

pub mod error;
pub mod pool;
pub mod utils;

pub use error::{PoolError, PoolResult};
#[cfg(feature = "sync")]
pub use pool::{PoolBox, SyncPool};
pub use pool::{
    FixedPool, HEADER_SIZE, PoolConfig, PoolStats, WORD_SIZE, align_block_size, suggested_size,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
