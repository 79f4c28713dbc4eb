//! Fixed-size pool allocator.
//!
//! O(1) allocation and deallocation of equal-sized blocks carved out of a
//! caller-supplied buffer, with the free list threaded through the free
//! blocks themselves.
//!
//! ## Modules
//! - `layout` - image layout, word constants and the size calculator
//! - `allocator` - the `FixedPool` core
//! - `config` - configuration variants (production, debug, hardened)
//! - `stats` - statistics types
//! - `sync` - external-lock wrapper for shared use (feature `sync`)
//! - `pool_box` - RAII typed handle over a block (feature `sync`)

pub mod allocator;
pub mod config;
pub mod layout;
#[cfg(feature = "sync")]
pub mod pool_box;
pub mod stats;
#[cfg(feature = "sync")]
pub mod sync;

pub use allocator::FixedPool;
pub use config::PoolConfig;
pub use layout::{HEADER_SIZE, WORD_SIZE, align_block_size, suggested_size};
#[cfg(feature = "sync")]
pub use pool_box::PoolBox;
pub use stats::PoolStats;
#[cfg(feature = "sync")]
pub use sync::SyncPool;
