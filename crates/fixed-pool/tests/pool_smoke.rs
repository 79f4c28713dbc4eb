//! End-to-end tests over the public API.

use fixed_pool::{FixedPool, HEADER_SIZE, PoolConfig, align_block_size, suggested_size};

#[repr(align(8))]
struct Backing<const N: usize>([u8; N]);

impl<const N: usize> Backing<N> {
    fn new() -> Self {
        Self([0; N])
    }
}

#[test]
fn scenario_eight_byte_blocks() {
    let (block_size, block_count) = (8, 10);
    let bytes = suggested_size(block_size, block_count).unwrap();
    assert_eq!(bytes, HEADER_SIZE + block_count * align_block_size(block_size));
    #[cfg(target_pointer_width = "64")]
    assert_eq!(bytes, 88);

    let mut backing = Backing::<128>::new();
    let mut pool = FixedPool::initialize(&mut backing.0[..bytes], block_size).unwrap();
    assert_eq!(pool.count_free(), 10);

    let block = pool.alloc().unwrap();
    // SAFETY: the block is ours and holds at least one word.
    unsafe {
        block.cast::<i32>().as_ptr().write(5);
        assert_eq!(block.cast::<i32>().as_ptr().read(), 5);
    }
    assert_eq!(pool.count_free(), 9);

    // SAFETY: the block came from this pool, freed exactly once.
    unsafe { pool.free(block).unwrap() };
    assert_eq!(pool.count_free(), 10);
}

#[test]
fn scenario_sixteen_byte_blocks() {
    let (block_size, block_count) = (16, 5);
    let bytes = suggested_size(block_size, block_count).unwrap();
    #[cfg(target_pointer_width = "64")]
    assert_eq!(bytes, 88);

    let mut backing = Backing::<128>::new();
    let mut pool = FixedPool::initialize(&mut backing.0[..bytes], block_size).unwrap();
    assert_eq!(pool.count_free(), 5);

    let block = pool.alloc().unwrap();
    // SAFETY: the block is ours and holds at least one i32.
    unsafe {
        block.cast::<i32>().as_ptr().write(999);
        assert_eq!(block.cast::<i32>().as_ptr().read(), 999);
    }
    assert_eq!(pool.count_free(), 4);

    // SAFETY: the block came from this pool, freed exactly once.
    unsafe { pool.free(block).unwrap() };
    assert_eq!(pool.count_free(), 5);
}

#[test]
fn the_extra_alloc_reports_exhaustion_by_value() {
    let block_count = 6;
    let bytes = suggested_size(8, block_count).unwrap();
    let mut backing = Backing::<128>::new();
    let mut pool = FixedPool::initialize(&mut backing.0[..bytes], 8).unwrap();

    for _ in 0..block_count {
        assert!(pool.alloc().is_some());
    }
    assert!(pool.alloc().is_none());
    assert!(pool.is_exhausted());
}

#[test]
fn blocks_do_not_overlap_and_hold_their_data() {
    let block_size = 16;
    let block_count = 8;
    let bytes = suggested_size(block_size, block_count).unwrap();
    let mut backing = Backing::<256>::new();
    let mut pool = FixedPool::initialize(&mut backing.0[..bytes], block_size).unwrap();

    let blocks: Vec<_> = (0..block_count).map(|_| pool.alloc().unwrap()).collect();
    for (index, block) in blocks.iter().enumerate() {
        // SAFETY: each block is ours and spans block_size bytes.
        unsafe {
            std::ptr::write_bytes(block.as_ptr(), index as u8, pool.block_size());
        }
    }
    for (index, block) in blocks.iter().enumerate() {
        // SAFETY: as above; the block is still allocated.
        let seen = unsafe { std::slice::from_raw_parts(block.as_ptr(), pool.block_size()) };
        assert!(seen.iter().all(|&byte| byte == index as u8));
    }
    for block in blocks {
        // SAFETY: freed exactly once.
        unsafe { pool.free(block).unwrap() };
    }
    assert_eq!(pool.count_free(), block_count);
}

#[test]
fn a_freed_block_is_reused_first() {
    let bytes = suggested_size(8, 4).unwrap();
    let mut backing = Backing::<64>::new();
    let mut pool = FixedPool::initialize(&mut backing.0[..bytes], 8).unwrap();

    let first = pool.alloc().unwrap();
    let addr = first.as_ptr() as usize;
    // SAFETY: freed exactly once, then reallocated.
    unsafe { pool.free(first).unwrap() };

    let second = pool.alloc().unwrap();
    assert_eq!(second.as_ptr() as usize, addr, "free list is LIFO");
}

#[test]
fn alloc_returns_block_aligned_pointers() {
    let bytes = suggested_size(24, 5).unwrap();
    let mut backing = Backing::<256>::new();
    let base = backing.0.as_ptr() as usize;
    let mut pool = FixedPool::initialize(&mut backing.0[..bytes], 24).unwrap();

    while let Some(block) = pool.alloc() {
        let offset = block.as_ptr() as usize - base;
        assert_eq!((offset - HEADER_SIZE) % pool.block_size(), 0);
        assert!(pool.contains(block.as_ptr()));
    }
}

#[test]
fn a_copied_image_stays_valid() {
    let block_size = 16;
    let block_count = 6;
    let bytes = suggested_size(block_size, block_count).unwrap();

    let mut original = Backing::<128>::new();
    let free_before = {
        let mut pool = FixedPool::initialize(&mut original.0[..bytes], block_size).unwrap();
        let held = pool.alloc().unwrap();
        // SAFETY: the block is ours; write a marker the copy must preserve.
        unsafe { held.cast::<u32>().as_ptr().write(0xDEAD_BEEF) };
        pool.count_free()
    };
    assert_eq!(free_before, block_count - 1);

    // Relocate the image byte-for-byte to a different base address.
    let mut copy = Backing::<128>::new();
    copy.0[..bytes].copy_from_slice(&original.0[..bytes]);

    // SAFETY: the copy holds an image initialized above with this geometry.
    let mut adopted = unsafe { FixedPool::adopt(&mut copy.0[..bytes], block_size) }.unwrap();
    assert_eq!(adopted.count_free(), free_before);
    assert_eq!(adopted.used_blocks(), 1);

    // The adopted pool serves the remaining blocks.
    let mut drained = 0;
    while adopted.alloc().is_some() {
        drained += 1;
    }
    assert_eq!(drained, free_before);
}

#[test]
fn adopt_rejects_a_torn_image() {
    let bytes = suggested_size(8, 4).unwrap();
    let mut backing = Backing::<64>::new();
    {
        let _pool = FixedPool::initialize(&mut backing.0[..bytes], 8).unwrap();
    }
    // Corrupt the header: point the head past the managed region.
    backing.0[..HEADER_SIZE].copy_from_slice(&usize::MAX.to_ne_bytes()[..HEADER_SIZE]);

    // SAFETY: geometry matches; the image is deliberately malformed.
    let err = unsafe { FixedPool::adopt(&mut backing.0[..bytes], 8) }.unwrap_err();
    assert!(matches!(err, fixed_pool::PoolError::CorruptImage { .. }));
}

#[test]
fn production_config_skips_counters() {
    let bytes = suggested_size(8, 2).unwrap();
    let mut backing = Backing::<64>::new();
    let mut pool =
        FixedPool::with_config(&mut backing.0[..bytes], 8, PoolConfig::production()).unwrap();
    let block = pool.alloc().unwrap();
    // SAFETY: freed exactly once.
    unsafe { pool.free(block).unwrap() };
    assert!(pool.stats().is_none());
}
