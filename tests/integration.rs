//! Black-box tests exercising `buddy_pool` through its public API only.

use buddy_pool::error::Error;
use buddy_pool::free_list::VecFreeList;
use buddy_pool::region::VecRegion;
use buddy_pool::BuddyAllocator;
use core::ptr::NonNull;

type Allocator = BuddyAllocator<VecRegion, VecFreeList>;

fn new_allocator(pool_size_exp: u32, min_block_exp: u32) -> Allocator {
    let region = VecRegion::new(pool_size_exp, 1 << pool_size_exp);
    BuddyAllocator::init(region, pool_size_exp, min_block_exp).unwrap()
}

#[test]
fn repeated_alloc_free_of_the_same_size_cycles_through_a_small_set() {
    let mut allocator = new_allocator(12, 4);

    let mut seen = std::collections::BTreeSet::new();
    for _ in 0..200 {
        let ptr = allocator.alloc(20).unwrap();
        seen.insert(ptr.as_ptr() as usize);

        let mut slot = Some(ptr);
        allocator.free(&mut slot).unwrap();
    }

    // Every cycle should have returned the exact same block; there's
    // no leak that would keep growing the set of addresses handed out.
    assert_eq!(seen.len(), 1);
}

#[test]
fn mixed_size_allocations_free_back_to_the_initial_state() {
    let mut allocator = new_allocator(14, 5);

    let mut live = Vec::new();
    for size in [1usize, 10, 31, 63, 100, 500, 1000] {
        live.push(allocator.alloc(size).unwrap());
    }

    // free in an order different from allocation order
    live.reverse();
    for ptr in live {
        let mut slot = Some(ptr);
        allocator.free(&mut slot).unwrap();
    }

    let stats = allocator.stats();
    assert_eq!(stats.allocated, 0);
    assert_eq!(stats.free, stats.total);
}

#[test]
fn allocation_never_overlaps_a_still_live_block() {
    let mut allocator = new_allocator(13, 4);

    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for _ in 0..40 {
        let ptr = allocator.alloc(13).unwrap();
        let addr = ptr.as_ptr() as usize;
        // 13 requested bytes + 1 tag byte, rounded up to order-0 (16B).
        ranges.push((addr, addr + 14));
    }

    for (i, &(a_start, a_end)) in ranges.iter().enumerate() {
        for &(b_start, b_end) in ranges.iter().skip(i + 1) {
            let disjoint = a_end <= b_start || b_end <= a_start;
            assert!(disjoint, "allocations must never overlap");
        }
    }
}

#[test]
fn growth_from_an_empty_region_tracks_the_high_watermark() {
    let region = VecRegion::new(12, 0);
    let mut allocator: Allocator = BuddyAllocator::init(region, 12, 4).unwrap();

    for _ in 0..8 {
        let _ = allocator.alloc(15).unwrap();
    }

    // 8 order-0 (16B) blocks from the low end of the region — the
    // region must have grown to cover at least that much.
    assert!(allocator.stats().allocated >= 8 * 16);
}

#[test]
fn out_of_memory_does_not_corrupt_existing_allocations() {
    let mut allocator = new_allocator(10, 4);
    let mut live = Vec::new();

    while let Ok(ptr) = allocator.alloc(15) {
        live.push(ptr);
    }
    assert_eq!(allocator.alloc(1), Err(Error::OutOfMemory));

    for (i, &ptr) in live.iter().enumerate() {
        let tag = unsafe { *(ptr.as_ptr().sub(1)) };
        assert_eq!(tag, 0, "block {i} lost its order tag under OOM pressure");
    }

    for ptr in live {
        let mut slot = Some(ptr);
        allocator.free(&mut slot).unwrap();
    }
    assert_eq!(allocator.stats().allocated, 0);
}

#[test]
fn free_of_a_pointer_not_from_this_allocator_is_rejected() {
    let mut allocator = new_allocator(12, 4);
    let mut bogus: Option<NonNull<u8>> = NonNull::new(usize::MAX as *mut u8);
    assert_eq!(allocator.free(&mut bogus), Err(Error::InvalidArgument));
}
