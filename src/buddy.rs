//! The buddy-tree bookkeeping itself: split on `alloc`, coalesce on
//! `free`, on-demand growth of the backing region in between.
//!
//! Memory is broken into blocks that are a power-of-two multiple of
//! `2^min_block_exp` bytes. A block of size `2^(k + min_block_exp)` is
//! said to be of order `k`:
//!
//!       order 5                         |---------------- 2048B ----------------|
//!       order 4                 |------- 1024B -------|-------- 1024B ----------|
//!       order 3            |-- 512B --|-- 512B --|-- 512B --|-- 512B --|
//!       ...
//!
//! Each order's free blocks live in their own [`FreeList`]. To find a
//! block's buddy, flip the bit of its offset that corresponds to its
//! order — addressed directly in [`BuddyAllocator::free_block`] rather
//! than via a plain XOR, since blocks are stored as *absolute*
//! addresses and the region's `start` need not be zero or aligned to
//! anything beyond `2^min_block_exp`.
//!
//! # Invariants
//!
//! 1. Every address in `free_lists[k]` is `>= start`, `< start +
//!    2^pool_size_exp`, and aligned to `2^(k + min_block_exp)`.
//! 2. Free blocks and live allocations exactly tile the committed
//!    prefix of the region, disjointly.
//! 3. Right after `init`, `free_lists[order_count - 1] == [start]` and
//!    every other list is empty.
//! 4. No two buddies of the same order are ever simultaneously free —
//!    `free_block` coalesces them eagerly.
//! 5. The byte at offset -1 of any live allocation holds the order it
//!    was carved at.

use crate::error::{Error, Result};
use crate::free_list::FreeList;
use crate::math::ceiling_log2;
use crate::region::BackingRegion;
use alloc::vec::Vec;
use core::fmt;
use core::ptr::NonNull;

/// The order tag is a single byte, so no configuration may declare
/// more size classes than fit in one.
const MAX_ORDER_COUNT: usize = u8::MAX as usize;

/// Aggregate byte counters for a [`BuddyAllocator`], refreshed on every
/// `alloc`/`free`. This is bookkeeping about the allocator as a whole,
/// not per-allocation metadata.
#[derive(Debug, Clone)]
pub struct AllocStats {
    /// The name of the allocator these stats belong to.
    pub name: &'static str,
    /// Bytes currently handed out to callers.
    pub allocated: usize,
    /// Bytes currently free somewhere in the tree.
    pub free: usize,
    /// The size of the top-order block — the total bytes the tree can
    /// ever address, regardless of how far the backing region grows.
    pub total: usize,
}

impl AllocStats {
    const fn with_name(name: &'static str) -> Self {
        Self {
            name,
            allocated: 0,
            free: 0,
            total: 0,
        }
    }
}

impl fmt::Display for AllocStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} allocated / {} free / {} total",
            self.name, self.allocated, self.free, self.total
        )
    }
}

/// A binary buddy allocator over a region owned by `R`, using `L` as
/// the storage for each order's free list.
pub struct BuddyAllocator<R, L> {
    region: R,
    pool_size_exp: u32,
    min_block_exp: u32,
    order_count: usize,
    free_lists: Vec<L>,
    stats: AllocStats,
}

impl<R, L> BuddyAllocator<R, L>
where
    R: BackingRegion,
    L: FreeList + Default,
{
    /// Initializes a new allocator over `region`, treating the whole
    /// `2^pool_size_exp`-byte range as a single free block of the top
    /// order.
    ///
    /// Fails with [`Error::InvalidArgument`] if `0 < min_block_exp <
    /// pool_size_exp` doesn't hold, if the resulting `order_count`
    /// wouldn't fit in the one-byte order tag, or if `L`'s element
    /// size isn't pointer-sized.
    pub fn init(region: R, pool_size_exp: u32, min_block_exp: u32) -> Result<Self> {
        if min_block_exp == 0 || min_block_exp >= pool_size_exp {
            return Err(Error::InvalidArgument);
        }

        let order_count = (pool_size_exp - min_block_exp) as usize;
        if order_count == 0 || order_count > MAX_ORDER_COUNT {
            return Err(Error::InvalidArgument);
        }

        if L::ELEMENT_SIZE != core::mem::size_of::<usize>() {
            return Err(Error::InvalidArgument);
        }

        let mut free_lists = Vec::with_capacity(order_count);
        free_lists.resize_with(order_count, L::default);

        let mut allocator = Self {
            region,
            pool_size_exp,
            min_block_exp,
            order_count,
            free_lists,
            stats: AllocStats::with_name("BuddyAllocator"),
        };

        let start = allocator.region.start().as_ptr() as usize;
        allocator.free_lists[order_count - 1].push(start);
        let top_order_size = 1usize << ((order_count - 1) as u32 + min_block_exp);
        allocator.stats.total = top_order_size;
        allocator.stats.free = top_order_size;

        log::debug!(
            "initialized buddy allocator: pool_size_exp={} min_block_exp={} order_count={}",
            pool_size_exp,
            min_block_exp,
            order_count
        );

        Ok(allocator)
    }

    /// Validates that this allocator is still well-formed. Touches no
    /// backing memory; provided for symmetry with `init`.
    pub fn close(&self) -> Result<()> {
        if self.order_count != (self.pool_size_exp - self.min_block_exp) as usize {
            return Err(Error::InvalidArgument);
        }

        if self.free_lists.len() != self.order_count {
            return Err(Error::InvalidArgument);
        }

        if !self.free_lists.iter().all(FreeList::well_formed) {
            return Err(Error::InvalidArgument);
        }

        Ok(())
    }

    /// Returns a snapshot of this allocator's byte counters.
    pub fn stats(&self) -> AllocStats {
        self.stats.clone()
    }

    /// Allocates at least `requested_bytes` bytes, growing the backing
    /// region on demand if the carved block would reach past its
    /// currently committed size.
    pub fn alloc(&mut self, requested_bytes: usize) -> Result<NonNull<u8>> {
        let pool_max = 1usize << self.pool_size_exp;
        if requested_bytes == 0 || requested_bytes >= pool_max {
            return Err(Error::InvalidArgument);
        }

        // Reserve the tag byte before rounding, so the largest usable
        // request is `pool_max - 1`, not `pool_max`.
        let effective = requested_bytes + 1;
        let wanted_order =
            (ceiling_log2(effective).max(self.min_block_exp) - self.min_block_exp) as usize;
        if wanted_order >= self.order_count {
            return Err(Error::InvalidArgument);
        }

        let mut order = wanted_order;
        while order < self.order_count && self.free_lists[order].is_empty() {
            order += 1;
        }
        if order == self.order_count {
            return Err(Error::OutOfMemory);
        }

        let mut block = self.free_lists[order]
            .pop()
            .expect("the scan above only stops at a non-empty order");

        // Split from `order` down to `wanted_order`, keeping the lower
        // half as `block` and freeing each upper buddy at its order.
        for i in (wanted_order..order).rev() {
            let size = 1usize << (i as u32 + self.min_block_exp);
            let upper_buddy = block + size;
            self.free_lists[i].push(upper_buddy);
        }

        let start = self.region.start().as_ptr() as usize;
        let block_size = 1usize << (wanted_order as u32 + self.min_block_exp);
        let needed = (block - start) + block_size;
        if needed > self.region.get_size() {
            let target = needed.saturating_mul(2).min(pool_max);
            self.region.set_size(target)?;
        }

        // SAFETY: `block` lies within the region's committed prefix,
        // which was just grown if necessary, and the caller of `init`
        // guarantees that prefix is valid to write.
        unsafe {
            (block as *mut u8).write(wanted_order as u8);
        }

        self.stats.free = self.stats.free.saturating_sub(block_size);
        self.stats.allocated = self.stats.allocated.saturating_add(block_size);

        log::trace!(
            "alloc({}) -> order {} at {:#x}",
            requested_bytes,
            wanted_order,
            block
        );

        let user_ptr = (block + 1) as *mut u8;
        Ok(NonNull::new(user_ptr).expect("block address is never null"))
    }

    /// Frees a block previously returned by [`Self::alloc`] on this
    /// allocator, coalescing it with its buddy chain as far as
    /// possible. On success, `*slot` is set to `None`.
    pub fn free(&mut self, slot: &mut Option<NonNull<u8>>) -> Result<()> {
        let user_ptr = slot.ok_or(Error::InvalidArgument)?;

        let start = self.region.start().as_ptr() as usize;
        let pool_max = 1usize << self.pool_size_exp;
        let user_addr = user_ptr.as_ptr() as usize;

        if user_addr <= start || user_addr > start + pool_max {
            return Err(Error::InvalidArgument);
        }

        let block_addr = user_addr - 1;

        // SAFETY: `block_addr` was just checked to lie inside the
        // region, and every block `alloc` hands out has its order
        // tag written at this offset.
        let order = unsafe { *(block_addr as *const u8) } as usize;
        if order >= self.order_count {
            return Err(Error::InvalidArgument);
        }

        let freed_size = 1usize << (order as u32 + self.min_block_exp);
        self.free_block(block_addr, order);

        self.stats.free = self.stats.free.saturating_add(freed_size);
        self.stats.allocated = self.stats.allocated.saturating_sub(freed_size);

        log::trace!("free({:#x}) order {}", block_addr, order);

        *slot = None;
        Ok(())
    }

    /// Coalesces a just-freed block at `addr`/`order` with its buddy,
    /// walking up the tree until a buddy isn't free or the top order
    /// is reached.
    fn free_block(&mut self, mut addr: usize, mut order: usize) {
        let start = self.region.start().as_ptr() as usize;

        loop {
            // Bound the loop with `order + 1 < order_count` rather than
            // indexing `free_lists[order + 1]` unchecked at the top order.
            if order + 1 >= self.order_count {
                self.free_lists[order].push(addr);
                return;
            }

            let size = 1usize << (order as u32 + self.min_block_exp);
            let offset = addr - start;
            let parity = (offset / size) % 2;
            let buddy = if parity == 0 { addr + size } else { addr - size };

            // Locate the buddy with a linear scan, then remove it through
            // the free list's own `remove_at` using the 0-based index
            // captured here.
            match self.free_lists[order]
                .as_slice()
                .iter()
                .position(|&a| a == buddy)
            {
                Some(index) => {
                    self.free_lists[order].remove_at(index);
                    addr = addr.min(buddy);
                    order += 1;
                }
                None => {
                    self.free_lists[order].push(addr);
                    return;
                }
            }
        }
    }
}
