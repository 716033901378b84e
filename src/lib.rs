//! A binary buddy allocator over a single contiguous, growable region.
//!
//! Memory is carved into blocks whose size is always a power of two
//! times the smallest allocatable block (`2^min_block_exp` bytes).
//! Free blocks of each size class ("order") sit in their own free
//! list; `alloc` splits a larger free block down to the requested
//! order when no exact match exists, and `free` walks back up,
//! merging a block with its buddy whenever both halves are free.
//!
//! The allocator owns none of the memory it manages directly — it is
//! generic over a [`region::BackingRegion`] (the address range) and a
//! [`free_list::FreeList`] (the per-order storage), so it can be
//! dropped onto an arbitrary page-mapping layer without modification.
//!
//! ```
//! use buddy_pool::{buddy::BuddyAllocator, free_list::VecFreeList, region::VecRegion};
//!
//! let region = VecRegion::new(16, 1 << 16); // 64KiB, fully committed
//! let mut allocator =
//!     BuddyAllocator::<VecRegion, VecFreeList>::init(region, 16, 6).unwrap();
//!
//! let mut ptr = Some(allocator.alloc(100).unwrap());
//! allocator.free(&mut ptr).unwrap();
//! assert!(ptr.is_none());
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod buddy;
pub mod error;
pub mod free_list;
mod math;
pub mod region;
pub mod sync;

pub use buddy::BuddyAllocator;
pub use error::{Error, Result};
