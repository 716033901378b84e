//! The backing memory provider contract.
//!
//! The allocator never maps or unmaps pages itself; it only ever asks
//! a [`BackingRegion`] for its current committed size, and asks it to
//! grow: a small record of operations, not an object with internal
//! policy the allocator needs to know about.

use crate::error::{Error, Result};
use alloc::vec;
use alloc::vec::Vec;
use core::ptr::NonNull;

/// A contiguous address range `[start, start + 2^pool_size_exp)` that the
/// allocator is allowed to partition.
///
/// `start` must stay stable for the lifetime of the region: the
/// allocator hands out addresses computed from it, and those addresses
/// must still be valid the next time `alloc`/`free` runs.
pub trait BackingRegion {
    /// The stable base address of the whole potential range.
    fn start(&self) -> NonNull<u8>;

    /// The number of bytes currently committed, starting at `start`.
    fn get_size(&self) -> usize;

    /// Requests growth to at least `new_size` bytes. Never shrinks.
    ///
    /// Implementations must fail with [`Error::ResourceExhausted`]
    /// rather than silently clamping, so the allocator can propagate
    /// the failure to its caller.
    fn set_size(&mut self, new_size: usize) -> Result<()>;
}

/// A [`BackingRegion`] backed by a single heap allocation, reserved in
/// full up front so that `start` never moves once the region is
/// created.
///
/// This is the region implementation used by this crate's own tests,
/// and a reasonable default for callers who don't have a page-mapping
/// layer of their own to plug in.
pub struct VecRegion {
    storage: Vec<u8>,
    current_size: usize,
}

impl VecRegion {
    /// Creates a region that can grow up to `2^pool_size_exp` bytes,
    /// with `initial_size` bytes already committed.
    ///
    /// # Panics
    ///
    /// Panics if `initial_size > 2^pool_size_exp`.
    pub fn new(pool_size_exp: u32, initial_size: usize) -> Self {
        let max = 1usize << pool_size_exp;
        assert!(
            initial_size <= max,
            "initial_size must not exceed the pool maximum"
        );

        Self {
            storage: vec![0u8; max],
            current_size: initial_size,
        }
    }
}

impl BackingRegion for VecRegion {
    fn start(&self) -> NonNull<u8> {
        // SAFETY: `storage` always holds at least one byte for any
        // `pool_size_exp >= 1`, so `as_ptr` is never null or dangling.
        NonNull::new(self.storage.as_ptr() as *mut u8).expect("backing storage pointer is null")
    }

    fn get_size(&self) -> usize {
        self.current_size
    }

    fn set_size(&mut self, new_size: usize) -> Result<()> {
        if new_size > self.storage.len() {
            return Err(Error::ResourceExhausted);
        }

        if new_size > self.current_size {
            log::trace!(
                "growing backing region from {} to {} bytes",
                self.current_size,
                new_size
            );
            self.current_size = new_size;
        }

        Ok(())
    }
}
