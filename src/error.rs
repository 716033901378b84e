//! Error kinds returned by every public operation.

use displaydoc_lite::displaydoc;

displaydoc! {
    /// Any error that can happen while configuring or driving a [`BuddyAllocator`](crate::buddy::BuddyAllocator).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Error {
        /// a precondition was violated: a null/invalid pointer, a zero or out-of-range size, or an inconsistent configuration
        InvalidArgument,
        /// no free block large enough to satisfy the request exists anywhere in the tree
        OutOfMemory,
        /// the backing region refused to grow to the requested size
        ResourceExhausted,
    }
}

/// Result alias used throughout this crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;
