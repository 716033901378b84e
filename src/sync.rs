//! Opt-in synchronization for callers that need to share one allocator
//! across threads.
//!
//! The allocator itself takes no locks; this is purely a wrapper a
//! caller can reach for at the point where an allocator is exposed
//! globally, rather than inside the allocator's own methods.

use spin::Mutex;

/// A `spin::Mutex`-guarded allocator, safe to share across threads.
pub struct Locked<A>(Mutex<A>);

impl<A> Locked<A> {
    /// Wraps `inner` for shared access.
    pub const fn new(inner: A) -> Self {
        Self(Mutex::new(inner))
    }

    /// Locks the allocator for exclusive access.
    pub fn lock(&self) -> spin::MutexGuard<'_, A> {
        self.0.lock()
    }
}

// SAFETY: `A` is only ever touched through `Mutex::lock`, so `Locked<A>`
// can be shared across threads as long as `A` is safe to move between
// threads, regardless of whether `A` itself is `Sync`.
unsafe impl<A: Send> Sync for Locked<A> {}
