//! The read-only lock.
//!
//! Writes through read-only views are rejected while the lock is engaged,
//! which is the default. Framework code that owns a read-only view may lift
//! the lock for a scoped section with [`with_unlocked`].

use std::cell::Cell;

thread_local! {
    static LOCKED: Cell<bool> = Cell::new(true);
}

/// Engage the lock.
pub fn lock() {
    LOCKED.with(|flag| flag.set(true));
}

/// Lift the lock until the next [`lock`].
pub fn unlock() {
    LOCKED.with(|flag| flag.set(false));
}

pub fn is_locked() -> bool {
    LOCKED.with(Cell::get)
}

struct UnlockGuard {
    previous: bool,
}

impl Drop for UnlockGuard {
    fn drop(&mut self) {
        LOCKED.with(|flag| flag.set(self.previous));
    }
}

/// Run `f` with the lock lifted, restoring the previous state afterwards.
pub fn with_unlocked<R>(f: impl FnOnce() -> R) -> R {
    let _guard = UnlockGuard {
        previous: is_locked(),
    };
    unlock();
    f()
}
