//! Safe, guard-returning wrapper around [`super::raw::RawRwLock`].
//!
//! Shaped after the teacher's `RwLock<T>`/`RwLockReadGuard`/`RwLockWriteGuard`
//! triple: guards borrow the lock, `Deref`/`DerefMut` to `T`, and release on
//! `Drop`. Unlike a conventional rwlock, the same thread may hold a
//! [`SharedGuard`] and an [`ExclusiveGuard`] on the same lock at once — that
//! is the re-entrancy and elevation contract [`super::raw::RawRwLock`]
//! implements; it is enforced at runtime by thread-id checks rather than by
//! the type system, because elevation specifically requires a single thread
//! to pass through both states.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};

use super::error::AcquireOutcome;
use super::raw::RawRwLock;

/// A re-entrant reader/writer lock over `T`.
pub struct ReentrantRwLock<T: ?Sized> {
    raw: RawRwLock,
    data: UnsafeCell<T>,
}

unsafe impl<T: ?Sized + Send> Send for ReentrantRwLock<T> {}
unsafe impl<T: ?Sized + Send> Sync for ReentrantRwLock<T> {}

impl<T> ReentrantRwLock<T> {
    #[cfg(not(loom))]
    pub const fn new(data: T) -> Self {
        ReentrantRwLock {
            raw: RawRwLock::new(),
            data: UnsafeCell::new(data),
        }
    }

    #[cfg(loom)]
    pub fn new(data: T) -> Self {
        ReentrantRwLock {
            raw: RawRwLock::new(),
            data: UnsafeCell::new(data),
        }
    }

    /// Consumes the lock, returning the wrapped value. No held guards can
    /// exist (they borrow `self`), so this never contends with the raw lock.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> ReentrantRwLock<T> {
    /// Non-blocking shared acquire.
    pub fn try_read(&self) -> Result<SharedGuard<'_, T>, AcquireOutcome> {
        match self.raw.try_acquire_shared() {
            AcquireOutcome::Ok => Ok(SharedGuard { lock: self }),
            outcome => Err(outcome),
        }
    }

    /// Blocking shared acquire; spins until acquired or out of memory.
    pub fn read(&self) -> Result<SharedGuard<'_, T>, AcquireOutcome> {
        match self.raw.acquire_shared() {
            AcquireOutcome::Ok => Ok(SharedGuard { lock: self }),
            outcome => Err(outcome),
        }
    }

    /// Non-blocking exclusive acquire, including elevation.
    pub fn try_write(&self) -> Result<ExclusiveGuard<'_, T>, AcquireOutcome> {
        match self.raw.try_acquire_exclusive() {
            AcquireOutcome::Ok => Ok(ExclusiveGuard { lock: self }),
            outcome => Err(outcome),
        }
    }

    /// Blocking exclusive acquire; spins until acquired, denied, or deadlocked.
    pub fn write(&self) -> Result<ExclusiveGuard<'_, T>, AcquireOutcome> {
        match self.raw.acquire_exclusive() {
            AcquireOutcome::Ok => Ok(ExclusiveGuard { lock: self }),
            outcome => Err(outcome),
        }
    }
}

impl<T: ?Sized> Drop for ReentrantRwLock<T> {
    fn drop(&mut self) {
        self.raw.destroy();
    }
}

/// RAII shared guard. Releases the shared hold on drop.
pub struct SharedGuard<'a, T: ?Sized> {
    lock: &'a ReentrantRwLock<T>,
}

impl<T: ?Sized> Deref for SharedGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: holding a `SharedGuard` means the raw lock has no exclusive
        // owner other than (possibly) this thread, and this thread is
        // registered as a reader.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for SharedGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.raw.release_shared();
    }
}

/// RAII exclusive guard. Releases one level of the exclusive hold on drop.
pub struct ExclusiveGuard<'a, T: ?Sized> {
    lock: &'a ReentrantRwLock<T>,
}

impl<T: ?Sized> Deref for ExclusiveGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: holding an `ExclusiveGuard` means this thread is the sole
        // exclusive owner.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for ExclusiveGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: see `Deref` above; exclusive ownership also rules out
        // concurrent shared readers observing this mutation.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for ExclusiveGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.raw.release_exclusive();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_then_write() {
        let lock = ReentrantRwLock::new(42);
        {
            let guard = lock.read().unwrap();
            assert_eq!(*guard, 42);
        }
        {
            let mut guard = lock.write().unwrap();
            *guard = 7;
        }
        assert_eq!(*lock.read().unwrap(), 7);
    }

    #[test]
    fn multiple_shared_guards_coexist() {
        let lock = ReentrantRwLock::new(1);
        let g1 = lock.read().unwrap();
        let g2 = lock.read().unwrap();
        assert_eq!(*g1, 1);
        assert_eq!(*g2, 1);
    }

    #[test]
    fn try_write_denied_while_foreign_reader_holds() {
        let lock = std::sync::Arc::new(ReentrantRwLock::new(0));
        let other = std::sync::Arc::clone(&lock);
        let guard_handle = std::thread::spawn(move || {
            let _guard = other.read().unwrap();
            std::thread::sleep(std::time::Duration::from_millis(20));
        });
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(lock.try_write().unwrap_err(), AcquireOutcome::ExclusiveBlockedByOtherReaders);
        guard_handle.join().unwrap();
    }

    #[test]
    fn sole_reader_elevates_through_guards() {
        let lock = ReentrantRwLock::new(5);
        let read_guard = lock.read().unwrap();
        assert_eq!(*read_guard, 5);
        let mut write_guard = lock.try_write().unwrap();
        *write_guard = 9;
        drop(write_guard);
        assert_eq!(*read_guard, 9);
    }
}
