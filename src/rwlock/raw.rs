//! The faithful, unsafe state machine underneath [`super::ReentrantRwLock`].
//!
//! Mirrors the originating `SyRawRwLock` field-for-field and
//! operation-for-operation. This is the layer the invariants and the
//! deadlock-elevation protocol are stated against; callers who want a safe,
//! guard-returning API should reach for [`super::ReentrantRwLock`] instead.

use crate::platform::atomic::{AtomicBoolCell, AtomicUsizeCell, MemoryOrder};
use crate::platform::fatal::invoke_fatal;
use crate::platform::yield_now::thread_yield;
use crate::registry::Registry;
use crate::rwlock::error::AcquireOutcome;
use crate::thread_id::this_thread_id;

const READER_INITIAL_CAPACITY: usize = 4;
const ELEVATE_INITIAL_CAPACITY: usize = 2;

/// A `Registry` only ever touched while the fence is held.
///
/// Plain `core::cell::UnsafeCell` in normal builds. Under `cfg(loom)` this
/// switches to `loom::cell::UnsafeCell` so loom's model checker sees registry
/// mutation directly instead of only the fence's own CAS traffic — without
/// this, loom can exercise every fence interleaving and still never notice a
/// registry-exclusivity violation, since it has no visibility into plain
/// `UnsafeCell` accesses.
struct FenceCell<T>(
    #[cfg(not(loom))] core::cell::UnsafeCell<T>,
    #[cfg(loom)] loom::cell::UnsafeCell<T>,
);

impl<T> FenceCell<T> {
    #[cfg(not(loom))]
    const fn new(value: T) -> Self {
        FenceCell(core::cell::UnsafeCell::new(value))
    }

    #[cfg(loom)]
    fn new(value: T) -> Self {
        FenceCell(loom::cell::UnsafeCell::new(value))
    }

    /// # Safety
    /// Caller must hold the fence for the duration of `f`.
    #[cfg(not(loom))]
    unsafe fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut *self.0.get())
    }

    /// # Safety
    /// Caller must hold the fence for the duration of `f`.
    #[cfg(loom)]
    unsafe fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.0.with_mut(|ptr| f(&mut *ptr))
    }
}

#[cfg(feature = "tsan-hooks")]
mod tsan {
    use core::ffi::c_void;

    extern "C" {
        pub fn __tsan_mutex_pre_lock(addr: *mut c_void, flags: u32);
        pub fn __tsan_mutex_post_lock(addr: *mut c_void, flags: u32, recursion: i32);
        pub fn __tsan_mutex_pre_unlock(addr: *mut c_void, flags: u32);
        pub fn __tsan_mutex_post_unlock(addr: *mut c_void, flags: u32);
    }
}

/// Spin-fence-protected record combining an exclusive-owner identifier and
/// count, the reader registry, the elevation-requester registry, and a
/// deadlock generation counter.
///
/// All fields are zero-initializable; [`RawRwLock::new`] is a `const fn`.
pub struct RawRwLock {
    fence: AtomicBoolCell,
    exclusive_id: AtomicUsizeCell,
    exclusive_count: AtomicUsizeCell,
    readers: FenceCell<Registry>,
    threads_want_elevate: FenceCell<Registry>,
    deadlock_generation: AtomicUsizeCell,
}

// SAFETY: every access to `readers`/`threads_want_elevate` happens while
// `fence` is held exclusively by the calling thread; the atomics are `Sync`
// in their own right.
unsafe impl Sync for RawRwLock {}

impl RawRwLock {
    #[cfg(not(loom))]
    pub const fn new() -> Self {
        RawRwLock {
            fence: AtomicBoolCell::new(false),
            exclusive_id: AtomicUsizeCell::new(0),
            exclusive_count: AtomicUsizeCell::new(0),
            readers: FenceCell::new(Registry::new(READER_INITIAL_CAPACITY)),
            threads_want_elevate: FenceCell::new(Registry::new(ELEVATE_INITIAL_CAPACITY)),
            deadlock_generation: AtomicUsizeCell::new(0),
        }
    }

    #[cfg(loom)]
    pub fn new() -> Self {
        RawRwLock {
            fence: AtomicBoolCell::new(false),
            exclusive_id: AtomicUsizeCell::new(0),
            exclusive_count: AtomicUsizeCell::new(0),
            readers: FenceCell::new(Registry::new(READER_INITIAL_CAPACITY)),
            threads_want_elevate: FenceCell::new(Registry::new(ELEVATE_INITIAL_CAPACITY)),
            deadlock_generation: AtomicUsizeCell::new(0),
        }
    }

    #[cfg(feature = "tsan-hooks")]
    fn fence_addr(&self) -> *mut core::ffi::c_void {
        &self.fence as *const AtomicBoolCell as *mut core::ffi::c_void
    }

    fn acquire_fence(&self) {
        #[cfg(feature = "tsan-hooks")]
        // SAFETY: `addr` is a stable address for the lifetime of `self`.
        unsafe {
            tsan::__tsan_mutex_pre_lock(self.fence_addr(), 0)
        };
        let mut expected = false;
        while !self
            .fence
            .compare_exchange_weak(&mut expected, true, MemoryOrder::SeqCst)
        {
            log::trace!(target: "syncore::rwlock", "fence contended, yielding");
            expected = false;
            thread_yield();
        }
        #[cfg(feature = "tsan-hooks")]
        // SAFETY: matches the preceding `__tsan_mutex_pre_lock` call.
        unsafe {
            tsan::__tsan_mutex_post_lock(self.fence_addr(), 0, 0)
        };
    }

    fn release_fence(&self) {
        #[cfg(feature = "tsan-hooks")]
        // SAFETY: only called while the fence is held by this thread.
        unsafe {
            tsan::__tsan_mutex_pre_unlock(self.fence_addr(), 0)
        };
        self.fence.store(false, MemoryOrder::SeqCst);
        #[cfg(feature = "tsan-hooks")]
        // SAFETY: matches the preceding `__tsan_mutex_pre_unlock` call.
        unsafe {
            tsan::__tsan_mutex_post_unlock(self.fence_addr(), 0)
        };
    }

    /// Non-blocking shared acquire. See the module-level protocol notes.
    pub fn try_acquire_shared(&self) -> AcquireOutcome {
        let this_thread = this_thread_id();

        let exclusive = self.exclusive_id.load(MemoryOrder::SeqCst);
        if exclusive != 0 && exclusive != this_thread {
            return AcquireOutcome::SharedBlockedByExclusive;
        }

        self.acquire_fence();
        let exclusive = self.exclusive_id.load(MemoryOrder::SeqCst);
        if exclusive != 0 && exclusive != this_thread {
            self.release_fence();
            return AcquireOutcome::SharedBlockedByExclusive;
        }
        // SAFETY: fence held.
        let pushed = unsafe { self.readers.with_mut(|readers| readers.push(this_thread)) };
        self.release_fence();
        if !pushed {
            return AcquireOutcome::OutOfMemory;
        }
        AcquireOutcome::Ok
    }

    /// Blocking shared acquire; retries only on `SharedBlockedByExclusive`.
    pub fn acquire_shared(&self) -> AcquireOutcome {
        loop {
            match self.try_acquire_shared() {
                AcquireOutcome::SharedBlockedByExclusive => {
                    thread_yield();
                }
                outcome => return outcome,
            }
        }
    }

    pub fn release_shared(&self) {
        let this_thread = this_thread_id();
        let exclusive = self.exclusive_id.load(MemoryOrder::SeqCst);
        if exclusive != 0 && exclusive != this_thread {
            invoke_fatal("[release_shared] exclusive lock held by another thread");
        }

        self.acquire_fence();
        // SAFETY: fence held.
        let is_empty = unsafe { self.readers.with_mut(|readers| readers.len() == 0) };
        if is_empty {
            self.release_fence();
            invoke_fatal("[release_shared] no shared hold outstanding for this thread");
        }
        // SAFETY: fence held.
        unsafe { self.readers.with_mut(|readers| readers.remove_first(this_thread)) };
        self.release_fence();
    }

    /// Non-blocking exclusive acquire, including elevation and deadlock
    /// detection. See the module-level ten-step protocol notes.
    pub fn try_acquire_exclusive(&self) -> AcquireOutcome {
        let this_thread = this_thread_id();

        // Step 1.
        let old_generation = self.deadlock_generation.load(MemoryOrder::SeqCst);

        // Step 2.
        let exclusive = self.exclusive_id.load(MemoryOrder::SeqCst);
        if exclusive == this_thread {
            self.exclusive_count.fetch_add(1, MemoryOrder::SeqCst);
            return AcquireOutcome::Ok;
        }
        if exclusive != 0 {
            return AcquireOutcome::ExclusiveBlockedByExclusive;
        }

        // Step 3.
        self.acquire_fence();

        // Step 4.
        // SAFETY: fence held.
        let this_thread_is_reader =
            unsafe { self.readers.with_mut(|readers| readers.contains(this_thread)) };
        if this_thread_is_reader {
            // SAFETY: fence held.
            let pushed = unsafe {
                self.threads_want_elevate
                    .with_mut(|elevate| elevate.push(this_thread))
            };
            self.release_fence();
            if !pushed {
                return AcquireOutcome::OutOfMemory;
            }
            thread_yield();
        } else {
            self.release_fence();
        }

        // Step 5.
        self.acquire_fence();

        // Step 6.
        let new_generation = self.deadlock_generation.load(MemoryOrder::SeqCst);
        if new_generation != old_generation {
            if this_thread_is_reader {
                // SAFETY: fence held.
                unsafe {
                    self.threads_want_elevate
                        .with_mut(|elevate| elevate.remove_first(this_thread))
                };
            }
            self.release_fence();
            log::warn!(target: "syncore::rwlock", "deadlock generation advanced under us, denying");
            return AcquireOutcome::Deadlock;
        }

        // Step 7.
        if this_thread_is_reader {
            // SAFETY: fence held.
            let has_foreign_elevator = unsafe {
                self.threads_want_elevate
                    .with_mut(|elevate| !elevate.only_contains(this_thread))
            };
            if has_foreign_elevator {
                self.deadlock_generation.fetch_add(1, MemoryOrder::SeqCst);
                // SAFETY: fence held.
                unsafe {
                    self.threads_want_elevate
                        .with_mut(|elevate| elevate.remove_first(this_thread))
                };
                self.release_fence();
                log::warn!(target: "syncore::rwlock", "elevation conflict detected, declaring deadlock");
                return AcquireOutcome::Deadlock;
            }
            // SAFETY: fence held.
            unsafe {
                self.threads_want_elevate
                    .with_mut(|elevate| elevate.remove_first(this_thread))
            };
        }

        // Step 8.
        let exclusive = self.exclusive_id.load(MemoryOrder::SeqCst);
        if exclusive != 0 {
            self.release_fence();
            return AcquireOutcome::ExclusiveBlockedByExclusive;
        }

        // Step 9.
        // SAFETY: fence held.
        let sole_reader =
            unsafe { self.readers.with_mut(|readers| readers.only_contains(this_thread)) };
        if !sole_reader {
            self.release_fence();
            return AcquireOutcome::ExclusiveBlockedByOtherReaders;
        }

        // Step 10.
        self.exclusive_id.store(this_thread, MemoryOrder::SeqCst);
        self.exclusive_count.fetch_add(1, MemoryOrder::SeqCst);
        self.release_fence();
        AcquireOutcome::Ok
    }

    /// Blocking exclusive acquire; retries only on `ExclusiveBlockedByExclusive`.
    pub fn acquire_exclusive(&self) -> AcquireOutcome {
        loop {
            match self.try_acquire_exclusive() {
                AcquireOutcome::ExclusiveBlockedByExclusive => {
                    thread_yield();
                }
                outcome => return outcome,
            }
        }
    }

    pub fn release_exclusive(&self) {
        let this_thread = this_thread_id();
        let exclusive = self.exclusive_id.load(MemoryOrder::SeqCst);
        if exclusive != this_thread {
            invoke_fatal("[release_exclusive] exclusive lock not held by this thread");
        }

        self.acquire_fence();
        let count = self.exclusive_count.load(MemoryOrder::SeqCst);
        if count == 0 {
            self.release_fence();
            invoke_fatal("[release_exclusive] exclusive_count underflow");
        }
        self.exclusive_count.fetch_sub(1, MemoryOrder::SeqCst);
        if count == 1 {
            self.exclusive_id.store(0, MemoryOrder::SeqCst);
        }
        self.release_fence();
    }

    /// Current number of outstanding shared acquisitions (with multiplicity).
    pub fn reader_len(&self) -> usize {
        self.acquire_fence();
        // SAFETY: fence held.
        let len = unsafe { self.readers.with_mut(|readers| readers.len()) };
        self.release_fence();
        len
    }

    /// Current re-entrant exclusive depth; `0` iff no thread holds exclusive.
    pub fn exclusive_depth(&self) -> usize {
        self.exclusive_count.load(MemoryOrder::SeqCst)
    }

    /// Thread id of the current exclusive owner, or `0` if none.
    pub fn exclusive_owner(&self) -> usize {
        self.exclusive_id.load(MemoryOrder::SeqCst)
    }

    /// Tears down the registries. Fatal if the lock is still held or has a
    /// pending elevation request.
    pub fn destroy(&self) {
        self.acquire_fence();
        let exclusive = self.exclusive_id.load(MemoryOrder::SeqCst);
        // SAFETY: fence held.
        let (readers_len, elevate_len) = unsafe {
            (
                self.readers.with_mut(|readers| readers.len()),
                self.threads_want_elevate.with_mut(|elevate| elevate.len()),
            )
        };
        if exclusive != 0 || readers_len != 0 || elevate_len != 0 {
            self.release_fence();
            invoke_fatal("[destroy] lock destroyed while held or while an elevation is pending");
        }
        // SAFETY: fence held; both registries are empty per the checks above.
        unsafe {
            self.readers.with_mut(|readers| readers.free());
            self.threads_want_elevate.with_mut(|elevate| elevate.free());
        }
        self.release_fence();
    }
}

impl Default for RawRwLock {
    fn default() -> Self {
        Self::new()
    }
}
