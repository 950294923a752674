//! Cross-platform atomic machine-word and boolean operations.
//!
//! This module wraps `core::sync::atomic` to provide the memory-order-parameterized
//! API the rest of the crate is written against: [`AtomicUsizeCell`] and
//! [`AtomicBoolCell`], each addressed through the closed [`MemoryOrder`] set rather
//! than `core::sync::atomic::Ordering` directly. This is the sole place the crate
//! ever names `core::sync::atomic` (or, under `cfg(loom)`, `loom::sync::atomic`).
//!
//! # Fallback
//!
//! On a hosted target, these operations compile straight down to the requested
//! ordering. Targets that only provide single-instruction interlocked primitives
//! (no implementer of this crate currently needs one, but the API is shaped to
//! allow it) would have every operation behave as [`MemoryOrder::SeqCst`]
//! regardless of the order requested; callers must not depend on a weaker
//! ordering actually being honored.

#[cfg(not(loom))]
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering as CoreOrdering};
#[cfg(loom)]
use loom::sync::atomic::{AtomicBool, AtomicUsize, Ordering as CoreOrdering};

/// Mirrors `std::memory_order` / C11 `memory_order`. Stable integer codes are
/// assigned because `AcquireOutcome` and this enum both cross the platform
/// boundary in embedding scenarios.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOrder {
    Relaxed = 0,
    Consume = 1,
    Acquire = 2,
    Release = 3,
    AcqRel = 4,
    SeqCst = 5,
}

impl MemoryOrder {
    /// `core::sync::atomic::Ordering` has no distinct `Consume`; Rust's own
    /// standard library makes the same relaxation by mapping it to `Acquire`.
    #[inline]
    const fn to_core(self) -> CoreOrdering {
        match self {
            MemoryOrder::Relaxed => CoreOrdering::Relaxed,
            MemoryOrder::Consume => CoreOrdering::Acquire,
            MemoryOrder::Acquire => CoreOrdering::Acquire,
            MemoryOrder::Release => CoreOrdering::Release,
            MemoryOrder::AcqRel => CoreOrdering::AcqRel,
            MemoryOrder::SeqCst => CoreOrdering::SeqCst,
        }
    }

    /// `compare_exchange_weak`'s failure ordering may not be `Release` or
    /// `AcqRel`; downgrade those to `Acquire` the way most C11 implementations
    /// do internally for the failure branch.
    #[inline]
    const fn to_core_failure(self) -> CoreOrdering {
        match self {
            MemoryOrder::Release | MemoryOrder::AcqRel => CoreOrdering::Acquire,
            other => other.to_core(),
        }
    }
}

/// An atomic machine word, addressed through [`MemoryOrder`].
#[repr(transparent)]
pub struct AtomicUsizeCell(AtomicUsize);

impl AtomicUsizeCell {
    #[cfg(not(loom))]
    #[inline]
    pub const fn new(value: usize) -> Self {
        Self(AtomicUsize::new(value))
    }

    #[cfg(loom)]
    #[inline]
    pub fn new(value: usize) -> Self {
        Self(AtomicUsize::new(value))
    }

    #[inline]
    pub fn load(&self, order: MemoryOrder) -> usize {
        self.0.load(order.to_core())
    }

    #[inline]
    pub fn store(&self, value: usize, order: MemoryOrder) {
        self.0.store(value, order.to_core());
    }

    #[inline]
    pub fn fetch_add(&self, value: usize, order: MemoryOrder) -> usize {
        self.0.fetch_add(value, order.to_core())
    }

    #[inline]
    pub fn fetch_sub(&self, value: usize, order: MemoryOrder) -> usize {
        self.0.fetch_sub(value, order.to_core())
    }

    #[inline]
    pub fn exchange(&self, value: usize, order: MemoryOrder) -> usize {
        self.0.swap(value, order.to_core())
    }

    /// Returns `true` and updates nothing further on success; on failure,
    /// writes the observed value into `expected` and returns `false` — same
    /// shape as the originating `sy_atomic_size_t_compare_exchange_weak`.
    #[inline]
    pub fn compare_exchange_weak(&self, expected: &mut usize, desired: usize, order: MemoryOrder) -> bool {
        match self
            .0
            .compare_exchange_weak(*expected, desired, order.to_core(), order.to_core_failure())
        {
            Ok(_) => true,
            Err(actual) => {
                *expected = actual;
                false
            }
        }
    }
}

/// An atomic boolean, addressed through [`MemoryOrder`].
#[repr(transparent)]
pub struct AtomicBoolCell(AtomicBool);

impl AtomicBoolCell {
    #[cfg(not(loom))]
    #[inline]
    pub const fn new(value: bool) -> Self {
        Self(AtomicBool::new(value))
    }

    #[cfg(loom)]
    #[inline]
    pub fn new(value: bool) -> Self {
        Self(AtomicBool::new(value))
    }

    #[inline]
    pub fn load(&self, order: MemoryOrder) -> bool {
        self.0.load(order.to_core())
    }

    #[inline]
    pub fn store(&self, value: bool, order: MemoryOrder) {
        self.0.store(value, order.to_core());
    }

    #[inline]
    pub fn exchange(&self, value: bool, order: MemoryOrder) -> bool {
        self.0.swap(value, order.to_core())
    }

    #[inline]
    pub fn compare_exchange_weak(&self, expected: &mut bool, desired: bool, order: MemoryOrder) -> bool {
        match self
            .0
            .compare_exchange_weak(*expected, desired, order.to_core(), order.to_core_failure())
        {
            Ok(_) => true,
            Err(actual) => {
                *expected = actual;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usize_load_store_round_trip() {
        let cell = AtomicUsizeCell::new(0);
        cell.store(42, MemoryOrder::SeqCst);
        assert_eq!(cell.load(MemoryOrder::SeqCst), 42);
    }

    #[test]
    fn usize_fetch_add_returns_previous() {
        let cell = AtomicUsizeCell::new(10);
        assert_eq!(cell.fetch_add(5, MemoryOrder::SeqCst), 10);
        assert_eq!(cell.load(MemoryOrder::SeqCst), 15);
    }

    #[test]
    fn usize_fetch_sub_returns_previous() {
        let cell = AtomicUsizeCell::new(10);
        assert_eq!(cell.fetch_sub(3, MemoryOrder::SeqCst), 10);
        assert_eq!(cell.load(MemoryOrder::SeqCst), 7);
    }

    #[test]
    fn usize_cas_weak_success_and_failure() {
        let cell = AtomicUsizeCell::new(1);
        let mut expected = 1;
        assert!(cell.compare_exchange_weak(&mut expected, 2, MemoryOrder::SeqCst));
        assert_eq!(cell.load(MemoryOrder::SeqCst), 2);

        let mut stale = 1;
        assert!(!cell.compare_exchange_weak(&mut stale, 3, MemoryOrder::SeqCst));
        assert_eq!(stale, 2);
    }

    #[test]
    fn bool_exchange() {
        let cell = AtomicBoolCell::new(false);
        assert!(!cell.exchange(true, MemoryOrder::SeqCst));
        assert!(cell.load(MemoryOrder::SeqCst));
    }

    #[test]
    fn bool_cas_weak() {
        let cell = AtomicBoolCell::new(false);
        let mut expected = false;
        assert!(cell.compare_exchange_weak(&mut expected, true, MemoryOrder::SeqCst));
        assert!(cell.load(MemoryOrder::SeqCst));
    }
}
