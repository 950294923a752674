//! # syncore
//!
//! A re-entrant reader/writer lock with thread-identity tracking and
//! deadlock-aware shared→exclusive elevation, and the small platform
//! abstraction layer it runs on.
//!
//! The lock must support re-entrancy across opaque external-call boundaries
//! (a caller that invokes foreign code which re-enters and re-acquires the
//! same lock), elevation from shared to exclusive when the elevating thread
//! is the sole reader, and detection of elevation deadlocks between two
//! threads that each hold a shared lock and each want to elevate. See
//! [`rwlock::RawRwLock`] for the full ten-step acquire-exclusive protocol
//! this implies.
//!
//! ## Module organization
//!
//! ### Platform layer
//! - [`platform::alloc`] - aligned allocation
//! - [`platform::pages`] - page-granularity virtual memory with protection changes
//! - [`platform::atomic`] - cross-platform atomic machine-word/boolean operations
//! - [`platform::yield_now`] - cooperative thread yield
//! - [`platform::fatal`] - process-wide fatal error handler dispatch
//!
//! ### Identity and registries
//! - [`mod@thread_id`] - lazy per-OS-thread identity
//! - [`registry`] - dense, growth-by-doubling thread-id buffer backing both
//!   the reader registry and the elevation-requester registry
//!
//! ### The lock
//! - [`rwlock::RawRwLock`] - the faithful, unsafe state machine
//! - [`rwlock::ReentrantRwLock`] - the safe, guard-returning wrapper

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![allow(clippy::module_inception)]

/// Lazy per-OS-thread identity.
pub mod thread_id;

/// Dense, growth-by-doubling thread-id registry.
pub mod registry;

/// Platform abstraction layer: allocation, paging, atomics, yield, fatal dispatch.
pub mod platform;

/// Re-entrant reader/writer lock with deadlock-aware elevation.
pub mod rwlock;

pub use rwlock::{AcquireOutcome, ExclusiveGuard, RawRwLock, ReentrantRwLock, SharedGuard};
