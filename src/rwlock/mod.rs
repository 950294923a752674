//! Re-entrant reader/writer lock with deadlock-aware elevation.
//!
//! [`raw::RawRwLock`] is the faithful unsafe state machine; [`ReentrantRwLock`]
//! is the safe guard-returning wrapper most callers want.

pub mod error;
pub mod raw;

mod guard;

pub use error::AcquireOutcome;
pub use guard::{ExclusiveGuard, ReentrantRwLock, SharedGuard};
pub use raw::RawRwLock;
