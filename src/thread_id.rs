//! Lazy per-OS-thread identity.
//!
//! `RawRwLock` needs a stable, nonzero identifier per OS thread to recognize
//! re-entrance and to track which threads are waiting to elevate. IDs are
//! handed out lazily, in increasing order, starting at 1 (0 is reserved as a
//! "no thread" sentinel inside the registry).

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::platform::fatal::invoke_fatal;

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

std::thread_local! {
    static THIS_THREAD_ID: usize = allocate_id();
}

fn allocate_id() -> usize {
    let id = NEXT_ID.fetch_add(1, Ordering::SeqCst);
    if id >= usize::MAX - 1 {
        invoke_fatal("[thread_id] thread-id counter exhausted");
    }
    id
}

/// Returns the calling thread's id, assigning one on first use.
pub fn this_thread_id() -> usize {
    THIS_THREAD_ID.with(|id| *id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_nonzero_and_stable_within_a_thread() {
        let first = this_thread_id();
        let second = this_thread_id();
        assert_eq!(first, second);
        assert_ne!(first, 0);
    }

    #[test]
    fn distinct_threads_get_distinct_ids() {
        let main_id = this_thread_id();
        let other_id = std::thread::spawn(this_thread_id).join().unwrap();
        assert_ne!(main_id, other_id);
    }
}
