//! Destroy-while-held is a fatal precondition violation, translated from
//! `rwlock_fail_destroy_on_shared_lock`. The default fatal handler aborts the
//! process, so this installs a panicking handler and runs the violation on a
//! scratch thread, asserting the join comes back `Err`.

use syncore::platform::fatal::set_fatal_handler;
use syncore::{AcquireOutcome, RawRwLock};

fn panicking_handler(message: &str) -> ! {
    panic!("{message}");
}

#[test]
fn destroy_while_shared_hold_outstanding_is_fatal() {
    set_fatal_handler(Some(panicking_handler));

    let result = std::thread::spawn(|| {
        let lock = RawRwLock::new();
        assert_eq!(lock.acquire_shared(), AcquireOutcome::Ok);
        lock.destroy();
    })
    .join();

    assert!(result.is_err(), "expected destroy to invoke the fatal handler");
}

#[test]
fn release_shared_without_a_hold_is_fatal() {
    set_fatal_handler(Some(panicking_handler));

    let result = std::thread::spawn(|| {
        let lock = RawRwLock::new();
        lock.release_shared();
    })
    .join();

    assert!(result.is_err(), "expected release_shared to invoke the fatal handler");
}

#[test]
fn release_exclusive_held_by_another_thread_is_fatal() {
    set_fatal_handler(Some(panicking_handler));

    let lock = std::sync::Arc::new(RawRwLock::new());
    assert_eq!(lock.acquire_exclusive(), AcquireOutcome::Ok);

    let other = std::sync::Arc::clone(&lock);
    let result = std::thread::spawn(move || {
        other.release_exclusive();
    })
    .join();

    assert!(result.is_err(), "expected release_exclusive to invoke the fatal handler");
    lock.release_exclusive();
    lock.destroy();
}
