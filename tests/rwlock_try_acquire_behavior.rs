//! Try-acquire denial behavior under a foreign exclusive hold, translated
//! from `rwlock_try_acquire_behavior`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use syncore::{AcquireOutcome, RawRwLock};

#[test]
fn try_acquire_is_denied_while_another_thread_holds_exclusive() {
    let lock = Arc::new(RawRwLock::new());
    let thread1_has_exclusive = Arc::new(AtomicBool::new(false));
    let thread2_can_proceed = Arc::new(AtomicBool::new(false));

    let lock1 = Arc::clone(&lock);
    let flag1 = Arc::clone(&thread1_has_exclusive);
    let proceed1 = Arc::clone(&thread2_can_proceed);
    let t1 = std::thread::spawn(move || {
        assert_eq!(lock1.acquire_exclusive(), AcquireOutcome::Ok);
        flag1.store(true, Ordering::SeqCst);

        while !proceed1.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }

        lock1.release_exclusive();
    });

    let lock2 = Arc::clone(&lock);
    let flag2 = Arc::clone(&thread1_has_exclusive);
    let proceed2 = Arc::clone(&thread2_can_proceed);
    let t2 = std::thread::spawn(move || {
        while !flag2.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }

        assert_eq!(lock2.try_acquire_shared(), AcquireOutcome::SharedBlockedByExclusive);
        assert_eq!(lock2.try_acquire_exclusive(), AcquireOutcome::ExclusiveBlockedByExclusive);

        proceed2.store(true, Ordering::SeqCst);

        assert_eq!(lock2.acquire_shared(), AcquireOutcome::Ok);
        lock2.release_shared();
    });

    t1.join().unwrap();
    t2.join().unwrap();
    lock.destroy();
}
