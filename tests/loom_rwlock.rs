//! Loom model-checked interleavings of the fence/registry/deadlock logic.
//!
//! Not run by a plain `cargo test`; requires `RUSTFLAGS="--cfg loom" cargo
//! test --test loom_rwlock --release`. Kept small since loom's exhaustive
//! exploration blows up quickly with thread count and iteration count.

#![cfg(loom)]

use syncore::{AcquireOutcome, RawRwLock};

#[test]
fn two_threads_never_observe_concurrent_exclusive_ownership() {
    loom::model(|| {
        let lock = loom::sync::Arc::new(RawRwLock::new());

        let spawn_worker = |lock: loom::sync::Arc<RawRwLock>| {
            loom::thread::spawn(move || {
                assert_eq!(lock.acquire_exclusive(), AcquireOutcome::Ok);
                lock.release_exclusive();
            })
        };

        let t1 = spawn_worker(lock.clone());
        let t2 = spawn_worker(lock.clone());
        t1.join().unwrap();
        t2.join().unwrap();

        lock.destroy();
    });
}

#[test]
fn elevation_deadlock_always_resolves_to_deadlock_or_denial() {
    loom::model(|| {
        let lock = loom::sync::Arc::new(RawRwLock::new());

        assert_eq!(lock.acquire_shared(), AcquireOutcome::Ok);

        let other = lock.clone();
        let handle = loom::thread::spawn(move || {
            assert_eq!(other.acquire_shared(), AcquireOutcome::Ok);
            let outcome = other.try_acquire_exclusive();
            other.release_shared();
            outcome
        });

        let outcome = lock.try_acquire_exclusive();
        lock.release_shared();
        let other_outcome = handle.join().unwrap();

        // neither side may ever observe `Ok`: each thread is a reader while
        // the other also holds a reader, so at best one resolves to
        // `ExclusiveBlockedByOtherReaders` and at worst both detect `Deadlock`.
        assert_ne!(outcome, AcquireOutcome::Ok);
        assert_ne!(other_outcome, AcquireOutcome::Ok);
    });
}
