//! Process-wide fatal error handler dispatch.
//!
//! Precondition violations (releasing a lock nobody holds, destroying a held
//! lock, exhausting the thread-id or registry-capacity counters, invalid
//! aligned/page allocation arguments, failed page-protection calls) are routed
//! here rather than returned as a [`crate::rwlock::AcquireOutcome`]. The handler
//! is expected to terminate the process; its type reflects that.

use core::mem;
use core::sync::atomic::{AtomicPtr, Ordering};

/// A fatal error handler. Expected never to return.
pub type FatalHandlerFn = fn(&str) -> !;

static HANDLER: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());

#[cfg(not(feature = "custom-fatal-handler"))]
fn default_handler(message: &str) -> ! {
    log::error!(target: "syncore::fatal", "{message}");
    eprintln!("{message}");
    #[cfg(all(debug_assertions, any(target_arch = "x86", target_arch = "x86_64")))]
    // SAFETY: int3 is a plain breakpoint trap, not memory-unsafe.
    unsafe {
        core::arch::asm!("int3", options(nomem, nostack));
    }
    std::process::abort();
}

#[cfg(feature = "custom-fatal-handler")]
extern "Rust" {
    fn syncore_custom_default_fatal_handler(message: &str) -> !;
}

#[cfg(feature = "custom-fatal-handler")]
fn default_handler(message: &str) -> ! {
    // SAFETY: the embedder enabling `custom-fatal-handler` is responsible for
    // supplying this symbol at link time.
    unsafe { syncore_custom_default_fatal_handler(message) }
}

/// Replaces the process-wide fatal error handler.
///
/// Passing `None` does not clear the handler; matching the originating
/// contract, it instead invokes the *current* handler with a complaint, since
/// a null handler is itself a usage error.
pub fn set_fatal_handler(handler: Option<FatalHandlerFn>) {
    match handler {
        Some(f) => HANDLER.store(f as *mut (), Ordering::SeqCst),
        None => invoke_fatal("[set_fatal_handler] expected non-null function pointer"),
    }
}

/// Routes a precondition violation to the current fatal handler. Diverges.
pub(crate) fn invoke_fatal(message: &str) -> ! {
    let ptr = HANDLER.load(Ordering::SeqCst);
    let handler: FatalHandlerFn = if ptr.is_null() {
        default_handler
    } else {
        // SAFETY: only ever stored from a `FatalHandlerFn` in `set_fatal_handler`.
        unsafe { mem::transmute::<*mut (), FatalHandlerFn>(ptr) }
    };
    handler(message)
}

/// Test-only helper: runs `f` on a scratch thread with a panicking fatal
/// handler installed, and asserts that the fatal path fired. Fatal paths abort
/// the process by default, so exercising them in-process would kill the test
/// binary; reused by every module whose fatal preconditions need coverage.
#[cfg(test)]
pub(crate) fn expect_fatal(f: impl FnOnce() + Send + 'static) {
    fn panicking_handler(message: &str) -> ! {
        panic!("{message}");
    }
    set_fatal_handler(Some(panicking_handler));
    let result = std::thread::spawn(f).join();
    assert!(result.is_err(), "expected the fatal handler to fire");
}
