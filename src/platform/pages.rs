//! Page-granularity virtual memory.
//!
//! Backs the registry and guard state when a caller wants allocations that can
//! be made read-only after construction (see the `Design Notes` around
//! [`crate::rwlock`]'s immutable-after-publish fields). On POSIX this is
//! `mmap`/`munmap`/`mprotect`; on Windows, `VirtualAlloc`/`VirtualFree`/
//! `VirtualProtect`. Targets with no virtual memory (or callers who simply
//! don't want it) enable `no-page-memory`, which fans every call here back out
//! to [`super::alloc`] with a fixed 4096-byte alignment and no-op protection
//! toggles.

use core::ptr::NonNull;

use super::fatal::invoke_fatal;

fn validate_len(len: usize) {
    if len == 0 {
        invoke_fatal("[page_alloc] len must be nonzero");
    }
}

#[cfg(not(any(feature = "no-page-memory", feature = "custom-page-memory")))]
mod imp {
    use super::*;

    #[cfg(unix)]
    pub fn page_size() -> usize {
        // SAFETY: `_SC_PAGESIZE` is always a valid sysconf name.
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size <= 0 {
            invoke_fatal("[page_size] sysconf(_SC_PAGESIZE) failed");
        }
        size as usize
    }

    #[cfg(windows)]
    pub fn page_size() -> usize {
        use windows_sys::Win32::System::SystemInformation::GetSystemInfo;
        use windows_sys::Win32::System::SystemInformation::SYSTEM_INFO;

        let mut info: SYSTEM_INFO = unsafe { core::mem::zeroed() };
        // SAFETY: `info` is a valid, fully-sized out-parameter.
        unsafe { GetSystemInfo(&mut info) };
        info.dwPageSize as usize
    }

    #[cfg(unix)]
    pub fn page_alloc(len: usize) -> Option<NonNull<u8>> {
        validate_len(len);
        // SAFETY: args form a valid anonymous private mapping request.
        let ptr = unsafe {
            libc::mmap(
                core::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return None;
        }
        NonNull::new(ptr as *mut u8)
    }

    #[cfg(windows)]
    pub fn page_alloc(len: usize) -> Option<NonNull<u8>> {
        use windows_sys::Win32::System::Memory::{
            VirtualAlloc, MEM_COMMIT, MEM_RESERVE, PAGE_READWRITE,
        };

        validate_len(len);
        // SAFETY: `len` was validated nonzero above.
        let ptr = unsafe {
            VirtualAlloc(
                core::ptr::null_mut(),
                len,
                MEM_COMMIT | MEM_RESERVE,
                PAGE_READWRITE,
            )
        };
        NonNull::new(ptr as *mut u8)
    }

    /// # Safety
    /// `ptr`/`len` must match an allocation returned by [`page_alloc`].
    #[cfg(unix)]
    pub unsafe fn page_free(ptr: NonNull<u8>, len: usize) {
        validate_len(len);
        if libc::munmap(ptr.as_ptr() as *mut _, len) != 0 {
            invoke_fatal("[page_free] munmap failed");
        }
    }

    /// # Safety
    /// `ptr` must be a base address returned by [`page_alloc`].
    #[cfg(windows)]
    pub unsafe fn page_free(ptr: NonNull<u8>, _len: usize) {
        use windows_sys::Win32::System::Memory::{VirtualFree, MEM_RELEASE};

        if VirtualFree(ptr.as_ptr() as *mut _, 0, MEM_RELEASE) == 0 {
            invoke_fatal("[page_free] VirtualFree failed");
        }
    }

    /// # Safety
    /// `ptr`/`len` must describe pages currently owned by the caller.
    #[cfg(unix)]
    pub unsafe fn make_pages_read_only(ptr: NonNull<u8>, len: usize) {
        validate_len(len);
        if libc::mprotect(ptr.as_ptr() as *mut _, len, libc::PROT_READ) != 0 {
            invoke_fatal("[make_pages_read_only] mprotect failed");
        }
    }

    /// # Safety
    /// `ptr`/`len` must describe pages currently owned by the caller.
    #[cfg(windows)]
    pub unsafe fn make_pages_read_only(ptr: NonNull<u8>, len: usize) {
        use windows_sys::Win32::System::Memory::{VirtualProtect, PAGE_READONLY};

        let mut old_protect = 0u32;
        if VirtualProtect(ptr.as_ptr() as *mut _, len, PAGE_READONLY, &mut old_protect) == 0 {
            invoke_fatal("[make_pages_read_only] VirtualProtect failed");
        }
    }

    /// # Safety
    /// `ptr`/`len` must describe pages currently owned by the caller.
    #[cfg(unix)]
    pub unsafe fn make_pages_read_write(ptr: NonNull<u8>, len: usize) {
        validate_len(len);
        if libc::mprotect(ptr.as_ptr() as *mut _, len, libc::PROT_READ | libc::PROT_WRITE) != 0 {
            invoke_fatal("[make_pages_read_write] mprotect failed");
        }
    }

    /// # Safety
    /// `ptr`/`len` must describe pages currently owned by the caller.
    #[cfg(windows)]
    pub unsafe fn make_pages_read_write(ptr: NonNull<u8>, len: usize) {
        use windows_sys::Win32::System::Memory::{VirtualProtect, PAGE_READWRITE};

        let mut old_protect = 0u32;
        if VirtualProtect(ptr.as_ptr() as *mut _, len, PAGE_READWRITE, &mut old_protect) == 0 {
            invoke_fatal("[make_pages_read_write] VirtualProtect failed");
        }
    }
}

/// `no-page-memory`: there is no virtual memory backend (console/embedded/wasm
/// targets), so pages are just aligned allocations with a fixed 4096-byte
/// alignment and the protection toggles are no-ops. Matches the originating
/// `SYNC_NO_PAGES` build mode.
#[cfg(all(feature = "no-page-memory", not(feature = "custom-page-memory")))]
mod imp {
    use super::*;
    use crate::platform::alloc::{aligned_alloc, aligned_free};

    const FALLBACK_ALIGNMENT: usize = 4096;

    pub fn page_size() -> usize {
        FALLBACK_ALIGNMENT
    }

    pub fn page_alloc(len: usize) -> Option<NonNull<u8>> {
        validate_len(len);
        aligned_alloc(len, FALLBACK_ALIGNMENT)
    }

    /// # Safety
    /// `ptr`/`len` must match an allocation returned by [`page_alloc`].
    pub unsafe fn page_free(ptr: NonNull<u8>, len: usize) {
        validate_len(len);
        aligned_free(ptr, len, FALLBACK_ALIGNMENT);
    }

    /// # Safety
    /// No-op in this configuration; still requires `ptr`/`len` to describe
    /// pages the caller owns, for parity with the real backend's contract.
    pub unsafe fn make_pages_read_only(_ptr: NonNull<u8>, _len: usize) {}

    /// # Safety
    /// No-op in this configuration; see [`make_pages_read_only`].
    pub unsafe fn make_pages_read_write(_ptr: NonNull<u8>, _len: usize) {}
}

#[cfg(feature = "custom-page-memory")]
mod imp {
    use super::*;

    extern "Rust" {
        fn syncore_custom_page_size() -> usize;
        fn syncore_custom_page_alloc(len: usize) -> Option<NonNull<u8>>;
        fn syncore_custom_page_free(ptr: NonNull<u8>, len: usize);
        fn syncore_custom_make_pages_read_only(ptr: NonNull<u8>, len: usize);
        fn syncore_custom_make_pages_read_write(ptr: NonNull<u8>, len: usize);
    }

    pub fn page_size() -> usize {
        // SAFETY: the embedder enabling this feature supplies the symbol.
        unsafe { syncore_custom_page_size() }
    }

    pub fn page_alloc(len: usize) -> Option<NonNull<u8>> {
        validate_len(len);
        // SAFETY: the embedder enabling this feature supplies the symbol.
        unsafe { syncore_custom_page_alloc(len) }
    }

    /// # Safety
    /// `ptr`/`len` must match an allocation returned by [`page_alloc`].
    pub unsafe fn page_free(ptr: NonNull<u8>, len: usize) {
        validate_len(len);
        syncore_custom_page_free(ptr, len);
    }

    /// # Safety
    /// `ptr`/`len` must describe pages currently owned by the caller.
    pub unsafe fn make_pages_read_only(ptr: NonNull<u8>, len: usize) {
        syncore_custom_make_pages_read_only(ptr, len);
    }

    /// # Safety
    /// `ptr`/`len` must describe pages currently owned by the caller.
    pub unsafe fn make_pages_read_write(ptr: NonNull<u8>, len: usize) {
        syncore_custom_make_pages_read_write(ptr, len);
    }
}

pub use imp::{make_pages_read_only, make_pages_read_write, page_alloc, page_free, page_size};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fatal::expect_fatal;

    #[test]
    fn page_size_is_plausible() {
        let size = page_size();
        assert!(size >= 4096);
        assert!(size.is_power_of_two());
    }

    #[test]
    fn round_trips_a_page() {
        let size = page_size();
        let ptr = page_alloc(size).expect("page allocation failed");
        unsafe {
            core::ptr::write_bytes(ptr.as_ptr(), 0xCD, size);
            assert_eq!(*ptr.as_ptr(), 0xCD);
            make_pages_read_only(ptr, size);
            make_pages_read_write(ptr, size);
            *ptr.as_ptr() = 0xEF;
            assert_eq!(*ptr.as_ptr(), 0xEF);
            page_free(ptr, size);
        }
    }

    #[test]
    fn zero_length_alloc_is_fatal() {
        expect_fatal(|| {
            let _ = page_alloc(0);
        });
    }
}
