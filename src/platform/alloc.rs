//! Aligned memory allocation.
//!
//! Backs both the registry buffers ([`crate::registry::Registry`]) and, when
//! virtual memory is unavailable, the page-memory fallback in
//! [`super::pages`]. `align` must be a power of two and `len` a positive
//! multiple of `align`; violations are fatal rather than returned, matching
//! the originating `sy_aligned_malloc`/`sy_aligned_free` contract.

use core::ptr::NonNull;

use super::fatal::invoke_fatal;

fn validate(len: usize, align: usize) {
    if !align.is_power_of_two() {
        invoke_fatal("[aligned_alloc] align is not a power of 2");
    }
    if len == 0 || len % align != 0 {
        invoke_fatal("[aligned_alloc] len must be a positive multiple of align");
    }
}

#[cfg(not(feature = "custom-aligned-malloc-free"))]
mod imp {
    use super::*;
    use std::alloc::{alloc, dealloc, Layout};

    pub fn aligned_alloc(len: usize, align: usize) -> Option<NonNull<u8>> {
        validate(len, align);
        let layout = match Layout::from_size_align(len, align) {
            Ok(layout) => layout,
            Err(_) => invoke_fatal("[aligned_alloc] len/align do not form a valid layout"),
        };
        // SAFETY: layout has non-zero size, validated above.
        let ptr = unsafe { alloc(layout) };
        NonNull::new(ptr)
    }

    /// # Safety
    /// `ptr` must have been returned by [`aligned_alloc`] with the same `len`/`align`.
    pub unsafe fn aligned_free(ptr: NonNull<u8>, len: usize, align: usize) {
        validate(len, align);
        let layout = match Layout::from_size_align(len, align) {
            Ok(layout) => layout,
            Err(_) => invoke_fatal("[aligned_free] len/align do not form a valid layout"),
        };
        dealloc(ptr.as_ptr(), layout);
    }
}

#[cfg(feature = "custom-aligned-malloc-free")]
mod imp {
    use super::*;

    extern "Rust" {
        fn syncore_custom_aligned_alloc(len: usize, align: usize) -> Option<NonNull<u8>>;
        fn syncore_custom_aligned_free(ptr: NonNull<u8>, len: usize, align: usize);
    }

    pub fn aligned_alloc(len: usize, align: usize) -> Option<NonNull<u8>> {
        validate(len, align);
        // SAFETY: the embedder enabling this feature supplies the symbol.
        unsafe { syncore_custom_aligned_alloc(len, align) }
    }

    /// # Safety
    /// `ptr` must have been returned by [`aligned_alloc`] with the same `len`/`align`.
    pub unsafe fn aligned_free(ptr: NonNull<u8>, len: usize, align: usize) {
        validate(len, align);
        syncore_custom_aligned_free(ptr, len, align);
    }
}

pub use imp::{aligned_alloc, aligned_free};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fatal::expect_fatal;

    #[test]
    fn round_trips_a_block() {
        let ptr = aligned_alloc(64, 8).expect("allocation failed");
        unsafe {
            core::ptr::write_bytes(ptr.as_ptr(), 0xAB, 64);
            assert_eq!(*ptr.as_ptr(), 0xAB);
            aligned_free(ptr, 64, 8);
        }
    }

    #[test]
    fn non_power_of_two_align_is_fatal() {
        expect_fatal(|| {
            let _ = aligned_alloc(64, 3);
        });
    }

    #[test]
    fn len_not_multiple_of_align_is_fatal() {
        expect_fatal(|| {
            let _ = aligned_alloc(10, 8);
        });
    }
}
