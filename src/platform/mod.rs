//! Platform abstraction layer: allocation, virtual memory, atomics, yielding,
//! and fatal error dispatch. Every non-default Cargo feature here
//! (`custom-aligned-malloc-free`, `custom-page-memory`, `custom-thread-yield`,
//! `custom-fatal-handler`) hands one seam to the embedder via an
//! `extern "Rust"` hook, mirroring the originating build-time toggles.

pub mod alloc;
pub mod atomic;
pub mod fatal;
pub mod pages;
pub mod yield_now;

pub use atomic::MemoryOrder;
pub use yield_now::thread_yield;
