//! Cross-cutting utilities: retry backoff and atomic file operations.

pub mod backoff;
pub mod fs;

pub use backoff::{backoff_delay, exponential_backoff_with_delay};
pub use fs::{atomic_write, copy_dir, ensure_dir};
