//! File system helpers shared by the physical file system and the fixtures.

pub mod atomic;
pub mod dirs;

pub use atomic::atomic_write;
pub use dirs::{copy_dir, ensure_dir, remove_dir_all};
