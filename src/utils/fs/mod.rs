//! File system utilities for pinsync.
//!
//! - [`atomic`] - temp-file-and-rename writes so readers never observe partial files
//! - [`dirs`] - directory creation and removal helpers
//! - [`paths`] - path expansion and upward manifest discovery

pub mod atomic;
pub mod dirs;
pub mod paths;

pub use atomic::atomic_write;
pub use dirs::{ensure_dir, remove_dir_if_exists, remove_file_if_exists};
pub use paths::{expand_path, find_upwards};
