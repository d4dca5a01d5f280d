//! Cross-cutting utilities: atomic file operations, path helpers and progress bars.

pub mod fs;
pub mod progress;

pub use fs::{atomic_write, ensure_dir};
pub use progress::ProgressBar;
