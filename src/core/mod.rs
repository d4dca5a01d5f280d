//! Core types and error handling for pinsync.
//!
//! - [`error`] - the [`PinsyncError`] taxonomy and user-facing [`ErrorContext`]
//! - [`category`] - lock artifact environment categories
//! - [`names`] - package name normalization shared by every keyed map

pub mod category;
pub mod error;
pub mod names;

pub use category::Category;
pub use error::{ErrorContext, PinsyncError, user_friendly_error};
pub use names::{is_valid_name, normalize_name};
