//! Utility functions for common operations.
//!
//! - **Text processing**: slug generation for URL segments and control-char stripping
//! - **Files**: atomic writes for exported language packs
//!
//! # Examples
//!
//! ```
//! use haber::util::{slugify, strip_control_chars};
//!
//! assert_eq!(slugify("Yayıncılar"), "yayincilar");
//! assert_eq!(strip_control_chars("Spor\x00"), "Spor");
//! ```

mod fs;
mod text;

pub use fs::atomic_write;
pub use text::{slugify, strip_control_chars};
