//! Core types shared by every engine module
//!
//! # Modules
//!
//! ## `error` - Error Handling
//!
//! - [`EngineError`] - Enumerated error types covering the fatal failure modes
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to user-friendly format
//!
//! # Examples
//!
//! ```rust,no_run
//! use scaffold_cli::core::{EngineError, user_friendly_error};
//!
//! fn load() -> anyhow::Result<()> {
//!     Err(EngineError::SettingsSaveFailed {
//!         attempts: 10,
//!         reason: "permission denied".to_string(),
//!     }
//!     .into())
//! }
//!
//! if let Err(e) = load() {
//!     user_friendly_error(e).display();
//! }
//! ```

pub mod error;

pub use error::{EngineError, ErrorContext, user_friendly_error};
