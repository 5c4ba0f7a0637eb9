//! Core utilities for the appshell build tools
//!
//! This crate provides shared functionality used by the platform crates:
//!
//! - **Error handling**: Errors with codes, context, and recovery suggestions
//! - **Configuration**: TOML-based tool configuration with defaults
//! - **Validation**: Fluent field validation with errors and warnings
//!
//! # Example
//!
//! ```rust,no_run
//! use appshell_core::config::Config;
//!
//! let config = Config::load(None).expect("invalid .appshell.toml");
//! println!("descriptor: {}", config.schema.general.descriptor);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod validation;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{exit_codes, Error, ErrorCode, Result, ResultExt};
    pub use crate::validation::{ValidationError, ValidationResult, Validator};
}
