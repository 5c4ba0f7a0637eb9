//! Android build descriptor for the app shell
//!
//! This crate models the Android target's build configuration:
//! - Typed descriptor with TOML/JSON persistence
//! - Invariant validation with fatal errors and non-fatal diagnostics
//! - Read-only lookups on validated descriptors
//! - Gradle Kotlin DSL rendering and import
//!
//! # Example
//!
//! ```rust
//! use appshell_android::descriptor::BuildDescriptor;
//! use appshell_android::validate::ValidationPolicy;
//!
//! let validated = BuildDescriptor::template()
//!     .validate(ValidationPolicy::default())
//!     .expect("template is valid");
//!
//! assert_eq!(validated.sdk_bounds().compile_version, 35);
//! assert_eq!(validated.diagnostics().len(), 2);
//! ```

#![warn(missing_docs)]

pub mod descriptor;
pub mod diagnostics;
pub mod format;
pub mod gradle;
pub mod plugins;
pub mod validate;

pub use descriptor::BuildDescriptor;
pub use diagnostics::Diagnostic;
pub use validate::{ConfigurationError, ValidatedDescriptor, ValidationPolicy};
