//! Gradle Kotlin DSL integration
//!
//! Renders a validated descriptor as the app module's `build.gradle.kts`
//! and imports descriptors from existing scripts.

pub mod import;
pub mod render;
mod script;

pub use import::{import_file, import_kts};
pub use render::render_kts;

/// Conventional build script name for the app module
pub const BUILD_SCRIPT: &str = "build.gradle.kts";
