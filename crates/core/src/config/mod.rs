//! Tool configuration loading and schema definitions
//!
//! Settings read from `.appshell.toml` that shape how descriptors are checked.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
