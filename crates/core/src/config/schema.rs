//! Configuration schema definitions
//!
//! Settings for the appshell tools themselves, not for the app being built.

use serde::{Deserialize, Serialize};

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigSchema {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// General project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Build descriptor used when no file is given on the command line
    #[serde(default = "default_descriptor")]
    pub descriptor: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            descriptor: default_descriptor(),
        }
    }
}

fn default_descriptor() -> String {
    "build-descriptor.toml".to_string()
}

/// Validation policy
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PolicyConfig {
    /// Treat release builds signed with debug keys as fatal
    #[serde(default)]
    pub production: bool,

    /// Fail validation when any warning is emitted
    #[serde(default)]
    pub deny_warnings: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
