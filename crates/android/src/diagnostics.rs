//! Non-fatal findings produced while validating a descriptor

use crate::descriptor::{ConstraintKind, Coordinate, KeyStore, SigningProfile};
use serde::Serialize;
use std::fmt;

/// A warning attached to an otherwise valid descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A dependency resolves to whatever version is newest at build time
    UnpinnedDependency {
        /// Library affected
        coordinate: Coordinate,
        /// Version string as declared
        constraint: String,
        /// Floating or range
        constraint_kind: ConstraintKind,
    },
    /// The release variant is signed with debug key material
    InsecureSigning {
        /// Profile of the release variant
        profile: SigningProfile,
        /// Debug key store in use
        key_store: KeyStore,
    },
}

impl Diagnostic {
    /// Stable code for filtering and JSON consumers
    pub fn code(&self) -> &'static str {
        match self {
            Diagnostic::UnpinnedDependency { .. } => "W100",
            Diagnostic::InsecureSigning { .. } => "W200",
        }
    }

    /// Descriptor field the finding refers to
    pub fn field(&self) -> &'static str {
        match self {
            Diagnostic::UnpinnedDependency { .. } => "dependencies",
            Diagnostic::InsecureSigning { .. } => "signingProfile",
        }
    }

    /// Recovery suggestion
    pub fn suggestion(&self) -> String {
        match self {
            Diagnostic::UnpinnedDependency { coordinate, .. } => {
                format!("Pin {} to an exact version for reproducible builds", coordinate)
            }
            Diagnostic::InsecureSigning { .. } => {
                "Point signingKeyStore at a release key store before publishing".to_string()
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnpinnedDependency {
                coordinate,
                constraint,
                constraint_kind,
            } => write!(
                f,
                "[{}] dependency {} uses {} version constraint `{}`",
                self.code(),
                coordinate,
                constraint_kind,
                constraint
            ),
            Diagnostic::InsecureSigning { profile, key_store } => write!(
                f,
                "[{}] signing profile `{}` uses debug key material ({})",
                self.code(),
                profile,
                key_store
            ),
        }
    }
}
