//! Descriptor validation
//!
//! Checks run in a fixed order and stop at the first failing group, so a
//! descriptor with several problems is always reported by the same field.
//! SDK version ordering is checked before anything else.
//!
//! A descriptor that passes becomes a [`ValidatedDescriptor`], which is the
//! only form the lookups and the Gradle renderer accept.

use crate::descriptor::{
    Abi, BuildDescriptor, DEFAULT_SOURCE_ROOT, Dependency, KeyStore, SigningProfile,
};
use crate::diagnostics::Diagnostic;
use crate::plugins::{self, PluginRole};
use appshell_core::error::{Error, ErrorCode};
use appshell_core::validation::{ValidationResult, Validator};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error as ThisError;

static REVERSE_DOMAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z][A-Za-z0-9_]*)+$").unwrap());

static NDK_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+\.\d+$").unwrap());

/// Java versions the Android Gradle plugin accepts for compile options
pub const SUPPORTED_JVM_TARGETS: [u32; 4] = [8, 11, 17, 21];

/// A fatal problem with a descriptor
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("invalid {field}: {constraint}")]
pub struct ConfigurationError {
    /// Offending descriptor field
    pub field: String,
    /// Violated constraint
    pub constraint: String,
    code: ErrorCode,
}

impl ConfigurationError {
    /// An invariant violation on `field`
    pub fn new(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            constraint: constraint.into(),
            code: ErrorCode::ConfigValidationError,
        }
    }

    /// Debug key material on a release profile while in production mode
    pub fn insecure_signing(constraint: impl Into<String>) -> Self {
        Self {
            field: "signingProfile".to_string(),
            constraint: constraint.into(),
            code: ErrorCode::InsecureSigning,
        }
    }

    /// Error code this maps to
    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

impl From<ConfigurationError> for Error {
    fn from(err: ConfigurationError) -> Self {
        let suggestion = match err.code {
            ErrorCode::InsecureSigning => {
                "Configure a release key store, or validate without production mode".to_string()
            }
            _ => format!("Fix `{}` in the build descriptor", err.field),
        };
        Error::new(err.code, err.to_string()).with_suggestion(suggestion)
    }
}

/// How strictly findings are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Release signing with debug keys is fatal
    pub production: bool,
    /// Any diagnostic is fatal
    pub deny_warnings: bool,
}

impl ValidationPolicy {
    /// Production policy
    pub fn production() -> Self {
        Self {
            production: true,
            deny_warnings: false,
        }
    }
}

/// SDK version bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkBounds {
    /// Lowest supported API level
    pub min_platform_version: u32,
    /// API level the app declares compatibility with
    pub target_platform_version: u32,
    /// API level the sources compile against
    pub compile_version: u32,
}

/// Resolved signing selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningSelection<'a> {
    /// Release signing profile
    pub profile: SigningProfile,
    /// Key store backing the profile
    pub key_store: &'a KeyStore,
    /// Alias inside a custom key store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_alias: Option<&'a str>,
    /// Debug key material is used for a release profile
    pub placeholder: bool,
}

/// A descriptor whose invariants hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDescriptor {
    descriptor: BuildDescriptor,
    diagnostics: Vec<Diagnostic>,
}

impl ValidatedDescriptor {
    /// Plugin ids in application order
    pub fn plugin_chain(&self) -> &[String] {
        &self.descriptor.plugin_chain
    }

    /// Min, target and compile API levels
    pub fn sdk_bounds(&self) -> SdkBounds {
        SdkBounds {
            min_platform_version: self.descriptor.min_platform_version,
            target_platform_version: self.descriptor.target_platform_version,
            compile_version: self.descriptor.compile_version,
        }
    }

    /// Packaged ABIs. Devices whose ABI is missing fail to load native code at runtime.
    pub fn abi_set(&self) -> &[Abi] {
        &self.descriptor.supported_architectures
    }

    /// Signing profile of the release variant and the key material behind it
    pub fn signing(&self) -> SigningSelection<'_> {
        SigningSelection {
            profile: self.descriptor.signing_profile,
            key_store: &self.descriptor.signing_key_store,
            key_alias: self.descriptor.signing_key_alias.as_deref(),
            placeholder: self.descriptor.signs_release_with_debug_keys(),
        }
    }

    /// External libraries, in declaration order
    pub fn dependencies(&self) -> &[Dependency] {
        &self.descriptor.dependencies
    }

    /// Reverse-domain package identifier
    pub fn application_id(&self) -> &str {
        &self.descriptor.application_id
    }

    /// Code namespace, falling back to the application id
    pub fn namespace(&self) -> &str {
        self.descriptor.namespace()
    }

    /// NDK version
    pub fn native_toolchain_version(&self) -> &str {
        &self.descriptor.native_toolchain_version
    }

    /// Shared application source, relative to the Android app module
    pub fn source_root(&self) -> &Path {
        &self.descriptor.source_root
    }

    /// Warnings found during validation, in check order
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The underlying descriptor
    pub fn descriptor(&self) -> &BuildDescriptor {
        &self.descriptor
    }

    /// Give up the validation guarantee and take the descriptor back
    pub fn into_inner(self) -> BuildDescriptor {
        self.descriptor
    }
}

impl BuildDescriptor {
    /// Check every invariant and collect diagnostics
    ///
    /// A namespace equal to the application id is stored as absent, the
    /// same way an imported build script reports it.
    pub fn validate(mut self, policy: ValidationPolicy) -> Result<ValidatedDescriptor, ConfigurationError> {
        if self.namespace.as_deref() == Some(self.application_id.as_str()) {
            self.namespace = None;
        }

        let stages: [fn(&BuildDescriptor) -> ValidationResult; 7] = [
            check_sdk_bounds,
            check_identity,
            check_architectures,
            check_native_toolchain,
            check_plugins,
            check_signing,
            check_build_settings,
        ];

        for stage in stages {
            if let Some(error) = stage(&self).first_error() {
                tracing::debug!(field = %error.field, "Descriptor rejected");
                return Err(ConfigurationError::new(&error.field, &error.message));
            }
        }
        check_dependencies(&self.dependencies)?;

        let diagnostics = collect_diagnostics(&self);
        for diagnostic in &diagnostics {
            tracing::warn!(code = diagnostic.code(), field = diagnostic.field(), "{}", diagnostic);
        }

        if let Some(insecure) = diagnostics
            .iter()
            .find(|d| matches!(d, Diagnostic::InsecureSigning { .. }))
        {
            if policy.production {
                return Err(ConfigurationError::insecure_signing(format!(
                    "release builds must not use debug key material in production mode ({})",
                    insecure
                )));
            }
        }
        if policy.deny_warnings {
            if let Some(first) = diagnostics.first() {
                return Err(ConfigurationError::new(
                    first.field(),
                    format!("warnings are denied: {}", first),
                ));
            }
        }

        tracing::debug!(
            application_id = %self.application_id,
            warnings = diagnostics.len(),
            "Descriptor validated"
        );
        Ok(ValidatedDescriptor {
            descriptor: self,
            diagnostics,
        })
    }
}

fn check_sdk_bounds(d: &BuildDescriptor) -> ValidationResult {
    Validator::new()
        .at_least("compileVersion", d.compile_version, d.target_platform_version)
        .at_least("targetPlatformVersion", d.target_platform_version, d.min_platform_version)
        .at_least("minPlatformVersion", d.min_platform_version, 1)
        .validate()
}

fn check_identity(d: &BuildDescriptor) -> ValidationResult {
    let mut validator = Validator::new().required("applicationId", &d.application_id).matches(
        "applicationId",
        &d.application_id,
        &REVERSE_DOMAIN,
        "a reverse-domain identifier such as com.example.app",
    );
    if let Some(namespace) = &d.namespace {
        validator = validator.matches(
            "namespace",
            namespace,
            &REVERSE_DOMAIN,
            "a reverse-domain identifier such as com.example.app",
        );
    }
    validator.validate()
}

fn check_architectures(d: &BuildDescriptor) -> ValidationResult {
    let abis = &d.supported_architectures;
    Validator::new()
        .non_empty("supportedArchitectures", abis)
        .custom("supportedArchitectures", || {
            let mut seen = HashSet::new();
            abis.iter()
                .find(|abi| !seen.insert(**abi))
                .map(|abi| format!("`{}` is listed more than once", abi))
        })
        .validate()
}

fn check_native_toolchain(d: &BuildDescriptor) -> ValidationResult {
    Validator::new()
        .matches(
            "nativeToolchainVersion",
            &d.native_toolchain_version,
            &NDK_VERSION,
            "an NDK version of the form major.minor.build",
        )
        .custom("nativeToolchainVersion", || {
            semver::Version::parse(&d.native_toolchain_version)
                .err()
                .filter(|_| NDK_VERSION.is_match(&d.native_toolchain_version))
                .map(|e| format!("not a valid version: {}", e))
        })
        .validate()
}

fn check_plugins(d: &BuildDescriptor) -> ValidationResult {
    Validator::new()
        .custom("pluginChain", || plugins::check_chain(&d.plugin_chain))
        .validate()
}

fn check_signing(d: &BuildDescriptor) -> ValidationResult {
    let mut validator = Validator::new();
    if let KeyStore::File(path) = &d.signing_key_store {
        validator = validator.custom("signingKeyStore", || {
            path.as_os_str()
                .is_empty()
                .then(|| "key store path is empty".to_string())
        });
        if d.signing_profile == SigningProfile::ReleaseCustom {
            validator = validator.required(
                "signingKeyAlias",
                d.signing_key_alias.as_deref().unwrap_or_default(),
            );
        }
    }
    validator.validate()
}

fn check_build_settings(d: &BuildDescriptor) -> ValidationResult {
    let mut validator = Validator::new().one_of("jvmTarget", d.jvm_target, &SUPPORTED_JVM_TARGETS);
    if let Some(code) = d.version_code {
        validator = validator.at_least("versionCode", code, 1);
    }
    if let Some(name) = &d.version_name {
        validator = validator.required("versionName", name);
    }
    if !plugins::has_role(&d.plugin_chain, PluginRole::Flutter) {
        validator = validator.custom("sourceRoot", || {
            (d.source_root.as_path() != Path::new(DEFAULT_SOURCE_ROOT)).then(|| {
                format!("only used by `{}`, which is not applied", plugins::FLUTTER)
            })
        });
    }
    validator.validate()
}

fn check_dependencies(dependencies: &[Dependency]) -> Result<(), ConfigurationError> {
    let mut seen = HashSet::new();
    for (index, dependency) in dependencies.iter().enumerate() {
        if dependency.version_constraint.trim().is_empty() {
            return Err(ConfigurationError::new(
                format!("dependencies[{}].versionConstraint", index),
                format!("{} has no version constraint", dependency.coordinate),
            ));
        }
        if !seen.insert(&dependency.coordinate) {
            return Err(ConfigurationError::new(
                format!("dependencies[{}].coordinate", index),
                format!("{} is declared more than once", dependency.coordinate),
            ));
        }
    }
    Ok(())
}

fn collect_diagnostics(d: &BuildDescriptor) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = d
        .dependencies
        .iter()
        .filter(|dep| dep.constraint_kind().is_unpinned())
        .map(|dep| Diagnostic::UnpinnedDependency {
            coordinate: dep.coordinate.clone(),
            constraint: dep.version_constraint.clone(),
            constraint_kind: dep.constraint_kind(),
        })
        .collect();

    if d.signs_release_with_debug_keys() {
        diagnostics.push(Diagnostic::InsecureSigning {
            profile: d.signing_profile,
            key_store: d.signing_key_store.clone(),
        });
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ConstraintKind, Coordinate};
    use std::path::PathBuf;

    fn pinned() -> BuildDescriptor {
        let mut d = BuildDescriptor::template();
        d.dependencies[0].version_constraint = "10.0.600".to_string();
        d.signing_profile = SigningProfile::Debug;
        d
    }

    fn field_of(result: Result<ValidatedDescriptor, ConfigurationError>) -> String {
        result.unwrap_err().field
    }

    #[test]
    fn test_reference_sdk_bounds_validate() {
        let mut d = pinned();
        d.min_platform_version = 22;
        d.target_platform_version = 35;
        d.compile_version = 35;
        let validated = d.validate(ValidationPolicy::default()).unwrap();
        assert_eq!(
            validated.sdk_bounds(),
            SdkBounds {
                min_platform_version: 22,
                target_platform_version: 35,
                compile_version: 35,
            }
        );
        assert!(validated.diagnostics().is_empty());
    }

    #[test]
    fn test_compile_below_target_cites_compile_version() {
        let mut d = pinned();
        d.compile_version = 30;
        let err = d.validate(ValidationPolicy::default()).unwrap_err();
        assert_eq!(err.field, "compileVersion");
        assert_eq!(err.code(), ErrorCode::ConfigValidationError);
        assert!(err.to_string().contains("at least 35"));
    }

    #[test]
    fn test_target_below_min_cites_target() {
        let mut d = pinned();
        d.min_platform_version = 36;
        assert_eq!(field_of(d.validate(ValidationPolicy::default())), "targetPlatformVersion");
    }

    #[test]
    fn test_version_ordering_runs_before_other_checks() {
        let mut d = pinned();
        d.compile_version = 30;
        d.application_id = String::new();
        d.supported_architectures.clear();
        assert_eq!(field_of(d.validate(ValidationPolicy::default())), "compileVersion");
    }

    #[test]
    fn test_empty_architectures_rejected() {
        let mut d = pinned();
        d.supported_architectures.clear();
        assert_eq!(field_of(d.validate(ValidationPolicy::default())), "supportedArchitectures");
    }

    #[test]
    fn test_duplicate_architecture_rejected() {
        let mut d = pinned();
        d.supported_architectures = vec![Abi::Arm64V8a, Abi::Arm64V8a];
        let err = d.validate(ValidationPolicy::default()).unwrap_err();
        assert_eq!(err.field, "supportedArchitectures");
        assert!(err.constraint.contains("more than once"));
    }

    #[test]
    fn test_application_id_must_be_reverse_domain() {
        for bad in ["", "app", "com.1example", "com..example", "com.example-app"] {
            let mut d = pinned();
            d.application_id = bad.to_string();
            assert_eq!(field_of(d.validate(ValidationPolicy::default())), "applicationId", "{bad}");
        }
    }

    #[test]
    fn test_ndk_version_format() {
        let mut d = pinned();
        d.native_toolchain_version = "r26b".to_string();
        assert_eq!(field_of(d.validate(ValidationPolicy::default())), "nativeToolchainVersion");
    }

    #[test]
    fn test_plugin_order_violation_cites_plugin_chain() {
        let mut d = pinned();
        d.plugin_chain.swap(1, 2);
        assert_eq!(field_of(d.validate(ValidationPolicy::default())), "pluginChain");
    }

    #[test]
    fn test_unsupported_jvm_target() {
        let mut d = pinned();
        d.jvm_target = 9;
        assert_eq!(field_of(d.validate(ValidationPolicy::default())), "jvmTarget");
    }

    #[test]
    fn test_source_root_requires_flutter() {
        let mut d = pinned();
        d.source_root = PathBuf::from("shared");
        assert!(d.clone().validate(ValidationPolicy::default()).is_ok());

        d.plugin_chain = vec![plugins::ANDROID_APPLICATION.to_string()];
        assert_eq!(field_of(d.clone().validate(ValidationPolicy::default())), "sourceRoot");

        d.source_root = PathBuf::from(DEFAULT_SOURCE_ROOT);
        assert!(d.validate(ValidationPolicy::default()).is_ok());
    }

    #[test]
    fn test_namespace_equal_to_application_id_is_dropped() {
        let mut d = pinned();
        d.namespace = Some(d.application_id.clone());
        let validated = d.validate(ValidationPolicy::default()).unwrap();
        assert_eq!(validated.descriptor().namespace, None);
        assert_eq!(validated.namespace(), "com.example.shared_ebike_fe");

        let mut d = pinned();
        d.namespace = Some("com.example.shell".to_string());
        let validated = d.validate(ValidationPolicy::default()).unwrap();
        assert_eq!(validated.namespace(), "com.example.shell");
    }

    #[test]
    fn test_custom_key_store_requires_alias() {
        let mut d = pinned();
        d.signing_profile = SigningProfile::ReleaseCustom;
        d.signing_key_store = KeyStore::File(PathBuf::from("keys/upload.jks"));
        assert_eq!(field_of(d.clone().validate(ValidationPolicy::default())), "signingKeyAlias");

        d.signing_key_alias = Some("upload".to_string());
        let validated = d.validate(ValidationPolicy::production()).unwrap();
        assert!(!validated.signing().placeholder);
    }

    #[test]
    fn test_floating_dependency_warns_once() {
        let mut d = pinned();
        d.dependencies[0].version_constraint = "latest.integration".to_string();
        let validated = d.validate(ValidationPolicy::default()).unwrap();
        assert_eq!(
            validated.diagnostics(),
            &[Diagnostic::UnpinnedDependency {
                coordinate: Coordinate::new("com.amap.api", "3dmap-location-search"),
                constraint: "latest.integration".to_string(),
                constraint_kind: ConstraintKind::Floating,
            }]
        );
    }

    #[test]
    fn test_each_unpinned_dependency_warns() {
        let mut d = pinned();
        d.dependencies.push(Dependency::new(
            Coordinate::new("androidx.core", "core-ktx"),
            "1.+",
        ));
        d.dependencies.push(Dependency::new(
            Coordinate::new("com.google.code.gson", "gson"),
            "2.11.0",
        ));
        d.dependencies.push(Dependency::new(
            Coordinate::new("io.reactivex", "rxjava"),
            "latest.release",
        ));
        let validated = d.validate(ValidationPolicy::default()).unwrap();
        assert_eq!(validated.diagnostics().len(), 2);
    }

    #[test]
    fn test_debug_keys_on_release_profile_warn_once() {
        let d = BuildDescriptor::template();
        let validated = d.validate(ValidationPolicy::default()).unwrap();
        let insecure = validated
            .diagnostics()
            .iter()
            .filter(|d| matches!(d, Diagnostic::InsecureSigning { .. }))
            .count();
        assert_eq!(insecure, 1);
        assert!(validated.signing().placeholder);
    }

    #[test]
    fn test_debug_profile_does_not_warn() {
        let d = pinned();
        assert_eq!(d.signing_profile, SigningProfile::Debug);
        let validated = d.validate(ValidationPolicy::default()).unwrap();
        assert!(!validated.signing().placeholder);
        assert!(validated.diagnostics().is_empty());
    }

    #[test]
    fn test_production_mode_rejects_debug_keys() {
        let err = BuildDescriptor::template()
            .validate(ValidationPolicy::production())
            .unwrap_err();
        assert_eq!(err.field, "signingProfile");
        assert_eq!(err.code(), ErrorCode::InsecureSigning);
    }

    #[test]
    fn test_deny_warnings_rejects_first_warning() {
        let policy = ValidationPolicy {
            production: false,
            deny_warnings: true,
        };
        let err = BuildDescriptor::template().validate(policy).unwrap_err();
        assert_eq!(err.field, "dependencies");
    }

    #[test]
    fn test_duplicate_dependency_rejected() {
        let mut d = pinned();
        let dup = d.dependencies[0].clone();
        d.dependencies.push(dup);
        assert_eq!(
            field_of(d.validate(ValidationPolicy::default())),
            "dependencies[1].coordinate"
        );
    }

    #[test]
    fn test_empty_constraint_rejected() {
        let mut d = pinned();
        d.dependencies[0].version_constraint = " ".to_string();
        assert_eq!(
            field_of(d.validate(ValidationPolicy::default())),
            "dependencies[0].versionConstraint"
        );
    }

    #[test]
    fn test_configuration_error_converts_to_core_error() {
        let err: Error = ConfigurationError::new("compileVersion", "Must be at least 35").into();
        assert_eq!(err.code, ErrorCode::ConfigValidationError);
        assert_eq!(err.message, "invalid compileVersion: Must be at least 35");
        assert!(err.suggestion.unwrap().contains("compileVersion"));
    }
}
