//! Build descriptor model
//!
//! [`BuildDescriptor`] is the typed form of everything the Android build of
//! the app shell declares: identity, SDK bounds, native ABIs, signing,
//! plugins and external libraries. Unknown keys and unknown enum values are
//! rejected when the descriptor is parsed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File name of the key store Android tooling generates for debug builds
pub const DEBUG_KEYSTORE_FILE: &str = "debug.keystore";

/// Flutter project root as seen from `android/app`
pub const DEFAULT_SOURCE_ROOT: &str = "../..";

/// Declarative description of one Android build target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BuildDescriptor {
    /// Reverse-domain package identifier
    pub application_id: String,

    /// Code namespace; defaults to the application id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Lowest API level the app runs on
    pub min_platform_version: u32,

    /// API level the app declares compatibility with
    pub target_platform_version: u32,

    /// API level the sources are compiled against
    pub compile_version: u32,

    /// NDK version used for embedded native libraries
    pub native_toolchain_version: String,

    /// ABIs packaged into the artifact, in declaration order
    pub supported_architectures: Vec<Abi>,

    /// Signing profile of the release variant
    pub signing_profile: SigningProfile,

    /// Key material backing the signing profile
    #[serde(default)]
    pub signing_key_store: KeyStore,

    /// Key alias inside a custom key store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_key_alias: Option<String>,

    /// Java source/target compatibility and Kotlin JVM target
    #[serde(default = "default_jvm_target")]
    pub jvm_target: u32,

    /// Explicit version code; delegated to the Flutter plugin when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_code: Option<u32>,

    /// Explicit version name; delegated to the Flutter plugin when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,

    /// Gradle plugin ids in application order
    pub plugin_chain: Vec<String>,

    /// Shared application source, relative to the Android app module
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,

    /// External libraries, in declaration order
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

fn default_jvm_target() -> u32 {
    11
}

fn default_source_root() -> PathBuf {
    PathBuf::from(DEFAULT_SOURCE_ROOT)
}

impl BuildDescriptor {
    /// Reference descriptor of the app shell's Android target
    ///
    /// Mirrors the project as first generated: release builds still signed
    /// with the debug keys and the AMap SDK on a floating version.
    pub fn template() -> Self {
        Self {
            application_id: "com.example.shared_ebike_fe".to_string(),
            namespace: None,
            min_platform_version: 22,
            target_platform_version: 35,
            compile_version: 35,
            native_toolchain_version: "29.0.13113456".to_string(),
            supported_architectures: vec![Abi::ArmeabiV7a, Abi::Arm64V8a],
            signing_profile: SigningProfile::ReleaseCustom,
            signing_key_store: KeyStore::Debug,
            signing_key_alias: None,
            jvm_target: default_jvm_target(),
            version_code: None,
            version_name: None,
            plugin_chain: vec![
                crate::plugins::ANDROID_APPLICATION.to_string(),
                crate::plugins::KOTLIN_ANDROID.to_string(),
                crate::plugins::FLUTTER.to_string(),
            ],
            source_root: default_source_root(),
            dependencies: vec![Dependency::new(
                Coordinate::new("com.amap.api", "3dmap-location-search"),
                "latest.integration",
            )],
        }
    }

    /// Namespace, falling back to the application id
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(&self.application_id)
    }

    /// Whether the release variant is signed with debug key material
    pub fn signs_release_with_debug_keys(&self) -> bool {
        self.signing_profile == SigningProfile::ReleaseCustom && self.signing_key_store.is_debug()
    }
}

/// Android CPU ABI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Abi {
    /// 32-bit ARM
    #[serde(rename = "armeabi-v7a")]
    ArmeabiV7a,
    /// 64-bit ARM
    #[serde(rename = "arm64-v8a")]
    Arm64V8a,
    /// 32-bit Intel, emulators only in practice
    #[serde(rename = "x86")]
    X86,
    /// 64-bit Intel
    #[serde(rename = "x86_64")]
    X86_64,
}

impl Abi {
    /// All ABIs supported by current NDKs
    pub const ALL: [Abi; 4] = [Abi::ArmeabiV7a, Abi::Arm64V8a, Abi::X86, Abi::X86_64];

    /// Identifier as used in `abiFilters`
    pub fn as_str(&self) -> &'static str {
        match self {
            Abi::ArmeabiV7a => "armeabi-v7a",
            Abi::Arm64V8a => "arm64-v8a",
            Abi::X86 => "x86",
            Abi::X86_64 => "x86_64",
        }
    }
}

impl fmt::Display for Abi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Abi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Abi::ALL
            .into_iter()
            .find(|abi| abi.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Abi::ALL.iter().map(Abi::as_str).collect();
                format!("unknown ABI `{}` (expected one of: {})", s, known.join(", "))
            })
    }
}

/// Which key material signs the release variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SigningProfile {
    /// Debug builds only; no release signing is declared
    Debug,
    /// Release variant signed with a project-specific configuration
    ReleaseCustom,
}

impl fmt::Display for SigningProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningProfile::Debug => f.write_str("debug"),
            SigningProfile::ReleaseCustom => f.write_str("release-custom"),
        }
    }
}

/// Key store backing a signing profile
///
/// Serialized as the string `debug` or a path to a key store file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum KeyStore {
    /// The Android debug key store
    #[default]
    Debug,
    /// A key store file
    File(PathBuf),
}

impl KeyStore {
    /// Whether this resolves to debug key material
    pub fn is_debug(&self) -> bool {
        match self {
            KeyStore::Debug => true,
            KeyStore::File(path) => {
                path.file_name().and_then(|name| name.to_str()) == Some(DEBUG_KEYSTORE_FILE)
            }
        }
    }

    /// Key store file path, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            KeyStore::Debug => None,
            KeyStore::File(path) => Some(path),
        }
    }
}

impl From<String> for KeyStore {
    fn from(value: String) -> Self {
        if value == "debug" {
            KeyStore::Debug
        } else {
            KeyStore::File(PathBuf::from(value))
        }
    }
}

impl From<KeyStore> for String {
    fn from(value: KeyStore) -> Self {
        value.to_string()
    }
}

impl fmt::Display for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyStore::Debug => f.write_str("debug"),
            KeyStore::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Library coordinate `group:artifact`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Coordinate {
    /// Maven group id
    pub group: String,
    /// Maven artifact id
    pub artifact: String,
}

impl Coordinate {
    /// Coordinate from its two parts
    pub fn new(group: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)
    }
}

impl FromStr for Coordinate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(group), Some(artifact), None)
                if is_coordinate_part(group) && is_coordinate_part(artifact) =>
            {
                Ok(Coordinate::new(group, artifact))
            }
            _ => Err(format!(
                "invalid coordinate `{}` (expected `group:artifact`)",
                s
            )),
        }
    }
}

fn is_coordinate_part(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

impl TryFrom<String> for Coordinate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Coordinate> for String {
    fn from(value: Coordinate) -> Self {
        value.to_string()
    }
}

/// External library declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Dependency {
    /// Library coordinate
    pub coordinate: Coordinate,
    /// Gradle version string: exact, range or dynamic
    pub version_constraint: String,
}

impl Dependency {
    /// Declaration with the given constraint
    pub fn new(coordinate: Coordinate, version_constraint: impl Into<String>) -> Self {
        Self {
            coordinate,
            version_constraint: version_constraint.into(),
        }
    }

    /// Parse Gradle string notation `group:artifact:version`
    pub fn from_notation(notation: &str) -> Result<Self, String> {
        let (coordinate, constraint) = notation
            .rsplit_once(':')
            .ok_or_else(|| format!("invalid dependency notation `{}`", notation))?;
        Ok(Self::new(coordinate.parse()?, constraint))
    }

    /// Gradle string notation `group:artifact:version`
    pub fn notation(&self) -> String {
        format!("{}:{}", self.coordinate, self.version_constraint)
    }

    /// How tightly the version is constrained
    pub fn constraint_kind(&self) -> ConstraintKind {
        ConstraintKind::classify(&self.version_constraint)
    }
}

/// Classification of a version constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintKind {
    /// A single exact version
    Pinned,
    /// A bounded range such as `[1.0,2.0)`
    Range,
    /// Resolves to whatever is newest: `latest.*` or a `+` suffix
    Floating,
}

impl ConstraintKind {
    /// Classify a Gradle version string
    pub fn classify(constraint: &str) -> Self {
        let constraint = constraint.trim();
        if constraint.starts_with("latest.") || constraint.ends_with('+') {
            ConstraintKind::Floating
        } else if constraint.starts_with(['[', ']', '(']) {
            ConstraintKind::Range
        } else {
            ConstraintKind::Pinned
        }
    }

    /// Whether builds may resolve different versions over time
    pub fn is_unpinned(&self) -> bool {
        !matches!(self, ConstraintKind::Pinned)
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintKind::Pinned => f.write_str("pinned"),
            ConstraintKind::Range => f.write_str("range"),
            ConstraintKind::Floating => f.write_str("floating"),
        }
    }
}
