//! Reading and writing descriptor files
//!
//! TOML is the default on-disk format; `.json` files are read and written as
//! JSON with the same keys.

use crate::descriptor::BuildDescriptor;
use appshell_core::error::{Error, ErrorCode, Result, ResultExt};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Serialization format of a descriptor file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DescriptorFormat {
    /// `.toml`, also used when a path has no extension
    #[default]
    Toml,
    /// `.json`
    Json,
}

impl DescriptorFormat {
    /// Pick the format from a file extension; no extension means TOML
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            None => Ok(DescriptorFormat::Toml),
            Some(ext) => ext.parse(),
        }
    }
}

impl FromStr for DescriptorFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "toml" => Ok(DescriptorFormat::Toml),
            "json" => Ok(DescriptorFormat::Json),
            other => Err(Error::new(
                ErrorCode::UnsupportedFormat,
                format!("Unsupported descriptor format: {}", other),
            )
            .with_suggestion("Use a .toml or .json file")),
        }
    }
}

impl fmt::Display for DescriptorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorFormat::Toml => f.write_str("toml"),
            DescriptorFormat::Json => f.write_str("json"),
        }
    }
}

/// Parse a descriptor from text
pub fn parse(input: &str, format: DescriptorFormat) -> Result<BuildDescriptor> {
    let descriptor: BuildDescriptor = match format {
        DescriptorFormat::Toml => toml::from_str(input)?,
        DescriptorFormat::Json => serde_json::from_str(input)?,
    };
    Ok(descriptor)
}

/// Serialize a descriptor to text
pub fn to_string(descriptor: &BuildDescriptor, format: DescriptorFormat) -> Result<String> {
    match format {
        DescriptorFormat::Toml => Ok(toml::to_string_pretty(descriptor)?),
        DescriptorFormat::Json => {
            let mut out = serde_json::to_string_pretty(descriptor)
                .map_err(|e| Error::new(ErrorCode::Internal, e.to_string()))?;
            out.push('\n');
            Ok(out)
        }
    }
}

/// Load a descriptor file
pub fn load(path: &Path) -> Result<BuildDescriptor> {
    if !path.exists() {
        return Err(Error::file_not_found(path)
            .with_suggestion("Run `appshell-android init` to create a descriptor"));
    }
    let format = DescriptorFormat::from_path(path)?;
    tracing::debug!(path = %path.display(), %format, "Loading build descriptor");

    let content = std::fs::read_to_string(path)?;
    parse(&content, format).context(format!("While loading {}", path.display()))
}

/// Write a descriptor file in the format implied by its extension
pub fn save(descriptor: &BuildDescriptor, path: &Path) -> Result<()> {
    let format = DescriptorFormat::from_path(path)?;
    let content = to_string(descriptor, format)?;
    std::fs::write(path, content)?;
    tracing::debug!(path = %path.display(), %format, "Wrote build descriptor");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Abi, KeyStore, SigningProfile};
    use tempfile::TempDir;

    const REFERENCE: &str = r#"
applicationId = "com.example.shared_ebike_fe"
minPlatformVersion = 22
targetPlatformVersion = 35
compileVersion = 35
nativeToolchainVersion = "29.0.13113456"
supportedArchitectures = ["armeabi-v7a", "arm64-v8a"]
signingProfile = "release-custom"
pluginChain = ["com.android.application", "kotlin-android", "dev.flutter.flutter-gradle-plugin"]

[[dependencies]]
coordinate = "com.amap.api:3dmap-location-search"
versionConstraint = "latest.integration"
"#;

    #[test]
    fn test_parse_reference_toml() {
        let d = parse(REFERENCE, DescriptorFormat::Toml).unwrap();
        assert_eq!(d.application_id, "com.example.shared_ebike_fe");
        assert_eq!(d.supported_architectures, vec![Abi::ArmeabiV7a, Abi::Arm64V8a]);
        assert_eq!(d.signing_profile, SigningProfile::ReleaseCustom);
        assert_eq!(d.signing_key_store, KeyStore::Debug);
        assert_eq!(d.jvm_target, 11);
        assert_eq!(d.source_root, std::path::PathBuf::from("../.."));
        assert_eq!(d.dependencies.len(), 1);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let input = format!("{}\nminSdk = 21\n", REFERENCE.split("[[dependencies]]").next().unwrap());
        let err = parse(&input, DescriptorFormat::Toml).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigParseError);
        assert!(err.message.contains("minSdk"));
    }

    #[test]
    fn test_unknown_abi_rejected() {
        let input = REFERENCE.replace("\"arm64-v8a\"", "\"mips\"");
        let err = parse(&input, DescriptorFormat::Toml).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigParseError);
        assert!(err.message.contains("mips"));
    }

    #[test]
    fn test_unknown_signing_profile_rejected() {
        let input = REFERENCE.replace("release-custom", "release");
        assert!(parse(&input, DescriptorFormat::Toml).is_err());
    }

    #[test]
    fn test_negative_version_rejected() {
        let input = REFERENCE.replace("minPlatformVersion = 22", "minPlatformVersion = -1");
        assert!(parse(&input, DescriptorFormat::Toml).is_err());
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let input = REFERENCE.replace("compileVersion = 35\n", "");
        let err = parse(&input, DescriptorFormat::Toml).unwrap_err();
        assert!(err.message.contains("compileVersion"));
    }

    #[test]
    fn test_toml_and_json_round_trip() {
        let template = BuildDescriptor::template();
        for format in [DescriptorFormat::Toml, DescriptorFormat::Json] {
            let text = to_string(&template, format).unwrap();
            assert_eq!(parse(&text, format).unwrap(), template, "{format}");
        }
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            DescriptorFormat::from_path(Path::new("a/build-descriptor.json")).unwrap(),
            DescriptorFormat::Json
        );
        assert_eq!(
            DescriptorFormat::from_path(Path::new("descriptor")).unwrap(),
            DescriptorFormat::Toml
        );
        let err = DescriptorFormat::from_path(Path::new("build.gradle.kts")).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedFormat);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("build-descriptor.json");
        let template = BuildDescriptor::template();

        save(&template, &path).unwrap();
        assert_eq!(load(&path).unwrap(), template);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join("missing.toml")).unwrap_err();
        assert_eq!(err.code, ErrorCode::FileNotFound);
    }

    #[test]
    fn test_load_adds_context_on_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "applicationId = ").unwrap();

        let err = load(&path).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigParseError);
        assert!(err.context.unwrap().contains("broken.toml"));
    }

    mod properties {
        use super::*;
        use crate::descriptor::{Coordinate, Dependency};
        use crate::gradle::{BUILD_SCRIPT, import_kts, render_kts};
        use crate::validate::ValidationPolicy;
        use proptest::prelude::*;
        use std::path::PathBuf;

        fn abi_set() -> impl Strategy<Value = Vec<Abi>> {
            proptest::sample::subsequence(Abi::ALL.to_vec(), 1..=4)
        }

        fn dependency() -> impl Strategy<Value = Dependency> {
            (
                "[a-z]{2,8}\\.[a-z]{2,8}",
                "[a-z][a-z0-9-]{0,12}",
                prop_oneof![
                    Just("latest.integration".to_string()),
                    "[0-9]{1,2}\\.[0-9]{1,2}\\.[0-9]{1,3}",
                    "[0-9]{1,2}\\.\\+",
                ],
            )
                .prop_map(|(group, artifact, constraint)| {
                    Dependency::new(Coordinate::new(group, artifact), constraint)
                })
        }

        fn descriptor() -> impl Strategy<Value = BuildDescriptor> {
            (
                "[a-z]{2,6}\\.[a-z]{2,6}\\.[a-z][a-z_]{1,9}",
                1u32..40,
                0u32..10,
                0u32..10,
                abi_set(),
                prop::bool::ANY,
                prop::option::of("[a-z]{3,8}"),
                prop::option::of(1u32..10_000),
                prop::collection::vec(dependency(), 0..4),
                prop::bool::ANY,
                prop::option::of("[a-z]{2,6}\\.[a-z]{2,6}"),
                prop::option::of("[a-z]{1,8}(/[a-z]{1,8})?"),
            )
                .prop_map(
                    |(
                        id,
                        min,
                        target_gap,
                        compile_gap,
                        abis,
                        custom,
                        alias,
                        code,
                        deps,
                        flutter,
                        namespace,
                        source,
                    )| {
                        let mut d = BuildDescriptor::template();
                        d.application_id = id;
                        d.namespace = namespace;
                        if flutter {
                            if let Some(source) = source {
                                d.source_root = PathBuf::from(source);
                            }
                        } else {
                            d.plugin_chain.truncate(2);
                        }
                        d.min_platform_version = min;
                        d.target_platform_version = min + target_gap;
                        d.compile_version = min + target_gap + compile_gap;
                        d.supported_architectures = abis;
                        if let (true, Some(alias)) = (custom, alias) {
                            d.signing_key_store =
                                KeyStore::File(PathBuf::from(format!("keys/{}.jks", alias)));
                            d.signing_key_alias = Some(alias);
                        }
                        d.version_code = code;
                        d.dependencies = deps;
                        d
                    },
                )
        }

        proptest! {
            #[test]
            fn serialization_round_trips(d in descriptor()) {
                for format in [DescriptorFormat::Toml, DescriptorFormat::Json] {
                    let text = to_string(&d, format).unwrap();
                    prop_assert_eq!(parse(&text, format).unwrap(), d.clone());
                }
            }

            #[test]
            fn rendered_script_round_trips(d in descriptor()) {
                let validated = d.validate(ValidationPolicy::default());
                prop_assume!(validated.is_ok());
                let validated = validated.unwrap();

                let script = render_kts(&validated);
                let imported = import_kts(&script, Path::new(BUILD_SCRIPT)).unwrap();
                prop_assert_eq!(&imported, validated.descriptor());
            }
        }
    }
}
