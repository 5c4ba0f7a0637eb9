//! Importing a descriptor from an existing `build.gradle.kts`
//!
//! Only statically known values are accepted. A property whose final
//! assignment is an expression supplied by a plugin at build time, such as
//! `compileSdk = flutter.compileSdkVersion`, cannot be imported and must be
//! replaced by a literal first. Later assignments win, as in Gradle.

use super::script::{self, Statement, Value};
use crate::descriptor::{
    Abi, BuildDescriptor, DEFAULT_SOURCE_ROOT, Dependency, KeyStore, SigningProfile,
};
use appshell_core::error::{Error, ErrorCode, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

static PLUGIN_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^id\s*\(\s*"([^"]+)"\s*\)"#).unwrap());
static KOTLIN_SHORTHAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^kotlin\s*\(\s*"([^"]+)"\s*\)"#).unwrap());
static ASSIGNMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(.+)$").unwrap());
static DEPENDENCY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^(implementation|api)\s*\(\s*"([^"]+)"\s*\)$"#).unwrap());
static GET_BY_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^signingConfigs\.getByName\(\s*"([^"]+)"\s*\)$"#).unwrap());
static NAMED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^(?:create|getByName|register)\(\s*"([^"]+)"\s*\)$"#).unwrap());
static STORE_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^(?:file|rootProject\.file)\(\s*"([^"]+)"\s*\)$"#).unwrap());
static JAVA_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^JavaVersion\.VERSION_(?:1_)?(\d+)(?:\.toString\(\))?$").unwrap());

/// A value together with the line it was assigned on
#[derive(Debug, Clone)]
struct Assigned {
    value: Value,
    line: usize,
}

/// Raw properties collected from a script before they are resolved
#[derive(Debug, Default)]
struct Collected {
    plugins: Vec<String>,
    props: HashMap<&'static str, Assigned>,
    abis: Vec<(String, usize)>,
    release_signing: Option<Assigned>,
    signing_configs: HashMap<String, SigningBlock>,
    dependencies: Vec<(String, usize)>,
}

#[derive(Debug, Default)]
struct SigningBlock {
    store_file: Option<Assigned>,
    key_alias: Option<Assigned>,
}

/// Import a descriptor from build script text
///
/// `origin` is only used in error messages.
pub fn import_kts(source: &str, origin: &Path) -> Result<BuildDescriptor> {
    let statements = script::statements(source);
    tracing::debug!(
        origin = %origin.display(),
        statements = statements.len(),
        "Importing Gradle script"
    );

    let mut collected = Collected::default();
    for statement in &statements {
        collect(&mut collected, statement);
    }
    resolve(collected, origin)
}

/// Import a descriptor from a `build.gradle.kts` file
pub fn import_file(path: &Path) -> Result<BuildDescriptor> {
    if !path.exists() {
        return Err(Error::file_not_found(path));
    }
    let source = std::fs::read_to_string(path)?;
    import_kts(&source, path)
}

fn collect(c: &mut Collected, s: &Statement) {
    let path: Vec<&str> = s.path.iter().map(String::as_str).collect();
    match path.as_slice() {
        ["plugins"] => {
            if let Some(cap) = PLUGIN_ID.captures(&s.text) {
                c.plugins.push(cap[1].to_string());
            } else if let Some(cap) = KOTLIN_SHORTHAND.captures(&s.text) {
                c.plugins.push(format!("org.jetbrains.kotlin.{}", &cap[1]));
            }
        }
        ["android"] => assign(c, s, &["namespace", "compileSdk", "ndkVersion"]),
        ["android", "defaultConfig"] => assign(
            c,
            s,
            &[
                "applicationId",
                "minSdk",
                "targetSdk",
                "compileSdk",
                "ndkVersion",
                "versionCode",
                "versionName",
            ],
        ),
        ["android", "defaultConfig", "ndk"] => {
            if s.text.starts_with("abiFilters") {
                c.abis.extend(
                    script::string_literals(&s.text)
                        .into_iter()
                        .map(|abi| (abi, s.line)),
                );
            }
        }
        ["android", "compileOptions"] => assign(c, s, &["sourceCompatibility"]),
        ["android", "kotlinOptions"] => assign(c, s, &["jvmTarget"]),
        ["android", "signingConfigs", block] => {
            if let (Some(name), Some(cap)) =
                (NAMED_BLOCK.captures(block), ASSIGNMENT.captures(&s.text))
            {
                let entry = c.signing_configs.entry(name[1].to_string()).or_default();
                let value = Assigned {
                    value: Value::parse(&cap[2]),
                    line: s.line,
                };
                match &cap[1] {
                    "storeFile" => entry.store_file = Some(value),
                    "keyAlias" => entry.key_alias = Some(value),
                    _ => {}
                }
            }
        }
        ["android", "buildTypes", block] if is_release_block(block) => {
            if let Some(cap) = ASSIGNMENT.captures(&s.text) {
                if &cap[1] == "signingConfig" {
                    c.release_signing = Some(Assigned {
                        value: Value::Expr(cap[2].trim().to_string()),
                        line: s.line,
                    });
                }
            }
        }
        ["dependencies"] => {
            if let Some(cap) = DEPENDENCY.captures(&s.text) {
                c.dependencies.push((cap[2].to_string(), s.line));
            }
        }
        ["flutter"] => assign(c, s, &["source"]),
        _ => {}
    }
}

fn is_release_block(header: &str) -> bool {
    header == "release"
        || NAMED_BLOCK
            .captures(header)
            .is_some_and(|cap| &cap[1] == "release")
}

fn assign(c: &mut Collected, s: &Statement, keys: &[&'static str]) {
    let Some(cap) = ASSIGNMENT.captures(&s.text) else {
        return;
    };
    if let Some(key) = keys.iter().find(|key| **key == &cap[1]) {
        c.props.insert(
            *key,
            Assigned {
                value: Value::parse(&cap[2]),
                line: s.line,
            },
        );
    }
}

fn resolve(mut c: Collected, origin: &Path) -> Result<BuildDescriptor> {
    let application_id = required_str(&c, "applicationId", origin)?;
    let min_platform_version = required_int(&c, "minSdk", origin)?;
    let target_platform_version = required_int(&c, "targetSdk", origin)?;
    let compile_version = required_int(&c, "compileSdk", origin)?;
    let native_toolchain_version = required_str(&c, "ndkVersion", origin)?;

    let namespace = optional_str(&c, "namespace", origin)?.filter(|ns| *ns != application_id);
    let version_code = int_value(flutter_managed(&c, "versionCode"), "versionCode", origin)?;
    let version_name = str_value(flutter_managed(&c, "versionName"), "versionName", origin)?;
    let jvm_target = jvm_target(&c, origin)?;
    let source_root = optional_str(&c, "source", origin)?
        .map_or_else(|| PathBuf::from(DEFAULT_SOURCE_ROOT), PathBuf::from);

    let mut supported_architectures = Vec::new();
    for (abi, line) in &c.abis {
        let abi: Abi = abi
            .parse()
            .map_err(|e: String| unresolved(origin, *line, e))?;
        if !supported_architectures.contains(&abi) {
            supported_architectures.push(abi);
        }
    }

    let dependencies = c
        .dependencies
        .iter()
        .map(|(notation, line)| {
            Dependency::from_notation(notation).map_err(|e| unresolved(origin, *line, e))
        })
        .collect::<Result<Vec<_>>>()?;

    let (signing_profile, signing_key_store, signing_key_alias) = signing(&mut c, origin)?;

    Ok(BuildDescriptor {
        application_id,
        namespace,
        min_platform_version,
        target_platform_version,
        compile_version,
        native_toolchain_version,
        supported_architectures,
        signing_profile,
        signing_key_store,
        signing_key_alias,
        jvm_target,
        version_code,
        version_name,
        plugin_chain: c.plugins,
        source_root,
        dependencies,
    })
}

fn signing(
    c: &mut Collected,
    origin: &Path,
) -> Result<(SigningProfile, KeyStore, Option<String>)> {
    let Some(assigned) = &c.release_signing else {
        return Ok((SigningProfile::Debug, KeyStore::Debug, None));
    };
    let Value::Expr(expr) = &assigned.value else {
        return Err(unresolved(origin, assigned.line, "unsupported signingConfig value"));
    };
    let Some(cap) = GET_BY_NAME.captures(expr) else {
        return Err(unresolved(
            origin,
            assigned.line,
            format!("signingConfig = {} is not a named signing config", expr),
        ));
    };

    let name = &cap[1];
    if name == "debug" {
        return Ok((SigningProfile::ReleaseCustom, KeyStore::Debug, None));
    }

    let line = assigned.line;
    let block = c.signing_configs.remove(name).ok_or_else(|| {
        unresolved(origin, line, format!("signing config `{}` is not declared", name))
    })?;
    let store = match block.store_file {
        Some(Assigned {
            value: Value::Expr(expr),
            line,
        }) => match STORE_FILE.captures(&expr) {
            Some(cap) => PathBuf::from(&cap[1]),
            None => {
                return Err(unresolved(
                    origin,
                    line,
                    format!("storeFile = {} is not a literal file path", expr),
                ))
            }
        },
        Some(Assigned { line, .. }) => {
            return Err(unresolved(origin, line, "storeFile must use file(\"...\")"))
        }
        None => {
            return Err(unresolved(
                origin,
                line,
                format!("signing config `{}` has no storeFile", name),
            ))
        }
    };
    let alias = match block.key_alias {
        Some(Assigned {
            value: Value::Str(alias),
            ..
        }) => Some(alias),
        _ => None,
    };
    Ok((SigningProfile::ReleaseCustom, KeyStore::File(store), alias))
}

fn jvm_target(c: &Collected, origin: &Path) -> Result<u32> {
    let assigned = c
        .props
        .get("sourceCompatibility")
        .or_else(|| c.props.get("jvmTarget"));
    let Some(assigned) = assigned else {
        return Ok(11);
    };
    match &assigned.value {
        Value::Str(s) => s
            .trim_start_matches("1.")
            .parse()
            .map_err(|_| unresolved(origin, assigned.line, format!("jvm target `{}`", s))),
        Value::Expr(expr) => JAVA_VERSION
            .captures(expr)
            .and_then(|cap| cap[1].parse().ok())
            .ok_or_else(|| symbolic(origin, "sourceCompatibility", expr, assigned.line)),
        Value::Int(n) => Ok(*n),
    }
}

fn required_str(c: &Collected, key: &str, origin: &Path) -> Result<String> {
    optional_str(c, key, origin)?.ok_or_else(|| missing(origin, key))
}

fn optional_str(c: &Collected, key: &str, origin: &Path) -> Result<Option<String>> {
    str_value(c.props.get(key), key, origin)
}

fn required_int(c: &Collected, key: &str, origin: &Path) -> Result<u32> {
    int_value(c.props.get(key), key, origin)?.ok_or_else(|| missing(origin, key))
}

/// The assignment of `key`, unless it is delegated to `flutter.<key>`
fn flutter_managed<'a>(c: &'a Collected, key: &str) -> Option<&'a Assigned> {
    let delegated = format!("flutter.{}", key);
    c.props.get(key).filter(|assigned| match &assigned.value {
        Value::Expr(expr) => *expr != delegated,
        _ => true,
    })
}

fn str_value(assigned: Option<&Assigned>, key: &str, origin: &Path) -> Result<Option<String>> {
    match assigned {
        None => Ok(None),
        Some(Assigned {
            value: Value::Str(s),
            ..
        }) => Ok(Some(s.clone())),
        Some(Assigned {
            value: Value::Int(n),
            line,
        }) => Err(unresolved(
            origin,
            *line,
            format!("{} must be a string, found {}", key, n),
        )),
        Some(Assigned {
            value: Value::Expr(expr),
            line,
        }) => Err(symbolic(origin, key, expr, *line)),
    }
}

fn int_value(assigned: Option<&Assigned>, key: &str, origin: &Path) -> Result<Option<u32>> {
    match assigned {
        None => Ok(None),
        Some(Assigned {
            value: Value::Int(n),
            ..
        }) => Ok(Some(*n)),
        Some(Assigned {
            value: Value::Str(s),
            line,
        }) => Err(unresolved(
            origin,
            *line,
            format!("{} must be an integer, found \"{}\"", key, s),
        )),
        Some(Assigned {
            value: Value::Expr(expr),
            line,
        }) => Err(symbolic(origin, key, expr, *line)),
    }
}

fn missing(origin: &Path, key: &str) -> Error {
    Error::new(
        ErrorCode::GradleUnresolved,
        format!("{} is not set in {}", key, origin.display()),
    )
    .with_suggestion(format!("Declare {} with a literal value", key))
}

fn symbolic(origin: &Path, key: &str, expr: &str, line: usize) -> Error {
    Error::new(
        ErrorCode::GradleUnresolved,
        format!(
            "{} = {} is only known at build time ({}:{})",
            key,
            expr,
            origin.display(),
            line
        ),
    )
    .with_suggestion(format!("Assign {} a literal value before importing", key))
}

fn unresolved(origin: &Path, line: usize, message: impl Into<String>) -> Error {
    Error::gradle(message).with_context(format!("{}:{}", origin.display(), line))
}
