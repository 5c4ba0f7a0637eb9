//! Rendering `build.gradle.kts` from a validated descriptor

use crate::descriptor::{KeyStore, SigningProfile};
use crate::plugins::{self, PluginRole};
use crate::validate::ValidatedDescriptor;
use std::fmt::Write;

/// Name of the signing config created for a custom key store
pub const RELEASE_SIGNING_CONFIG: &str = "release";

const INDENT: &str = "    ";

/// Render the app module build script
pub fn render_kts(validated: &ValidatedDescriptor) -> String {
    let d = validated.descriptor();
    let flutter = plugins::has_role(&d.plugin_chain, PluginRole::Flutter);
    let kotlin = plugins::has_role(&d.plugin_chain, PluginRole::KotlinAndroid);
    let java = java_version(d.jvm_target);
    let mut out = Script::default();

    out.open("plugins");
    for id in &d.plugin_chain {
        out.line(format!("id({})", quote(id)));
    }
    out.close();
    out.blank();

    out.open("android");
    out.line(format!("namespace = {}", quote(validated.namespace())));
    out.line(format!("compileSdk = {}", d.compile_version));
    out.line(format!("ndkVersion = {}", quote(&d.native_toolchain_version)));
    out.blank();

    out.open("compileOptions");
    out.line(format!("sourceCompatibility = {}", java));
    out.line(format!("targetCompatibility = {}", java));
    out.close();

    if kotlin {
        out.blank();
        out.open("kotlinOptions");
        out.line(format!("jvmTarget = {}.toString()", java));
        out.close();
    }
    out.blank();

    out.open("defaultConfig");
    out.line(format!("applicationId = {}", quote(&d.application_id)));
    out.line(format!("minSdk = {}", d.min_platform_version));
    out.line(format!("targetSdk = {}", d.target_platform_version));
    match (d.version_code, flutter) {
        (Some(code), _) => out.line(format!("versionCode = {}", code)),
        (None, true) => out.line("versionCode = flutter.versionCode"),
        (None, false) => {}
    }
    match (&d.version_name, flutter) {
        (Some(name), _) => out.line(format!("versionName = {}", quote(name))),
        (None, true) => out.line("versionName = flutter.versionName"),
        (None, false) => {}
    }
    out.blank();
    out.open("ndk");
    for abi in validated.abi_set() {
        out.line(format!("abiFilters.add({})", quote(abi.as_str())));
    }
    out.close();
    out.close();

    if d.signing_profile == SigningProfile::ReleaseCustom {
        render_release_signing(&mut out, validated);
    }
    out.close();

    if !d.dependencies.is_empty() {
        out.blank();
        out.open("dependencies");
        for dependency in &d.dependencies {
            out.line(format!("implementation({})", quote(&dependency.notation())));
        }
        out.close();
    }

    if flutter {
        out.blank();
        out.open("flutter");
        out.line(format!(
            "source = {}",
            quote(&d.source_root.to_string_lossy().replace('\\', "/"))
        ));
        out.close();
    }

    tracing::debug!(
        application_id = %d.application_id,
        lines = out.text.lines().count(),
        "Rendered build.gradle.kts"
    );
    out.text
}

fn render_release_signing(out: &mut Script, validated: &ValidatedDescriptor) {
    let signing = validated.signing();
    let config = match signing.key_store {
        KeyStore::Debug => "debug",
        KeyStore::File(path) => {
            out.blank();
            out.open("signingConfigs");
            out.open(&format!("create({})", quote(RELEASE_SIGNING_CONFIG)));
            out.line(format!(
                "storeFile = file({})",
                quote(&path.to_string_lossy().replace('\\', "/"))
            ));
            if let Some(alias) = signing.key_alias {
                out.line(format!("keyAlias = {}", quote(alias)));
            }
            out.line("storePassword = System.getenv(\"SIGNING_STORE_PASSWORD\")");
            out.line("keyPassword = System.getenv(\"SIGNING_KEY_PASSWORD\")");
            out.close();
            out.close();
            RELEASE_SIGNING_CONFIG
        }
    };

    out.blank();
    out.open("buildTypes");
    out.open("release");
    if signing.placeholder {
        out.line("// TODO: Add your own signing config for the release build.");
        out.line("// Signing with the debug keys for now.");
    }
    out.line(format!(
        "signingConfig = signingConfigs.getByName({})",
        quote(config)
    ));
    out.close();
    out.close();
}

/// `JavaVersion` constant for a JVM target
fn java_version(target: u32) -> String {
    match target {
        8 => "JavaVersion.VERSION_1_8".to_string(),
        n => format!("JavaVersion.VERSION_{}", n),
    }
}

/// Kotlin string literal; `$` is escaped so values are never templated
fn quote(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "\\$");
    format!("\"{}\"", escaped)
}

#[derive(Default)]
struct Script {
    text: String,
    depth: usize,
}

impl Script {
    fn line(&mut self, content: impl AsRef<str>) {
        let _ = writeln!(
            self.text,
            "{}{}",
            INDENT.repeat(self.depth),
            content.as_ref()
        );
    }

    fn blank(&mut self) {
        self.text.push('\n');
    }

    fn open(&mut self, header: &str) {
        self.line(format!("{} {{", header));
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }
}
