//! Gradle plugin chain ordering
//!
//! Gradle applies plugins in declaration order. A plugin that integrates with
//! another one must be declared after it, or configuring the build fails.

use std::collections::HashSet;

/// Android application plugin
pub const ANDROID_APPLICATION: &str = "com.android.application";
/// Kotlin Android plugin, legacy id
pub const KOTLIN_ANDROID: &str = "kotlin-android";
/// Kotlin Android plugin, qualified id
pub const KOTLIN_ANDROID_QUALIFIED: &str = "org.jetbrains.kotlin.android";
/// Flutter Gradle plugin
pub const FLUTTER: &str = "dev.flutter.flutter-gradle-plugin";

/// What a plugin contributes to the build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginRole {
    /// Android packaging
    AndroidApplication,
    /// Kotlin language toolchain
    KotlinAndroid,
    /// Flutter platform integration
    Flutter,
    /// Anything else; no ordering constraints
    Other,
}

impl PluginRole {
    /// Classify a plugin id
    pub fn of(id: &str) -> Self {
        match id {
            ANDROID_APPLICATION => PluginRole::AndroidApplication,
            KOTLIN_ANDROID | KOTLIN_ANDROID_QUALIFIED => PluginRole::KotlinAndroid,
            FLUTTER => PluginRole::Flutter,
            _ => PluginRole::Other,
        }
    }

    /// Roles that must already be applied when this one is
    pub fn requires(&self) -> &'static [PluginRole] {
        match self {
            PluginRole::KotlinAndroid => &[PluginRole::AndroidApplication],
            PluginRole::Flutter => &[PluginRole::AndroidApplication, PluginRole::KotlinAndroid],
            PluginRole::AndroidApplication | PluginRole::Other => &[],
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            PluginRole::AndroidApplication => ANDROID_APPLICATION,
            PluginRole::KotlinAndroid => "a Kotlin Android plugin",
            PluginRole::Flutter => FLUTTER,
            PluginRole::Other => "plugin",
        }
    }
}

/// Check a plugin chain, returning the first violated constraint
pub fn check_chain(chain: &[String]) -> Option<String> {
    if chain.is_empty() {
        return Some("must list at least one plugin".to_string());
    }

    let mut seen = HashSet::new();
    let mut applied = HashSet::new();
    for (index, id) in chain.iter().enumerate() {
        let id = id.trim();
        if id.is_empty() {
            return Some(format!("entry {} is empty", index));
        }
        if !seen.insert(id) {
            return Some(format!("`{}` is applied more than once", id));
        }

        let role = PluginRole::of(id);
        if role != PluginRole::Other && applied.contains(&role) {
            return Some(format!("`{}` applies {} a second time", id, role.describe()));
        }
        for required in role.requires() {
            if applied.contains(required) {
                continue;
            }
            let declared_later = chain[index + 1..]
                .iter()
                .any(|later| PluginRole::of(later.trim()) == *required);
            return Some(if declared_later {
                format!(
                    "`{}` must be applied after {}",
                    id,
                    required.describe()
                )
            } else {
                format!("`{}` requires {} to be applied first", id, required.describe())
            });
        }
        applied.insert(role);
    }

    if !applied.contains(&PluginRole::AndroidApplication) {
        return Some(format!("must apply `{}`", ANDROID_APPLICATION));
    }

    None
}

/// Whether any plugin in the chain has the given role
pub fn has_role(chain: &[String], role: PluginRole) -> bool {
    chain.iter().any(|id| PluginRole::of(id.trim()) == role)
}
