use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn appshell(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("appshell-android").unwrap();
    cmd.current_dir(dir).env_remove("RUST_LOG").arg("--no-color");
    cmd
}

fn init_template(dir: &Path) {
    appshell(dir).arg("init").assert().success();
}

#[test]
fn init_writes_a_descriptor_that_validates() {
    let dir = TempDir::new().unwrap();
    init_template(dir.path());
    assert!(dir.path().join("build-descriptor.toml").exists());

    appshell(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid (2 warnings"))
        .stderr(predicate::str::contains("com.amap.api:3dmap-location-search"));
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let dir = TempDir::new().unwrap();
    init_template(dir.path());

    appshell(dir.path())
        .arg("init")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--force"));

    appshell(dir.path()).args(["init", "--force"]).assert().success();
}

#[test]
fn production_mode_rejects_debug_signed_release() {
    let dir = TempDir::new().unwrap();
    init_template(dir.path());

    appshell(dir.path())
        .args(["validate", "--production"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("signingProfile"));
}

#[test]
fn deny_warnings_fails_on_floating_dependency() {
    let dir = TempDir::new().unwrap();
    init_template(dir.path());

    appshell(dir.path())
        .args(["validate", "--deny-warnings"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("dependencies"));
}

#[test]
fn policy_is_read_from_config_file() {
    let dir = TempDir::new().unwrap();
    init_template(dir.path());
    fs::write(
        dir.path().join(".appshell.toml"),
        "[policy]\nproduction = true\n",
    )
    .unwrap();

    appshell(dir.path()).arg("validate").assert().code(2);
}

#[test]
fn invalid_compile_version_exits_with_validation_error() {
    let dir = TempDir::new().unwrap();
    init_template(dir.path());
    let path = dir.path().join("build-descriptor.toml");
    let content = fs::read_to_string(&path).unwrap();
    fs::write(&path, content.replace("compileVersion = 35", "compileVersion = 30")).unwrap();

    appshell(dir.path())
        .arg("validate")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("compileVersion"));
}

#[test]
fn missing_descriptor_exits_with_config_error() {
    let dir = TempDir::new().unwrap();

    appshell(dir.path())
        .args(["validate", "absent.toml"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("appshell-android init"));
}

#[test]
fn validate_json_reports_warnings() {
    let dir = TempDir::new().unwrap();
    init_template(dir.path());

    let output = appshell(dir.path())
        .args(["validate", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["valid"], true);
    assert_eq!(report["warnings"].as_array().unwrap().len(), 2);
    assert_eq!(report["warnings"][0]["kind"], "unpinned_dependency");
}

#[test]
fn show_prints_resolved_settings() {
    let dir = TempDir::new().unwrap();
    init_template(dir.path());

    appshell(dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("com.example.shared_ebike_fe"))
        .stdout(predicate::str::contains("22 / 35 / 35"))
        .stdout(predicate::str::contains("armeabi-v7a, arm64-v8a"));
}

#[test]
fn render_writes_the_release_signing_block() {
    let dir = TempDir::new().unwrap();
    init_template(dir.path());

    appshell(dir.path())
        .arg("render")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "signingConfig = signingConfigs.getByName(\"debug\")",
        ))
        .stdout(predicate::str::contains("abiFilters.add(\"arm64-v8a\")"));
}

#[test]
fn rendered_script_imports_back() {
    let dir = TempDir::new().unwrap();
    init_template(dir.path());
    appshell(dir.path())
        .args(["render", "-o", "build.gradle.kts"])
        .assert()
        .success();

    appshell(dir.path())
        .args(["import", "build.gradle.kts", "-o", "imported.json"])
        .assert()
        .success();

    let original: serde_json::Value = toml::from_str::<toml::Value>(
        &fs::read_to_string(dir.path().join("build-descriptor.toml")).unwrap(),
    )
    .map(|v| serde_json::to_value(v).unwrap())
    .unwrap();
    let imported: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("imported.json")).unwrap())
            .unwrap();
    assert_eq!(original, imported);
}

#[test]
fn import_rejects_build_time_values() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("build.gradle.kts"),
        r#"plugins {
    id("com.android.application")
}

android {
    compileSdk = flutter.compileSdkVersion

    defaultConfig {
        applicationId = "com.example.app"
        minSdk = 24
        targetSdk = 35
    }
}
"#,
    )
    .unwrap();

    appshell(dir.path())
        .args(["import", "build.gradle.kts"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("compileSdk"));
}

#[test]
fn verbose_run_logs_the_loaded_config() {
    let dir = TempDir::new().unwrap();
    init_template(dir.path());
    fs::write(dir.path().join(".appshell.toml"), "[logging]\nlevel = \"warn\"\n").unwrap();

    appshell(dir.path())
        .args(["-vv", "validate"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Loaded tool configuration"))
        .stderr(predicate::str::contains("Command finished"));

    appshell(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stderr(predicate::str::contains("Loaded tool configuration").not());
}
