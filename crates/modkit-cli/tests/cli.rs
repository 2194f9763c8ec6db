use std::path::Path;

use assert_cmd::Command;
use flate2::write::GzEncoder;
use flate2::Compression;
use predicates::prelude::*;
use tempfile::TempDir;

/// Unroutable registry, so any accidental network access fails fast.
const OFFLINE_FORGE: &str = "http://127.0.0.1:9";

#[allow(deprecated)]
fn modkit_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("modkit").unwrap();
    cmd.env("HOME", home)
        .env("MODKIT_FORGE_URL", OFFLINE_FORGE)
        .env_remove("RUST_LOG");
    cmd
}

fn preinstall(modules: &Path, dir: &str, name: &str, version: &str) {
    let module = modules.join(dir);
    std::fs::create_dir_all(&module).unwrap();
    std::fs::write(
        module.join("metadata.json"),
        format!(r#"{{"name": "{name}", "version": "{version}", "dependencies": []}}"#),
    )
    .unwrap();
}

fn write_tarball(path: &Path, top: &str, metadata: &str) {
    let file = std::fs::File::create(path).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (name, content) in [
        (format!("{top}/metadata.json"), metadata),
        (format!("{top}/manifests/init.pp"), "class local {}"),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, content.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

#[test]
fn test_help_lists_commands() {
    let tmp = TempDir::new().unwrap();
    modkit_cmd(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("upgrade"))
        .stdout(predicate::str::contains("search"));
}

#[test]
fn test_upgrade_not_installed_fails() {
    let tmp = TempDir::new().unwrap();
    let modules = tmp.path().join("modules");

    modkit_cmd(tmp.path())
        .args(["upgrade", "pkg-x", "--modulepath"])
        .arg(&modules)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Module 'pkg-x' is not installed"));
}

#[test]
fn test_upgrade_not_installed_json() {
    let tmp = TempDir::new().unwrap();
    let modules = tmp.path().join("modules");

    let output = modkit_cmd(tmp.path())
        .args(["upgrade", "pkg-x", "--render-as", "json", "--modulepath"])
        .arg(&modules)
        .output()
        .unwrap();

    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["action"], "upgrade");
    assert_eq!(json["result"], "failure");
    assert_eq!(
        json["error"]["oneline"],
        "Could not upgrade 'pkg-x'; module is not installed"
    );
}

#[test]
fn test_install_invalid_name_fails() {
    let tmp = TempDir::new().unwrap();

    modkit_cmd(tmp.path())
        .args(["install", "stdlib", "--target-dir"])
        .arg(tmp.path().join("modules"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("author-name"));
}

#[test]
fn test_install_already_installed_is_noop() {
    let tmp = TempDir::new().unwrap();
    let modules = tmp.path().join("modules");
    preinstall(&modules, "stdlib", "puppetlabs-stdlib", "4.1.0");

    modkit_cmd(tmp.path())
        .args(["install", "puppetlabs-stdlib", "--modulepath"])
        .arg(&modules)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Module puppetlabs-stdlib v4.1.0 is already installed.",
        ));
}

#[test]
fn test_install_local_archive() {
    let tmp = TempDir::new().unwrap();
    let modules = tmp.path().join("modules");
    let tarball = tmp.path().join("pkg-local-0.3.0.tar.gz");
    write_tarball(
        &tarball,
        "pkg-local-0.3.0",
        r#"{"name": "pkg-local", "version": "0.3.0", "dependencies": [{"name": "pkg-absent", "version_requirement": ">= 1.0.0"}]}"#,
    );

    modkit_cmd(tmp.path())
        .arg("install")
        .arg(&tarball)
        .arg("--ignore-dependencies")
        .arg("--target-dir")
        .arg(&modules)
        .assert()
        .success()
        .stdout(predicate::str::contains("└── pkg-local (v0.3.0)"));

    assert!(modules.join("local").join("manifests").join("init.pp").is_file());
}
