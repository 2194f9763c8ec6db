mod common;

use std::sync::Arc;

use common::{meta, modify_locally, preinstall_into, StubRegistry, Workspace};
use modkit_ops::ops_upgrade::{upgrade, UpgradeOptions};
use modkit_ops::report::{NodeAction, Outcome};
use modkit_resolver::Source;

fn remote(registry: &Arc<StubRegistry>) -> Arc<dyn Source> {
    registry.clone()
}

#[tokio::test]
async fn test_upgrade_not_installed() {
    let ws = Workspace::new();
    let registry = StubRegistry::new(vec![meta("pkg-x", "1.0.0", &[])]);

    let report = upgrade("pkg-x", &ws.upgrade_options(), remote(&registry)).await;

    assert_eq!(report.result, Outcome::Failure);
    let error = report.error.unwrap();
    assert_eq!(error.oneline, "Could not upgrade 'pkg-x'; module is not installed");
    assert!(error.multiline.contains("Use `modkit install` to install this module"));
    assert_eq!(registry.fetch_count(), 0);
}

#[tokio::test]
async fn test_upgrade_to_newest() {
    let ws = Workspace::new();
    ws.preinstall(&meta("pkg-x", "1.0.0", &[]));
    let registry = StubRegistry::new(vec![
        meta("pkg-x", "1.0.0", &[]),
        meta("pkg-x", "1.1.0", &[]),
        meta("pkg-x", "2.0.0", &[]),
    ]);

    let report = upgrade("pkg-x", &ws.upgrade_options(), remote(&registry)).await;

    assert_eq!(report.result, Outcome::Success, "{:?}", report.error);
    assert_eq!(ws.installed_version("x").as_deref(), Some("2.0.0"));
    assert_eq!(report.installed_version.as_deref(), Some("1.0.0"));
    let affected = report.affected_modules.as_ref().unwrap();
    assert_eq!(affected.len(), 1);
    assert_eq!(affected[0].version, "2.0.0");
    assert_eq!(report.graph[0].action, NodeAction::Upgrade);
    assert_eq!(report.graph[0].previous_version.as_deref(), Some("1.0.0"));
    assert!(report.render_human().contains("pkg-x (v1.0.0 -> v2.0.0)"));
}

#[tokio::test]
async fn test_upgrade_within_requested_range() {
    let ws = Workspace::new();
    ws.preinstall(&meta("pkg-x", "1.0.0", &[]));
    let registry = StubRegistry::new(vec![meta("pkg-x", "1.1.0", &[]), meta("pkg-x", "2.0.0", &[])]);
    let opts = UpgradeOptions {
        version: Some("1.x".to_string()),
        ..ws.upgrade_options()
    };

    let report = upgrade("pkg-x", &opts, remote(&registry)).await;

    assert_eq!(report.result, Outcome::Success, "{:?}", report.error);
    assert_eq!(ws.installed_version("x").as_deref(), Some("1.1.0"));
}

#[tokio::test]
async fn test_upgrade_in_place_on_secondary_modulepath() {
    let ws = Workspace::new();
    let secondary = ws.tmp.path().join("site");
    preinstall_into(&secondary, &meta("pkg-x", "1.0.0", &[]));
    let registry = StubRegistry::new(vec![meta("pkg-x", "1.1.0", &[])]);
    let opts = UpgradeOptions {
        modulepath: vec![ws.modules(), secondary.clone()],
        ..ws.upgrade_options()
    };

    let report = upgrade("pkg-x", &opts, remote(&registry)).await;

    assert_eq!(report.result, Outcome::Success, "{:?}", report.error);
    assert_eq!(report.install_dir.as_deref(), Some(secondary.as_path()));
    assert!(secondary.join("x").join("metadata.json").is_file());
    assert!(!ws.modules().join("x").exists());
}

#[tokio::test]
async fn test_upgrade_without_newer_release_is_noop() {
    let ws = Workspace::new();
    ws.preinstall(&meta("pkg-x", "1.0.0", &[]));
    let registry = StubRegistry::new(vec![meta("pkg-x", "0.9.0", &[])]);

    let report = upgrade("pkg-x", &ws.upgrade_options(), remote(&registry)).await;

    assert_eq!(report.result, Outcome::Noop);
    let error = report.error.as_ref().unwrap();
    assert_eq!(error.oneline, "Could not upgrade 'pkg-x'; more recent versions not found");
    assert!(error.multiline.contains("already the latest version matching latest"));
    assert_eq!(registry.stage_count(), 0);
    assert_eq!(ws.installed_version("x").as_deref(), Some("1.0.0"));
}

#[tokio::test]
async fn test_upgrade_blocked_by_installed_pin_names_culprits() {
    let ws = Workspace::new();
    ws.preinstall(&meta("pkg-x", "1.0.0", &[]));
    ws.preinstall(&meta("pkg-y", "1.0.0", &[]));
    let registry = StubRegistry::new(vec![
        meta("pkg-x", "2.0.0", &[("pkg-y", ">=2.0.0")]),
        meta("pkg-y", "2.0.0", &[]),
    ]);

    let report = upgrade("pkg-x", &ws.upgrade_options(), remote(&registry)).await;

    assert_eq!(report.result, Outcome::Failure);
    let error = report.error.unwrap();
    assert!(error.multiline.contains("There are 1 newer versions"));
    assert!(error.multiline.contains("across major versions"));
    assert!(error.multiline.contains("    - pkg-y"));
    assert_eq!(registry.stage_count(), 0);
    assert_eq!(ws.installed_version("x").as_deref(), Some("1.0.0"));
    assert_eq!(ws.installed_version("y").as_deref(), Some("1.0.0"));
}

#[tokio::test]
async fn test_upgrade_moves_dependency_within_major() {
    let ws = Workspace::new();
    ws.preinstall(&meta("pkg-x", "1.0.0", &[("pkg-y", ">=1.0.0")]));
    ws.preinstall(&meta("pkg-y", "1.0.0", &[]));
    let registry = StubRegistry::new(vec![
        meta("pkg-x", "1.1.0", &[("pkg-y", ">=1.3.0")]),
        meta("pkg-y", "1.3.0", &[]),
        meta("pkg-y", "2.0.0", &[]),
    ]);

    let report = upgrade("pkg-x", &ws.upgrade_options(), remote(&registry)).await;

    assert_eq!(report.result, Outcome::Success, "{:?}", report.error);
    assert_eq!(ws.installed_version("x").as_deref(), Some("1.1.0"));
    assert_eq!(ws.installed_version("y").as_deref(), Some("1.3.0"));
    assert_eq!(report.affected_modules.unwrap().len(), 2);
    let dep = &report.graph[0].dependencies[0];
    assert_eq!(dep.name, "pkg-y");
    assert_eq!(dep.action, NodeAction::Upgrade);
}

#[tokio::test]
async fn test_upgrade_with_local_changes_fails() {
    let ws = Workspace::new();
    let dir = ws.preinstall(&meta("pkg-x", "1.0.0", &[]));
    modify_locally(&dir);
    let registry = StubRegistry::new(vec![meta("pkg-x", "1.1.0", &[])]);

    let report = upgrade("pkg-x", &ws.upgrade_options(), remote(&registry)).await;

    assert_eq!(report.result, Outcome::Failure);
    let error = report.error.unwrap();
    assert_eq!(
        error.oneline,
        "Could not upgrade 'pkg-x'; module has had changes made locally"
    );
    assert!(error.multiline.contains("manifests/init.pp"));
    assert_eq!(registry.fetch_count(), 0);
}

#[tokio::test]
async fn test_upgrade_force_overrides_local_changes() {
    let ws = Workspace::new();
    let dir = ws.preinstall(&meta("pkg-x", "1.0.0", &[]));
    modify_locally(&dir);
    let registry = StubRegistry::new(vec![meta("pkg-x", "1.1.0", &[])]);
    let opts = UpgradeOptions {
        force: true,
        ..ws.upgrade_options()
    };

    let report = upgrade("pkg-x", &opts, remote(&registry)).await;

    assert_eq!(report.result, Outcome::Success, "{:?}", report.error);
    assert_eq!(ws.installed_version("x").as_deref(), Some("1.1.0"));
    assert!(!dir.join("checksums.json").exists());
}

#[tokio::test]
async fn test_upgrade_force_allows_downgrade() {
    let ws = Workspace::new();
    ws.preinstall(&meta("pkg-x", "1.0.0", &[]));
    let registry = StubRegistry::new(vec![meta("pkg-x", "0.9.0", &[])]);
    let opts = UpgradeOptions {
        force: true,
        ..ws.upgrade_options()
    };

    let report = upgrade("pkg-x", &opts, remote(&registry)).await;

    assert_eq!(report.result, Outcome::Success, "{:?}", report.error);
    assert_eq!(ws.installed_version("x").as_deref(), Some("0.9.0"));
}

#[tokio::test]
async fn test_upgrade_unsatisfiable_mentions_installed_version() {
    let ws = Workspace::new();
    ws.preinstall(&meta("pkg-x", "1.0.0", &[]));
    let registry = StubRegistry::new(vec![meta("pkg-x", "2.0.0", &[])]);
    let opts = UpgradeOptions {
        version: Some(">=3.0.0".to_string()),
        ..ws.upgrade_options()
    };

    let report = upgrade("pkg-x", &opts, remote(&registry)).await;

    assert_eq!(report.result, Outcome::Failure);
    assert_eq!(
        report.error.unwrap().oneline,
        "Could not upgrade 'pkg-x' (v1.0.0 -> >=3.0.0); no version satisfies all dependencies"
    );
}

#[tokio::test]
async fn test_upgrade_failure_midway_lists_affected_modules() {
    let ws = Workspace::new();
    ws.preinstall(&meta("pkg-x", "1.0.0", &[("pkg-y", "1.x")]));
    ws.preinstall(&meta("pkg-y", "1.0.0", &[]));
    let staging = ws.tmp.path().join("staging");
    let registry = StubRegistry::with_unusable(
        vec![
            meta("pkg-x", "2.0.0", &[("pkg-y", ">= 1.1.0 < 2.0.0")]),
            meta("pkg-y", "1.1.0", &[]),
        ],
        &["pkg-x"],
        &staging,
    );

    let report = upgrade("pkg-x", &ws.upgrade_options(), remote(&registry)).await;

    assert_eq!(report.result, Outcome::Failure);
    let affected = report.affected_modules.as_ref().unwrap();
    assert_eq!(affected.len(), 1);
    assert_eq!(affected[0].name, "pkg-y");
    assert_eq!(affected[0].version, "1.1.0");
    assert!(report.installed_modules.is_none());
    assert_eq!(ws.installed_version("y").as_deref(), Some("1.1.0"));
    assert_eq!(ws.installed_version("x").as_deref(), Some("1.0.0"));
    assert_eq!(std::fs::read_dir(&staging).unwrap().count(), 0);
}

#[tokio::test]
async fn test_upgrade_unsatisfiable_names_culprits() {
    let ws = Workspace::new();
    ws.preinstall(&meta("pkg-x", "1.0.0", &[]));
    ws.preinstall(&meta("pkg-y", "1.0.0", &[]));
    let registry = StubRegistry::new(vec![
        meta("pkg-x", "2.0.0", &[("pkg-y", ">=2.0.0")]),
        meta("pkg-y", "2.0.0", &[]),
    ]);
    let opts = UpgradeOptions {
        version: Some(">=2.0.0".to_string()),
        ..ws.upgrade_options()
    };

    let report = upgrade("pkg-x", &opts, remote(&registry)).await;

    assert_eq!(report.result, Outcome::Failure);
    let error = report.error.unwrap();
    assert_eq!(
        error.oneline,
        "Could not upgrade 'pkg-x' (v1.0.0 -> >=2.0.0); no version satisfies all dependencies"
    );
    assert!(error.multiline.contains("across major versions"));
    assert!(error.multiline.contains("    - pkg-y"));
    assert!(!error.multiline.contains("    - pkg-x"));
    assert_eq!(registry.stage_count(), 0);
}

#[tokio::test]
async fn test_upgrade_without_published_releases() {
    let ws = Workspace::new();
    ws.preinstall(&meta("pkg-x", "1.0.0", &[]));
    let registry = StubRegistry::new(vec![meta("pkg-other", "1.0.0", &[])]);

    let report = upgrade("pkg-x", &ws.upgrade_options(), remote(&registry)).await;

    assert_eq!(report.result, Outcome::Failure);
    let error = report.error.unwrap();
    assert_eq!(
        error.oneline,
        "Could not upgrade 'pkg-x'; no releases are available from https://forge.test"
    );
    assert!(error.multiline.contains("Does 'pkg-x' have at least one published release?"));

    let opts = UpgradeOptions {
        version: Some("1.x".to_string()),
        ..ws.upgrade_options()
    };
    let report = upgrade("pkg-x", &opts, remote(&registry)).await;
    assert_eq!(
        report.error.unwrap().oneline,
        "Could not upgrade 'pkg-x'; no releases matching '1.x' are available from https://forge.test"
    );
}
