use modkit_core::metadata::{load_checksums, ModuleMetadata, ANY_VERSION};
use tempfile::TempDir;

const STDLIB: &str = r#"{
  "name": "puppetlabs/stdlib",
  "version": "4.1.0",
  "author": "puppetlabs",
  "summary": "Standard library",
  "dependencies": [
    { "name": "puppetlabs/concat", "version_requirement": ">= 1.0.0 < 2.0.0" },
    { "name": "puppetlabs-firewall" }
  ],
  "requirements": [
    { "name": "pe", "version_requirement": "3.x" }
  ]
}"#;

#[test]
fn test_parse_metadata_fields() {
    let meta = ModuleMetadata::from_json(STDLIB).unwrap();
    assert_eq!(meta.full_name(), "puppetlabs-stdlib");
    assert_eq!(meta.version, "4.1.0");
    assert_eq!(meta.summary.as_deref(), Some("Standard library"));
    assert_eq!(meta.dependencies.len(), 2);
}

#[test]
fn test_dependency_requirements_normalized_and_defaulted() {
    let meta = ModuleMetadata::from_json(STDLIB).unwrap();
    let deps = meta.dependency_requirements();
    assert_eq!(deps["puppetlabs-concat"], ">= 1.0.0 < 2.0.0");
    assert_eq!(deps["puppetlabs-firewall"], ANY_VERSION);
}

#[test]
fn test_camel_case_requirement_alias() {
    let meta = ModuleMetadata::from_json(
        r#"{"name": "a-b", "version": "1.0.0",
            "dependencies": [{"name": "a-c", "versionRequirement": "1.x"}]}"#,
    )
    .unwrap();
    assert_eq!(meta.dependency_requirements()["a-c"], "1.x");
}

#[test]
fn test_host_requirement_case_insensitive() {
    let meta = ModuleMetadata::from_json(STDLIB).unwrap();
    assert_eq!(meta.host_requirement("PE"), Some("3.x"));
    assert_eq!(meta.host_requirement("foss"), None);
}

#[test]
fn test_missing_name_is_error() {
    let err = ModuleMetadata::from_json(r#"{"name": "", "version": "1.0.0"}"#).unwrap_err();
    assert!(err.to_string().contains("no module name"), "got: {err}");
}

#[test]
fn test_from_dir_reads_metadata() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("metadata.json"), STDLIB).unwrap();
    let meta = ModuleMetadata::from_dir(tmp.path()).unwrap();
    assert_eq!(meta.name, "puppetlabs/stdlib");
}

#[test]
fn test_from_dir_missing_metadata_errors() {
    let tmp = TempDir::new().unwrap();
    assert!(ModuleMetadata::from_dir(tmp.path()).is_err());
}

#[test]
fn test_load_checksums() {
    let tmp = TempDir::new().unwrap();
    assert!(load_checksums(tmp.path()).unwrap().is_none());

    std::fs::write(
        tmp.path().join("checksums.json"),
        r#"{"manifests/init.pp": "5d41402abc4b2a76b9719d911017c592"}"#,
    )
    .unwrap();
    let sums = load_checksums(tmp.path()).unwrap().unwrap();
    assert_eq!(sums["manifests/init.pp"], "5d41402abc4b2a76b9719d911017c592");
}
