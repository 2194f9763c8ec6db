use modkit_util::fs::{copy_dir_all, ensure_dir, replace_dir};
use tempfile::TempDir;

#[test]
fn test_ensure_dir_creates_nested() {
    let tmp = TempDir::new().unwrap();
    let nested = tmp.path().join("a").join("b").join("c");
    ensure_dir(&nested).unwrap();
    assert!(nested.is_dir());
}

#[test]
fn test_ensure_dir_existing_ok() {
    let tmp = TempDir::new().unwrap();
    ensure_dir(tmp.path()).unwrap();
    assert!(tmp.path().is_dir());
}

#[test]
fn test_replace_dir_into_empty_parent() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("staged");
    std::fs::create_dir(&source).unwrap();
    std::fs::write(source.join("metadata.json"), "{}").unwrap();

    let target = tmp.path().join("modules").join("stdlib");
    replace_dir(&source, &target).unwrap();

    assert!(target.join("metadata.json").is_file());
    assert!(!source.exists());
}

#[test]
fn test_replace_dir_overwrites_previous_contents() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("stdlib");
    std::fs::create_dir(&target).unwrap();
    std::fs::write(target.join("old.txt"), "old").unwrap();

    let source = tmp.path().join("staged");
    std::fs::create_dir(&source).unwrap();
    std::fs::write(source.join("new.txt"), "new").unwrap();

    replace_dir(&source, &target).unwrap();

    assert!(target.join("new.txt").is_file());
    assert!(!target.join("old.txt").exists());
    // Only the replaced directory remains; the aside copy is gone.
    let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("stdlib")]);
}

#[test]
fn test_replace_dir_missing_source_restores_previous() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("stdlib");
    std::fs::create_dir(&target).unwrap();
    std::fs::write(target.join("keep.txt"), "keep").unwrap();

    let result = replace_dir(&tmp.path().join("does-not-exist"), &target);

    assert!(result.is_err());
    assert!(target.join("keep.txt").is_file());
}

#[test]
fn test_copy_dir_all_recurses() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("src");
    std::fs::create_dir_all(source.join("manifests")).unwrap();
    std::fs::write(source.join("manifests").join("init.pp"), "class x {}").unwrap();

    let target = tmp.path().join("dst");
    copy_dir_all(&source, &target).unwrap();

    assert_eq!(
        std::fs::read_to_string(target.join("manifests").join("init.pp")).unwrap(),
        "class x {}"
    );
}
