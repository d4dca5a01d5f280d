//! `pinsync lock` behavior

use predicates::prelude::*;

use crate::common::{TestProject, assert_not_exists};
use pinsync::core::Category;
use pinsync::lockfile::LockFile;

/// Two consecutive locks against an unchanged index produce identical bytes
#[test]
fn test_lock_is_byte_identical_across_runs() {
    pinsync::test_utils::init_test_logging(None);
    let test = TestProject::with_sample_packages().unwrap();

    test.lock();
    let first = test.lock_bytes();
    test.pinsync().arg("lock").assert().success().stdout(predicate::str::contains("Up to date"));
    assert_eq!(test.lock_bytes(), first);
}

#[test]
fn test_lock_records_closure_per_category() {
    let test = TestProject::with_sample_packages().unwrap();
    test.lock();

    let lockfile = LockFile::load(&test.project.lock_path()).unwrap();
    let default = lockfile.category(Category::Default).unwrap();
    assert_eq!(default.keys().collect::<Vec<_>>(), vec!["idna", "requests", "six"]);
    assert_eq!(default["six"].version, "1.16.0");
    assert!(default["six"].hashes.iter().all(|h| h.starts_with("sha256:")));

    let develop = lockfile.category(Category::Develop).unwrap();
    assert_eq!(develop.keys().collect::<Vec<_>>(), vec!["pytest"]);
}

#[test]
fn test_unsatisfiable_requirements_write_nothing() {
    let test = TestProject::with_sample_packages().unwrap();
    test.project.write_manifest(&test.index, &[("requests", "*"), ("six", "<1.10")], &[]).unwrap();

    test.pinsync()
        .arg("lock")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot resolve dependencies").and(predicate::str::contains("six")));
    assert_not_exists(test.project.lock_path());
}

#[test]
fn test_unknown_package_fails() {
    let test = TestProject::with_sample_packages().unwrap();
    test.project.write_manifest(&test.index, &[("no-such-package", "*")], &[]).unwrap();

    test.pinsync()
        .arg("lock")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no-such-package"));
    assert_not_exists(test.project.lock_path());
}

#[test]
fn test_missing_manifest_fails() {
    let test = TestProject::new().unwrap();
    test.pinsync().arg("lock").assert().failure().stderr(predicate::str::contains("pinsync.toml"));
}

#[test]
fn test_empty_manifest_locks_empty_categories() {
    let test = TestProject::new().unwrap();
    test.project.write_manifest(&test.index, &[], &[]).unwrap();
    test.lock();

    let lockfile = LockFile::load(&test.project.lock_path()).unwrap();
    assert_eq!(lockfile.package_count(), 0);

    test.pinsync().arg("sync").assert().success();
}
