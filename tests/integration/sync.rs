//! `pinsync sync` behavior

use predicates::prelude::*;

use crate::common::{TestProject, assert_exists, assert_not_exists};
use pinsync::core::Category;
use pinsync::lockfile::LockFile;

#[test]
fn test_sync_installs_default_category() {
    let test = TestProject::with_sample_packages().unwrap();
    test.lock();

    test.pinsync().arg("sync").assert().success().stdout(predicate::str::contains("Synced 3 packages"));

    let target = test.project.default_target();
    assert_exists(target.join("six.py"));
    assert_exists(target.join("requests/api.py"));
    assert_exists(target.join("idna/__init__.py"));
    assert_exists(target.join("six-1.16.0.pinsync-info/RECORD"));
    assert_not_exists(target.join("pytest.py"));
}

#[test]
fn test_sync_dev_adds_develop_category() {
    let test = TestProject::with_sample_packages().unwrap();
    test.lock();

    test.pinsync().args(["sync", "--dev"]).assert().success();
    assert_exists(test.project.default_target().join("pytest.py"));
}

/// Editing the manifest without re-locking must not touch the lock artifact
#[test]
fn test_sync_never_writes_the_lock_artifact() {
    let test = TestProject::with_sample_packages().unwrap();
    test.lock();
    let before = test.lock_bytes();

    test.project.write_manifest(&test.index, &[("requests", "*"), ("pytest", "*")], &[]).unwrap();
    test.pinsync()
        .arg("sync")
        .assert()
        .success()
        .stderr(predicate::str::contains("out of date"));

    assert_eq!(test.lock_bytes(), before);
    assert_not_exists(test.project.default_target().join("pytest.py"));
}

#[test]
fn test_sync_without_lock_fails_with_specific_message() {
    let test = TestProject::with_sample_packages().unwrap();

    test.pinsync()
        .arg("sync")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("pinsync.lock not found!"));
    assert_not_exists(test.project.lock_path());
}

#[test]
fn test_sequential_sync_reports_hash_mismatch_for_package() {
    let test = TestProject::with_sample_packages().unwrap();
    test.lock();

    let mut lockfile = LockFile::load(&test.project.lock_path()).unwrap();
    lockfile.category_mut(Category::Default).get_mut("six").unwrap().hashes =
        vec![format!("sha256:{}", "0".repeat(64))];
    lockfile.save(&test.project.lock_path()).unwrap();

    test.pinsync()
        .args(["sync", "--sequential"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Checksum mismatch for package 'six'"))
        .stderr(predicate::str::contains("Failed to install 1 package(s): six"));
    assert_not_exists(test.project.default_target().join("six.py"));
}

#[test]
fn test_keep_going_installs_everything_else() {
    let test = TestProject::with_sample_packages().unwrap();
    test.lock();

    let mut lockfile = LockFile::load(&test.project.lock_path()).unwrap();
    lockfile.category_mut(Category::Default).get_mut("idna").unwrap().hashes =
        vec![format!("sha256:{}", "f".repeat(64))];
    lockfile.save(&test.project.lock_path()).unwrap();

    test.pinsync()
        .args(["sync", "--sequential", "--keep-going"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("idna"));
    assert_exists(test.project.default_target().join("six.py"));
    assert_exists(test.project.default_target().join("requests/api.py"));
}

/// Verbose sequential sync prints one success line per default package
#[test]
fn test_verbose_sequential_sync_lists_each_package() {
    let test = TestProject::with_sample_packages().unwrap();
    test.lock();

    let output = test.pinsync().args(["--verbose", "sync", "--sequential"]).output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> =
        stdout.lines().filter(|line| line.starts_with("Successfully installed")).collect();
    assert_eq!(
        lines,
        vec![
            "Successfully installed idna 3.4.0",
            "Successfully installed requests 2.31.0",
            "Successfully installed six 1.16.0",
        ]
    );
}

#[test]
fn test_second_sync_is_up_to_date() {
    let test = TestProject::with_sample_packages().unwrap();
    test.lock();
    test.pinsync().arg("sync").assert().success();

    test.pinsync()
        .args(["--verbose", "sync"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Successfully installed six 1.16.0 (up to date)"))
        .stdout(predicate::str::contains("(0 changed)"));
}

#[test]
fn test_upgrade_removes_files_the_new_version_dropped() {
    let test = TestProject::with_sample_packages().unwrap();
    test.project.write_manifest(&test.index, &[("six", "==1.15.0")], &[]).unwrap();
    test.index.publish("six", "1.15.0", &[], &[("six.py", "# six 1.15"), ("six_legacy.py", "")]).unwrap();
    test.lock();
    test.pinsync().arg("sync").assert().success();
    assert_exists(test.project.default_target().join("six_legacy.py"));

    test.project.write_manifest(&test.index, &[("six", "*")], &[]).unwrap();
    test.lock();
    test.pinsync().arg("sync").assert().success();

    let target = test.project.default_target();
    assert_not_exists(target.join("six_legacy.py"));
    assert_not_exists(target.join("six-1.15.0.pinsync-info"));
    assert_eq!(std::fs::read_to_string(target.join("six.py")).unwrap(), "# six 1.16");
}
