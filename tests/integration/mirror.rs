//! Index mirror overrides for `lock` and `sync`

use predicates::prelude::*;

use crate::common::{TestProject, assert_exists};
use pinsync::lockfile::LockFile;
use pinsync::test_utils::IndexFixture;

/// A project whose declared index does not exist, plus a mirror that has the packages
fn mirrored_project() -> (TestProject, IndexFixture, String) {
    let test = TestProject::new().unwrap();
    let mirror = IndexFixture::new(test.scratch("mirror")).unwrap();
    mirror.publish("six", "1.16.0", &[], &[("six.py", "# six")]).unwrap();

    let declared = format!("file://{}", test.scratch("declared-but-missing").display());
    test.project
        .write_raw_manifest(&format!("[[index]]\nname = \"main\"\nurl = \"{declared}\"\n\n[packages]\nsix = \"*\"\n"))
        .unwrap();
    (test, mirror, declared)
}

#[test]
fn test_lock_without_mirror_reports_unreachable_index() {
    let (test, _mirror, _declared) = mirrored_project();
    test.pinsync().arg("lock").assert().failure().stderr(predicate::str::contains("Cannot reach index 'main'"));
}

#[test]
fn test_lock_with_mirror_flag_records_declared_index() {
    let (test, mirror, declared) = mirrored_project();

    test.pinsync().args(["lock", "--index-mirror", &mirror.url()]).assert().success();

    let lockfile = LockFile::load(&test.project.lock_path()).unwrap();
    assert_eq!(lockfile.meta.indexes.len(), 1);
    assert_eq!(lockfile.meta.indexes[0].url, declared);
    assert!(!String::from_utf8(test.lock_bytes()).unwrap().contains(&mirror.url()));
}

#[test]
fn test_sync_with_mirror_environment_variable() {
    let (test, mirror, _declared) = mirrored_project();
    test.pinsync().arg("lock").env("PINSYNC_INDEX_MIRROR", mirror.url()).assert().success();

    test.pinsync().arg("sync").assert().failure();
    test.pinsync().arg("sync").env("PINSYNC_INDEX_MIRROR", mirror.url()).assert().success();
    assert_exists(test.project.default_target().join("six.py"));
}

#[test]
fn test_mirror_from_global_config() {
    let (test, mirror, _declared) = mirrored_project();
    let config = test.scratch("global.toml");
    std::fs::write(&config, format!("index_mirror = \"{}\"\n", mirror.url())).unwrap();

    test.pinsync().arg("lock").env("PINSYNC_CONFIG", &config).assert().success();
    test.pinsync().args(["--config", config.to_str().unwrap(), "sync"]).assert().success();
}
