//! `PINSYNC_TARGET` handling across invocations

use crate::common::{TestProject, assert_exists, assert_not_exists};

#[test]
fn test_target_override_applies_then_reverts_when_unset() {
    let test = TestProject::with_sample_packages().unwrap();
    test.lock();
    let custom = test.scratch("custom-site");

    test.pinsync().arg("sync").env("PINSYNC_TARGET", &custom).assert().success();
    for file in ["six.py", "requests/__init__.py", "requests/api.py", "idna/__init__.py"] {
        assert_exists(custom.join(file));
    }
    assert_not_exists(test.project.default_target());

    test.pinsync().arg("sync").assert().success();
    assert_exists(test.project.default_target().join("six.py"));
}

#[test]
fn test_relative_target_is_resolved_against_project() {
    let test = TestProject::with_sample_packages().unwrap();
    test.lock();

    test.pinsync().arg("sync").env("PINSYNC_TARGET", "vendor/lib").assert().success();
    assert_exists(test.project_path().join("vendor/lib/six.py"));
}

#[test]
fn test_empty_target_override_means_default() {
    let test = TestProject::with_sample_packages().unwrap();
    test.lock();

    test.pinsync().arg("sync").env("PINSYNC_TARGET", "").assert().success();
    assert_exists(test.project.default_target().join("six.py"));
}
