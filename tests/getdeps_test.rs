//! Integration tests for `spackdev getdeps`

mod common;

use common::{stderr, stdout, TestArea};

#[test]
fn test_getdeps_reports_missing_package_manager() {
    let area = TestArea::new();
    area.write_config("spack = \"/nonexistent/bin/spack\"\n");

    let output = area.run(&["getdeps"]);
    assert!(!output.status.success());
    assert!(stdout(&output).contains("requesting install of dependencies for: art canvas"));
    assert!(stderr(&output).contains("/nonexistent/bin/spack"));
}

#[cfg(unix)]
#[test]
fn test_getdeps_installs_recorded_dependencies() {
    let area = TestArea::new();
    let log = area.path().join("spack.log");
    let fake = area.path().join("fake-spack");
    std::fs::write(&fake, format!("#!/bin/sh\necho \"$@\" >> '{}'\n", log.display())).unwrap();
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    area.write_config(&format!("spack = \"{}\"\n", fake.display()));

    let output = area.run(&["getdeps"]);
    assert!(output.status.success(), "getdeps failed: {}", stderr(&output));
    let calls = std::fs::read_to_string(&log).unwrap();
    assert!(calls.contains("install"));
    assert!(calls.contains("boost@1.75"));
    assert!(!calls.contains("art@"));
}
