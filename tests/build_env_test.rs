//! Integration tests for `spackdev build-env`

mod common;

use common::{stderr, stdout, TestArea};

#[test]
fn test_unknown_package() {
    let area = TestArea::new();
    let output = area.run(&["build-env", "ghost", "true"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Unable to find environment for 'ghost'"));
}

#[test]
fn test_outside_area() {
    let area = TestArea::empty();
    let output = area.run(&["build-env", "art", "true"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Unable to find a development area"));
}

#[cfg(unix)]
#[test]
fn test_command_sees_package_environment() {
    let area = TestArea::new();
    area.write_package_env("art", &[("SPACKDEV_TEST_VALUE", "from-art"), ("SPACK_PREFIX", "/x")]);
    let output = area.run(&[
        "build-env",
        "art",
        "sh",
        "-c",
        "echo \"$SPACKDEV_TEST_VALUE $SPACK_PREFIX\"",
    ]);
    assert!(output.status.success(), "build-env failed: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "from-art /x");
}

#[cfg(unix)]
#[test]
fn test_exit_status_passed_through() {
    let area = TestArea::new();
    area.write_package_env("art", &[("SPACK_PREFIX", "/x")]);
    let output = area.run(&["build-env", "art", "sh", "-c", "exit 3"]);
    assert_eq!(output.status.code(), Some(3));
}

#[cfg(unix)]
#[test]
fn test_cd_into_build_directory() {
    let area = TestArea::new();
    area.write_package_env("art", &[("SPACK_PREFIX", "/x")]);
    let build_dir = area.layout().package_build_dir("art");
    std::fs::create_dir_all(&build_dir).unwrap();

    let output = area.run(&["build-env", "--cd", "--", "art", "pwd", "-P"]);
    assert!(output.status.success(), "build-env failed: {}", stderr(&output));
    assert_eq!(
        std::path::PathBuf::from(stdout(&output).trim()),
        build_dir.canonicalize().unwrap()
    );
}
