//! Integration tests for `spackdev stage`

mod common;

use assert_fs::fixture::ChildPath;
use assert_fs::prelude::*;
use common::{stderr, stdout, TestArea};
use predicates::prelude::*;

#[test]
fn test_stage_rejects_non_development_package() {
    let area = TestArea::new();
    let output = area.run(&["stage", "boost"]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("'boost' is not in the list of development area packages"), "{err}");
    assert!(err.contains("art canvas"));
}

#[test]
fn test_already_staged_sources_are_kept() {
    let area = TestArea::new();
    area.create_file("srcs/art/CMakeLists.txt", "project(art)\n");
    area.create_file("srcs/canvas/CMakeLists.txt", "project(canvas)\n");

    let output = area.run(&["stage"]);
    assert!(output.status.success(), "stage failed: {}", stderr(&output));
    let out = stdout(&output);
    assert!(predicate::str::contains("art is already staged").eval(&out));
    assert!(predicate::str::contains("canvas is already staged").eval(&out));

    let srcs = ChildPath::new(area.path().join("srcs"));
    srcs.child("art/CMakeLists.txt")
        .assert(predicate::str::contains("project(art)").from_utf8().from_file_path());
    srcs.child("spack-expanded-archive").assert(predicate::path::missing());
}

#[test]
fn test_stage_with_modified_fragments() {
    let area = TestArea::new();
    area.create_file("spackdev-aux/specs/boost.json", "{}");
    let output = area.run(&["stage"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("redo from start"));
}
