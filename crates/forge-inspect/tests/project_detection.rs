//! Project identity detection against descriptor files on disk.

use std::fs;

use forge_inspect::{detect_project_name, read_project_descriptor, InspectError};

fn descriptor(content: &[u8]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("CMakeLists.txt"), content).expect("write descriptor");
    dir
}

#[test]
fn test_detect_from_directory_and_file() {
    let dir = descriptor(b"project(Calculator LANGUAGES CXX)\n");
    assert_eq!(detect_project_name(dir.path()).as_deref(), Some("Calculator"));
    assert_eq!(
        detect_project_name(dir.path().join("CMakeLists.txt")).as_deref(),
        Some("Calculator")
    );
}

#[test]
fn test_nested_subdirectory_project() {
    let dir = descriptor(b"project(Root)\nadd_subdirectory(lib)\n");
    let lib = dir.path().join("lib");
    fs::create_dir(&lib).expect("mkdir");
    fs::write(lib.join("CMakeLists.txt"), "project(RootLib)\n").expect("write");

    assert_eq!(detect_project_name(dir.path()).as_deref(), Some("Root"));
    assert_eq!(detect_project_name(&lib).as_deref(), Some("RootLib"));
}

#[test]
fn test_utf8_bom_and_unicode_names() {
    let dir = descriptor("\u{feff}project(Café_App)\n".as_bytes());
    assert_eq!(detect_project_name(dir.path()).as_deref(), Some("Café_App"));
}

#[test]
fn test_invalid_utf8_yields_none() {
    let dir = descriptor(b"project(\xff\xfeBroken)\n");
    assert_eq!(detect_project_name(dir.path()), None);

    let err = read_project_descriptor(dir.path()).expect_err("invalid utf-8");
    assert!(matches!(err, InspectError::InvalidUtf8(_)));
}

#[test]
fn test_directory_without_descriptor() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert_eq!(detect_project_name(dir.path()), None);

    let err = read_project_descriptor(dir.path()).expect_err("missing");
    assert!(matches!(err, InspectError::DescriptorNotFound(_)));
}

#[test]
fn test_no_project_call() {
    let dir = descriptor(b"# just comments\nadd_library(x x.c)\n");
    assert_eq!(detect_project_name(dir.path()), None);
}
