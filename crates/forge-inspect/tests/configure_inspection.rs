//! Configure-phase inspection against captured CMake logs.

use forge_inspect::inspect_configure_output;

const LINUX_CONFIGURE: &str = "\
-- The C compiler identification is GNU 12.2.0
-- The CXX compiler identification is GNU 12.2.0
-- Detecting C compiler ABI info
-- Detecting C compiler ABI info - done
-- Check for working C compiler: /usr/bin/cc - skipped
-- Detecting CXX compiler ABI info - done
-- CMake version: 3.25.1
-- System: Linux
-- Processor: x86_64
-- Build type: Debug
-- Found Threads: TRUE
-- Found PkgConfig: /usr/bin/pkg-config (found version \"1.8.1\")
-- Found CURL: /usr/lib/x86_64-linux-gnu/libcurl.so (found version \"7.88.1\")
-- Configuring done
-- Generating done
-- Build files have been written to: /home/dev/project/build
";

const WINDOWS_CONFIGURE: &str = "\
-- Building for: Visual Studio 17 2022
-- Selecting Windows SDK version 10.0.22621.0 to target Windows 10.0.22631.
-- The C compiler identification is MSVC 19.38.33133.0\r
-- The CXX compiler identification is MSVC 19.38.33133.0\r
-- Found Python3: C:/Python311/python.exe (found version \"3.11.4\") found components: Interpreter
-- Configuring done (4.2s)
";

#[test]
fn test_linux_configure() {
    let meta = inspect_configure_output(LINUX_CONFIGURE);

    assert_eq!(meta.cmake_version.as_deref(), Some("3.25.1"));
    assert!(meta.generator.is_none());
    assert_eq!(meta.compiler_c.as_deref(), Some("GNU"));
    assert_eq!(meta.compiler_cxx.as_deref(), Some("GNU"));
    assert_eq!(meta.system_name.as_deref(), Some("Linux"));
    assert_eq!(meta.system_processor.as_deref(), Some("x86_64"));
    assert_eq!(meta.build_type.as_deref(), Some("Debug"));
    assert_eq!(meta.found_packages, vec!["Threads", "PkgConfig", "CURL"]);
    assert!(meta.project_name.is_none());
}

#[test]
fn test_windows_configure() {
    let meta = inspect_configure_output(WINDOWS_CONFIGURE);

    assert_eq!(meta.generator.as_deref(), Some("Visual Studio 17 2022"));
    assert_eq!(meta.compiler_c.as_deref(), Some("MSVC"));
    assert_eq!(meta.compiler_cxx.as_deref(), Some("MSVC"));
    assert_eq!(meta.found_packages, vec!["Python3"]);
    assert!(meta.build_type.is_none());
    assert!(meta.system_name.is_none());
}

#[test]
fn test_missing_markers_are_absent_not_errors() {
    let meta = inspect_configure_output("CMake Error at CMakeLists.txt:3 (project):\n  oops\n");
    assert!(meta.cmake_version.is_none());
    assert!(meta.compiler_c.is_none());
    assert!(meta.found_packages.is_empty());
}

#[test]
fn test_configure_json_contract() {
    let meta = inspect_configure_output(LINUX_CONFIGURE);
    let json = serde_json::to_value(&meta).expect("serialize");
    assert_eq!(json["compiler_cxx"], "GNU");
    assert_eq!(json["found_packages"][2], "CURL");
    assert!(json["configuration_options"].as_object().expect("map").is_empty());
}
