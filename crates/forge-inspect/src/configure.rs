//! CMake configure-phase analysis.

use regex::Regex;
use tracing::debug;

use crate::model::ConfigureMetadata;
use crate::normalize::clean_lines;

const CACHE_ENTRY: &str = r"^(?:--\s+)?(?P<name>[A-Za-z_][A-Za-z0-9_.\-]*):(?P<type>BOOL|STRING|PATH|FILEPATH|INTERNAL|STATIC|UNINITIALIZED)=(?P<value>.*)$";
const FOUND_PACKAGE: &str = r"^--\s*Found\s+(?P<value>\w+):";

/// A scalar field of [`ConfigureMetadata`] filled from a marker line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    CmakeVersion,
    Generator,
    CompilerC,
    CompilerCxx,
    SystemName,
    SystemProcessor,
    BuildType,
}

const MARKERS: &[(Field, &str)] = &[
    (Field::CmakeVersion, r"^--\s*CMake version:\s*(?P<value>\S+)"),
    (Field::CmakeVersion, r"^cmake version\s+(?P<value>\S+)"),
    (Field::Generator, r"^--\s*Building for:\s*(?P<value>.*\S)"),
    (Field::Generator, r"^--\s*Generator:\s*(?P<value>.*\S)"),
    (Field::CompilerC, r"^--\s*The C compiler identification is\s+(?P<value>\w+)"),
    (Field::CompilerCxx, r"^--\s*The CXX compiler identification is\s+(?P<value>\w+)"),
    (Field::SystemName, r"^--\s*System:\s*(?P<value>\w+)"),
    (Field::SystemProcessor, r"^--\s*Processor:\s*(?P<value>\S+)"),
    (Field::BuildType, r"^--\s*Build type:\s*(?P<value>\w+)"),
];

/// Cache variables that back-fill a field no marker line provided.
const CACHE_FALLBACKS: &[(Field, &str)] = &[
    (Field::Generator, "CMAKE_GENERATOR"),
    (Field::SystemName, "CMAKE_SYSTEM_NAME"),
    (Field::SystemProcessor, "CMAKE_SYSTEM_PROCESSOR"),
    (Field::BuildType, "CMAKE_BUILD_TYPE"),
];

fn slot(meta: &mut ConfigureMetadata, field: Field) -> &mut Option<String> {
    match field {
        Field::CmakeVersion => &mut meta.cmake_version,
        Field::Generator => &mut meta.generator,
        Field::CompilerC => &mut meta.compiler_c,
        Field::CompilerCxx => &mut meta.compiler_cxx,
        Field::SystemName => &mut meta.system_name,
        Field::SystemProcessor => &mut meta.system_processor,
        Field::BuildType => &mut meta.build_type,
    }
}

/// Fill `target` with `value` unless it is already set or `value` is blank.
fn fill(target: &mut Option<String>, value: &str) {
    let value = value.trim();
    if target.is_none() && !value.is_empty() {
        *target = Some(value.to_string());
    }
}

/// Extracts toolchain metadata from configure output.
#[derive(Debug, Clone)]
pub struct ConfigureAnalyzer {
    markers: Vec<(Field, Regex)>,
    found_package: Regex,
    cache_entry: Regex,
}

impl Default for ConfigureAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigureAnalyzer {
    pub fn new() -> Self {
        Self {
            markers: MARKERS
                .iter()
                .map(|(field, pattern)| (*field, crate::builtin_regex(pattern)))
                .collect(),
            found_package: crate::builtin_regex(FOUND_PACKAGE),
            cache_entry: crate::builtin_regex(CACHE_ENTRY),
        }
    }

    /// Scan configure output in one pass.
    ///
    /// The first occurrence of each marker wins. Packages keep every mention in
    /// order; cache entries keep the last value seen per name.
    pub fn analyze(&self, text: &str) -> ConfigureMetadata {
        let mut meta = ConfigureMetadata::default();

        for line in clean_lines(text) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(caps) = self.found_package.captures(line) {
                meta.found_packages.push(caps["value"].to_string());
                continue;
            }

            if let Some((field, value)) = self.match_marker(line) {
                fill(slot(&mut meta, field), value);
                continue;
            }

            if let Some(caps) = self.cache_entry.captures(line) {
                meta.configuration_options
                    .insert(caps["name"].to_string(), caps["value"].trim().to_string());
            }
        }

        for (field, name) in CACHE_FALLBACKS {
            if let Some(value) = meta.configuration_options.get(*name).cloned() {
                fill(slot(&mut meta, *field), &value);
            }
        }
        if let Some(value) = meta.configuration_options.get("CMAKE_PROJECT_NAME").cloned() {
            fill(&mut meta.project_name, &value);
        }

        debug!(
            event = "inspect.configure",
            cmake_version = ?meta.cmake_version,
            generator = ?meta.generator,
            packages = meta.found_packages.len(),
            options = meta.configuration_options.len(),
        );

        meta
    }

    fn match_marker<'l>(&self, line: &'l str) -> Option<(Field, &'l str)> {
        self.markers.iter().find_map(|(field, regex)| {
            let value = regex.captures(line)?.name("value")?.as_str();
            Some((*field, value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(text: &str) -> ConfigureMetadata {
        ConfigureAnalyzer::new().analyze(text)
    }

    const GCC_CONFIGURE: &str = "\
-- The C compiler identification is GNU 11.4.0
-- The CXX compiler identification is GNU 11.4.0
-- Detecting C compiler ABI info
-- Detecting C compiler ABI info - done
-- Check for working C compiler: /usr/bin/cc - skipped
-- CMake version: 3.22.1
-- Building for: Ninja
-- System: Linux
-- Processor: x86_64
-- Build type: Release
-- Found Threads: TRUE
-- Found OpenSSL: /usr/lib/x86_64-linux-gnu/libcrypto.so (found version \"3.0.2\")
-- Found ZLIB: /usr/lib/x86_64-linux-gnu/libz.so (found version \"1.2.11\")
-- Configuring done
-- Generating done
-- Build files have been written to: /tmp/build
";

    #[test]
    fn test_full_configure_log() {
        let meta = analyze(GCC_CONFIGURE);
        assert_eq!(meta.cmake_version.as_deref(), Some("3.22.1"));
        assert_eq!(meta.generator.as_deref(), Some("Ninja"));
        assert_eq!(meta.compiler_c.as_deref(), Some("GNU"));
        assert_eq!(meta.compiler_cxx.as_deref(), Some("GNU"));
        assert_eq!(meta.system_name.as_deref(), Some("Linux"));
        assert_eq!(meta.system_processor.as_deref(), Some("x86_64"));
        assert_eq!(meta.build_type.as_deref(), Some("Release"));
        assert_eq!(meta.found_packages, vec!["Threads", "OpenSSL", "ZLIB"]);
    }

    #[test]
    fn test_generator_is_optional() {
        let meta = analyze("-- The C compiler identification is Clang 15.0.0\n-- Configuring done\n");
        assert!(meta.generator.is_none());
        assert_eq!(meta.compiler_c.as_deref(), Some("Clang"));
        assert!(meta.compiler_cxx.is_none());
    }

    #[test]
    fn test_generator_with_spaces() {
        let meta = analyze("-- Building for: Visual Studio 17 2022\n");
        assert_eq!(meta.generator.as_deref(), Some("Visual Studio 17 2022"));
    }

    #[test]
    fn test_msvc_compiler_identification() {
        let meta = analyze(
            "-- The C compiler identification is MSVC 19.38.33130.0\n-- The CXX compiler identification is MSVC 19.38.33130.0\n",
        );
        assert_eq!(meta.compiler_c.as_deref(), Some("MSVC"));
        assert_eq!(meta.compiler_cxx.as_deref(), Some("MSVC"));
    }

    #[test]
    fn test_found_packages_keep_duplicates_in_order() {
        let meta = analyze("-- Found ZLIB: /lib/libz.so\n-- Found Boost: /usr/include\n-- Found ZLIB: /lib/libz.so\n");
        assert_eq!(meta.found_packages, vec!["ZLIB", "Boost", "ZLIB"]);
    }

    #[test]
    fn test_first_marker_wins() {
        let meta = analyze("-- Build type: Debug\n-- Build type: Release\n");
        assert_eq!(meta.build_type.as_deref(), Some("Debug"));
    }

    #[test]
    fn test_cmake_version_banner() {
        let meta = analyze("cmake version 3.28.3\n\nCMake suite maintained and supported by Kitware (kitware.com/cmake).\n");
        assert_eq!(meta.cmake_version.as_deref(), Some("3.28.3"));
    }

    #[test]
    fn test_cache_entries_and_fallbacks() {
        let text = "\
CMAKE_BUILD_TYPE:STRING=RelWithDebInfo
-- CMAKE_GENERATOR:INTERNAL=Unix Makefiles
CMAKE_SYSTEM_NAME:STRING=Darwin
CMAKE_SYSTEM_PROCESSOR:STRING=arm64
CMAKE_PROJECT_NAME:STATIC=Widgets
BUILD_TESTING:BOOL=ON
BUILD_TESTING:BOOL=OFF
";
        let meta = analyze(text);
        assert_eq!(meta.build_type.as_deref(), Some("RelWithDebInfo"));
        assert_eq!(meta.generator.as_deref(), Some("Unix Makefiles"));
        assert_eq!(meta.system_name.as_deref(), Some("Darwin"));
        assert_eq!(meta.system_processor.as_deref(), Some("arm64"));
        assert_eq!(meta.project_name.as_deref(), Some("Widgets"));
        assert_eq!(meta.option("BUILD_TESTING"), Some("OFF"));
    }

    #[test]
    fn test_marker_takes_precedence_over_cache() {
        let meta = analyze("CMAKE_BUILD_TYPE:STRING=Debug\n-- Build type: Release\n");
        assert_eq!(meta.build_type.as_deref(), Some("Release"));
    }

    #[test]
    fn test_empty_cache_build_type_is_skipped() {
        let meta = analyze("CMAKE_BUILD_TYPE:STRING=\n");
        assert!(meta.build_type.is_none());
        assert_eq!(meta.option("CMAKE_BUILD_TYPE"), Some(""));
    }

    #[test]
    fn test_ansi_and_crlf() {
        let meta = analyze("\x1b[1m-- CMake version: 3.27.0\x1b[0m\r\n-- Found GTest: /opt/gtest\r\n");
        assert_eq!(meta.cmake_version.as_deref(), Some("3.27.0"));
        assert_eq!(meta.found_packages, vec!["GTest"]);
    }

    #[test]
    fn test_empty_and_unrelated_input() {
        assert!(analyze("").is_empty());
        assert!(analyze("random text\nnothing to see").is_empty());
    }
}
