//! Build-target extraction across Ninja, Make and MSBuild output.
//!
//! Targets are returned in the order their completion markers appear in the
//! text. For parallel builds that is the true completion order, so step
//! numbers are recorded but never used for sorting.

use std::collections::HashSet;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::model::{BuildTarget, TargetType};
use crate::normalize::clean_lines;

const LINK_KINDS: &str = "static library|shared library|shared module|executable";

const NINJA_LINK: &str = r"^\[(?P<step>\d+)/(?P<total>\d+)\]\s+Linking\s+\w+\s+(?P<kind>KINDS)\s+(?P<name>.+)$";
const MAKE_LINK: &str = r"^\[\s*(?P<pct>\d+)%\]\s+Linking\s+\w+\s+(?P<kind>KINDS)\s+(?P<name>.+)$";
const PLAIN_LINK: &str = r"^Linking\s+\w+\s+(?P<kind>KINDS)\s+(?P<name>.+)$";
const BUILT_TARGET: &str = r"^(?:\[\s*(?P<pct>\d+)%\]\s+)?Built target\s+(?P<name>.+)$";
const MSBUILD_OUTPUT: &str = r"^\S.*?\.vcxproj\s*->\s*(?P<path>.+)$";
const COMPILE_STEP: &str = r"^(?:\[[^\]]*\]\s*)?Building\s+\w+\s+object\s";

/// Names that never denote a produced artifact.
const PSEUDO_TARGETS: &[&str] = &["clean"];

/// Build tool whose completion marker matched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuildDialect {
    Ninja,
    Make,
    Msvc,
}

/// What a matching line says about a target.
#[derive(Debug)]
enum TargetEvent {
    /// A link step finished: the target is produced.
    Completed(BuildTarget),
    /// Make's `Built target X`: confirms X, possibly already reported.
    Confirmed { name: String, percent: Option<u8> },
}

type ExtractFn = fn(&Captures<'_>) -> Option<TargetEvent>;

#[derive(Debug)]
struct TargetPattern {
    dialect: BuildDialect,
    regex: Regex,
    extract: ExtractFn,
}

fn link_target(caps: &Captures<'_>) -> Option<BuildTarget> {
    let target_type = TargetType::from_link_keyword(caps.name("kind")?.as_str())?;
    let name = clean_name(caps.name("name")?.as_str())?;
    Some(BuildTarget::new(name, target_type))
}

fn percent(caps: &Captures<'_>) -> Option<u8> {
    let pct: u32 = caps.name("pct")?.as_str().parse().ok()?;
    Some(pct.min(100) as u8)
}

fn extract_ninja_link(caps: &Captures<'_>) -> Option<TargetEvent> {
    let target = link_target(caps)?;
    let step = caps.name("step")?.as_str().parse().ok();
    let total = caps.name("total")?.as_str().parse().ok();
    let target = match (step, total) {
        (Some(step), Some(total)) => target.with_steps(step, total),
        _ => target,
    };
    Some(TargetEvent::Completed(target))
}

fn extract_make_link(caps: &Captures<'_>) -> Option<TargetEvent> {
    let target = link_target(caps)?;
    let target = match percent(caps) {
        Some(pct) => target.with_progress_percent(pct),
        None => target,
    };
    Some(TargetEvent::Completed(target))
}

fn extract_plain_link(caps: &Captures<'_>) -> Option<TargetEvent> {
    link_target(caps).map(TargetEvent::Completed)
}

fn extract_built_target(caps: &Captures<'_>) -> Option<TargetEvent> {
    Some(TargetEvent::Confirmed {
        name: clean_name(caps.name("name")?.as_str())?,
        percent: percent(caps),
    })
}

fn extract_msbuild_output(caps: &Captures<'_>) -> Option<TargetEvent> {
    let name = clean_name(file_name(caps.name("path")?.as_str().trim().trim_matches('"')))?;
    let (_, ext) = name.rsplit_once('.')?;
    let target_type = TargetType::from_extension(ext)?;
    Some(TargetEvent::Completed(BuildTarget::new(name, target_type)))
}

fn clean_name(raw: &str) -> Option<String> {
    let name = raw.trim().trim_matches(|c| c == '"' || c == '\'');
    (!name.is_empty()).then(|| name.to_string())
}

/// Final path component, accepting both separators.
fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Split a versioned or plain artifact extension off a file name.
fn split_artifact_extension(name: &str) -> (&str, Option<TargetType>) {
    if let Some(pos) = name.find(".so.") {
        return (&name[..pos], Some(TargetType::SharedLibrary));
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => match TargetType::from_extension(ext) {
            Some(t) => (stem, Some(t)),
            None => (name, None),
        },
        _ => (name, None),
    }
}

/// Identity shared by a link line and its `Built target` confirmation:
/// `libmylib.a`, `mylib.lib` and `mylib` all map to `mylib`.
pub fn identity_key(name: &str) -> String {
    let (stem, _) = split_artifact_extension(file_name(name));
    match stem.strip_prefix("lib") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => stem.to_string(),
    }
}

/// Classify a target known only by name: extension first, then a `lib`
/// prefix, otherwise an executable.
pub fn classify_name(name: &str) -> TargetType {
    let base = file_name(name);
    match split_artifact_extension(base) {
        (_, Some(t)) => t,
        _ if base.len() > 3 && base.starts_with("lib") => TargetType::StaticLibrary,
        _ => TargetType::Executable,
    }
}

fn is_pseudo_target(name: &str) -> bool {
    PSEUDO_TARGETS.contains(&name)
}

fn has_target_marker(line: &str) -> bool {
    line.contains("Linking") || line.contains("Built target") || line.contains(".vcxproj")
}

/// Recognises "target completed" markers and preserves their order.
#[derive(Debug)]
pub struct TargetExtractor {
    patterns: Vec<TargetPattern>,
    compile_step: Regex,
}

impl Default for TargetExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetExtractor {
    pub fn new() -> Self {
        let table: [(BuildDialect, &str, ExtractFn); 5] = [
            (BuildDialect::Ninja, NINJA_LINK, extract_ninja_link),
            (BuildDialect::Make, MAKE_LINK, extract_make_link),
            (BuildDialect::Ninja, PLAIN_LINK, extract_plain_link),
            (BuildDialect::Make, BUILT_TARGET, extract_built_target),
            (BuildDialect::Msvc, MSBUILD_OUTPUT, extract_msbuild_output),
        ];

        Self {
            patterns: table
                .into_iter()
                .map(|(dialect, pattern, extract)| TargetPattern {
                    dialect,
                    regex: crate::builtin_regex(&pattern.replace("KINDS", LINK_KINDS)),
                    extract,
                })
                .collect(),
            compile_step: crate::builtin_regex(COMPILE_STEP),
        }
    }

    /// Extract completed targets in appearance order.
    ///
    /// `Built target X` is dropped when a target with the same identity key was
    /// already reported; the `clean` pseudo-target is always excluded.
    pub fn extract_targets(&self, text: &str) -> Vec<BuildTarget> {
        let mut targets = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for line in clean_lines(text) {
            let Some((dialect, event)) = self.match_line(&line) else {
                continue;
            };

            match event {
                TargetEvent::Completed(target) => {
                    if is_pseudo_target(&target.name) {
                        continue;
                    }
                    tracing::trace!(?dialect, name = %target.name, "target completed");
                    seen.insert(identity_key(&target.name));
                    targets.push(target);
                }
                TargetEvent::Confirmed { name, percent } => {
                    if is_pseudo_target(&name) || !seen.insert(identity_key(&name)) {
                        continue;
                    }
                    let mut target = BuildTarget::new(name.clone(), classify_name(&name));
                    if let Some(pct) = percent {
                        target = target.with_progress_percent(pct);
                    }
                    targets.push(target);
                }
            }
        }

        targets
    }

    /// Number of `Building <LANG> object` steps in the output.
    pub fn count_compiled_files(&self, text: &str) -> u32 {
        let count = clean_lines(text)
            .filter(|line| line.contains("Building") && self.compile_step.is_match(line.trim()))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn match_line(&self, line: &str) -> Option<(BuildDialect, TargetEvent)> {
        if !has_target_marker(line) {
            return None;
        }
        let line = line.trim();

        self.patterns.iter().find_map(|pattern| {
            let caps = pattern.regex.captures(line)?;
            Some((pattern.dialect, (pattern.extract)(&caps)?))
        })
    }
}
