//! Compiler diagnostic extraction.
//!
//! Each line is tried against a dialect pattern table in priority order:
//! GCC/Clang located diagnostics, MSVC located diagnostics, MSVC tool-level
//! diagnostics (linker, driver), and finally a bare `warning:`/`error:` token.
//! The first pattern that matches owns the line, so a located diagnostic of the
//! other kind (or a `note:`) never falls through to the bare fallback.

use std::borrow::Cow;
use std::collections::HashSet;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::model::{Diagnostic, DiagnosticKind};
use crate::normalize::clean_lines;

/// Maximum number of continuation lines captured as evidence.
pub const MAX_EVIDENCE_LINES: usize = 3;

const GCC_CLANG: &str = r"^(?P<file>\S.*?):(?P<line>\d+)(?::(?P<col>\d+))?:\s*(?P<level>fatal error|error|warning|note|remark):\s*(?P<msg>.*)$";
const MSVC: &str = r"^(?P<file>\S.*?)\((?P<line>\d+)(?:,(?P<col>\d+))?(?:,\d+,\d+)?\)\s*:\s*(?P<level>fatal error|error|warning|note)(?:\s+(?P<code>[A-Za-z]+\d+))?\s*:\s*(?P<msg>.*)$";
const MSVC_TOOL: &str = r"^\S.*?\s*:\s*(?:Command line\s+)?(?P<level>fatal error|error|warning)\s+(?P<code>[A-Z]+\d+)\s*:\s*(?P<msg>.*)$";
const BARE: &str = r"(?:^|[^\w-])(?P<level>fatal error|error|warning):\s*(?P<msg>.*)$";

const TRAILING_FLAG: &str = r"^(?P<body>.*?)\s*\[(?P<flag>[^\s\[\]]+)\]$";
const MSBUILD_PROJECT_SUFFIX: &str = r"\s*\[[^\[\]]*\.vcxproj\]$";

/// Textual convention a diagnostic line was recognised in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticDialect {
    /// `file:line[:col]: warning: message [-Wflag]`
    GccClang,
    /// `file(line[,col]): warning C4101: message`
    Msvc,
    /// `LINK : fatal error LNK1104: message`
    MsvcTool,
    /// `ld: warning: message`
    Bare,
}

/// Severity as written on the line, before folding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Note,
    Warning,
    Error,
}

impl Level {
    fn parse(s: &str) -> Self {
        match s {
            "warning" => Level::Warning,
            "error" | "fatal error" => Level::Error,
            _ => Level::Note,
        }
    }

    fn kind(self) -> Option<DiagnosticKind> {
        match self {
            Level::Warning => Some(DiagnosticKind::Warning),
            Level::Error => Some(DiagnosticKind::Error),
            Level::Note => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Note => "note",
        }
    }
}

/// Fields captured from one matching line.
#[derive(Debug)]
struct LineMatch {
    level: Level,
    file: Option<String>,
    line: Option<u32>,
    column: Option<u32>,
    message: String,
    code: Option<String>,
}

type ExtractFn = fn(&Captures<'_>) -> Option<LineMatch>;

/// One row of the dialect table.
#[derive(Debug)]
struct DiagnosticPattern {
    dialect: DiagnosticDialect,
    regex: Regex,
    extract: ExtractFn,
}

fn capture_u32(caps: &Captures<'_>, name: &str) -> Option<u32> {
    caps.name(name).and_then(|m| m.as_str().parse().ok())
}

fn capture_string(caps: &Captures<'_>, name: &str) -> Option<String> {
    caps.name(name).map(|m| m.as_str().trim().to_string())
}

fn extract_located(caps: &Captures<'_>) -> Option<LineMatch> {
    Some(LineMatch {
        level: Level::parse(caps.name("level")?.as_str()),
        file: capture_string(caps, "file"),
        line: Some(capture_u32(caps, "line")?),
        column: capture_u32(caps, "col"),
        message: capture_string(caps, "msg").unwrap_or_default(),
        code: capture_string(caps, "code"),
    })
}

fn extract_unlocated(caps: &Captures<'_>) -> Option<LineMatch> {
    Some(LineMatch {
        level: Level::parse(caps.name("level")?.as_str()),
        file: None,
        line: None,
        column: None,
        message: capture_string(caps, "msg").unwrap_or_default(),
        code: capture_string(caps, "code"),
    })
}

/// Turn a bracketed compiler flag into a diagnostic code.
///
/// `-Wunused-variable` -> `unused-variable`, `-Werror=format` -> `format`,
/// `-Werror,-Wunused-variable` -> `unused-variable`. Returns `None` for
/// bracketed text that is not a flag.
pub fn normalize_flag(flag: &str) -> Option<String> {
    let flag = flag
        .split(',')
        .filter(|f| !f.is_empty() && *f != "-Werror")
        .last()?;

    let tag = flag.strip_prefix("-W").unwrap_or(flag);
    let tag = tag.strip_prefix("error=").unwrap_or(tag);
    let tag = tag
        .trim_start_matches(|c: char| c.is_ascii_punctuation())
        .trim_end_matches('=');

    let valid = tag.starts_with(|c: char| c.is_ascii_alphabetic())
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '=' | '+' | '.' | ':'));

    valid.then(|| tag.to_string())
}

/// Recognises warnings and errors across GCC, Clang and MSVC output.
#[derive(Debug)]
pub struct DiagnosticExtractor {
    patterns: Vec<DiagnosticPattern>,
    trailing_flag: Regex,
    msbuild_suffix: Regex,
}

impl Default for DiagnosticExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticExtractor {
    pub fn new() -> Self {
        let table: [(DiagnosticDialect, &str, ExtractFn); 4] = [
            (DiagnosticDialect::GccClang, GCC_CLANG, extract_located),
            (DiagnosticDialect::Msvc, MSVC, extract_located),
            (DiagnosticDialect::MsvcTool, MSVC_TOOL, extract_unlocated),
            (DiagnosticDialect::Bare, BARE, extract_unlocated),
        ];

        Self {
            patterns: table
                .into_iter()
                .map(|(dialect, pattern, extract)| DiagnosticPattern {
                    dialect,
                    regex: crate::builtin_regex(pattern),
                    extract,
                })
                .collect(),
            trailing_flag: crate::builtin_regex(TRAILING_FLAG),
            msbuild_suffix: crate::builtin_regex(MSBUILD_PROJECT_SUFFIX),
        }
    }

    /// Dialects in the order they are tried.
    pub fn dialects(&self) -> impl Iterator<Item = DiagnosticDialect> + '_ {
        self.patterns.iter().map(|p| p.dialect)
    }

    /// Extract warnings, ignoring errors and notes.
    pub fn extract_warnings(&self, text: &str, deduplicate: bool) -> Vec<Diagnostic> {
        self.extract_all(text, deduplicate).0
    }

    /// Extract errors (including `fatal error`), ignoring warnings and notes.
    pub fn extract_errors(&self, text: &str, deduplicate: bool) -> Vec<Diagnostic> {
        self.extract_all(text, deduplicate).1
    }

    /// Extract warnings and errors in one pass.
    ///
    /// With `deduplicate`, diagnostics identical in `(file, line, message)` are
    /// collapsed to their first occurrence; column is not considered.
    pub fn extract_all(&self, text: &str, deduplicate: bool) -> (Vec<Diagnostic>, Vec<Diagnostic>) {
        let lines: Vec<Cow<'_, str>> = clean_lines(text).collect();
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        let mut idx = 0;
        while idx < lines.len() {
            let line = &lines[idx];
            idx += 1;
            let Some((dialect, m)) = self.match_line(line) else {
                continue;
            };

            // Snippet and caret lines belong to the diagnostic above them,
            // notes included, and are never matched on their own.
            let mut evidence = None;
            if dialect == DiagnosticDialect::GccClang {
                let consumed = self.continuation_len(&lines[idx..]);
                evidence = join_evidence(&lines[idx..idx + consumed]);
                idx += consumed;
            }

            let Some(kind) = m.level.kind() else {
                continue;
            };

            let mut diag = self.build(kind, m);
            if let Some(evidence) = evidence {
                diag = diag.with_evidence(evidence);
            }

            match kind {
                DiagnosticKind::Warning => warnings.push(diag),
                DiagnosticKind::Error => errors.push(diag),
            }
        }

        if deduplicate {
            warnings = dedup_diagnostics(warnings);
            errors = dedup_diagnostics(errors);
        }

        (warnings, errors)
    }

    /// Classify a single (already normalised) line.
    fn match_line(&self, line: &str) -> Option<(DiagnosticDialect, LineMatch)> {
        if !has_level_token(line) {
            return None;
        }
        let line = line.trim();

        self.patterns.iter().find_map(|pattern| {
            let caps = pattern.regex.captures(line)?;
            let m = (pattern.extract)(&caps)?;
            Some((pattern.dialect, self.refine(pattern.dialect, m)))
        })
    }

    /// Dialect-specific message cleanup.
    fn refine(&self, dialect: DiagnosticDialect, mut m: LineMatch) -> LineMatch {
        match dialect {
            DiagnosticDialect::GccClang | DiagnosticDialect::Bare => {
                let flagged = self.trailing_flag.captures(&m.message).and_then(|caps| {
                    normalize_flag(&caps["flag"]).map(|code| (caps["body"].to_string(), code))
                });
                if let Some((body, code)) = flagged {
                    m.message = body;
                    m.code = Some(code);
                }
            }
            DiagnosticDialect::Msvc | DiagnosticDialect::MsvcTool => {
                let stripped = self.msbuild_suffix.replace(&m.message, "").into_owned();
                m.message = stripped;
            }
        }

        if m.message.trim().is_empty() {
            m.message = m.level.label().to_string();
        }
        m
    }

    fn build(&self, kind: DiagnosticKind, m: LineMatch) -> Diagnostic {
        let mut diag = Diagnostic::new(kind, m.message);
        if let (Some(file), Some(line)) = (m.file, m.line) {
            diag = diag.with_location(file, line, m.column);
        }
        if let Some(code) = m.code {
            diag = diag.with_code(code);
        }
        diag
    }

    /// Number of indented continuation lines directly after a diagnostic.
    ///
    /// Source-snippet (`  5 | code`) and caret lines always continue; other
    /// indented lines continue only if they are not diagnostics themselves.
    fn continuation_len(&self, following: &[Cow<'_, str>]) -> usize {
        following
            .iter()
            .take_while(|l| {
                is_continuation(l) && (is_snippet_line(l) || self.match_line(l).is_none())
            })
            .count()
    }
}

/// First [`MAX_EVIDENCE_LINES`] continuation lines, joined.
fn join_evidence(lines: &[Cow<'_, str>]) -> Option<String> {
    let snippet: Vec<&str> = lines
        .iter()
        .take(MAX_EVIDENCE_LINES)
        .map(|l| l.trim_end())
        .collect();

    if snippet.is_empty() {
        None
    } else {
        Some(snippet.join("\n"))
    }
}

/// `   42 |     code`, `      |     ^~~~` or a bare caret/tilde marker line.
fn is_snippet_line(line: &str) -> bool {
    let rest = line.trim_start().trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.trim_start().starts_with('|') {
        return true;
    }
    let marker = line.trim();
    !marker.is_empty() && marker.chars().all(|c| matches!(c, '^' | '~' | ' '))
}

fn has_level_token(line: &str) -> bool {
    line.contains("warning")
        || line.contains("error")
        || line.contains("note")
        || line.contains("remark")
}

fn is_continuation(line: &str) -> bool {
    line.starts_with([' ', '\t']) && !line.trim().is_empty()
}

/// Keep the first diagnostic for each `(file, line, message)`.
pub fn dedup_diagnostics(diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
    let mut seen: HashSet<(Option<String>, Option<u32>, String)> = HashSet::new();
    diagnostics
        .into_iter()
        .filter(|d| seen.insert((d.file.clone(), d.line, d.message.clone())))
        .collect()
}
