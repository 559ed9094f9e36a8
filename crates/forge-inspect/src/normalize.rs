//! Line normalisation shared by every extractor.
//!
//! Captured build output is decoded lossily, then ANSI escape sequences are
//! removed before any pattern sees a line. Line and carriage-return structure
//! is kept intact: nothing is dropped or reordered.

use std::borrow::Cow;

const ESC: char = '\u{1b}';
const BEL: char = '\u{07}';

/// Decode an arbitrary byte stream, substituting U+FFFD for invalid sequences.
pub fn decode_lossy(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

/// Remove ANSI escape sequences from `text`.
///
/// Handles CSI (`ESC [ params final`), OSC (`ESC ] ... BEL` / `ESC ] ... ESC \`,
/// as used by GCC diagnostic hyperlinks) and drops any other lone `ESC`.
/// A sequence never consumes a line break.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    if !text.contains(ESC) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != ESC {
            out.push(c);
            continue;
        }

        match chars.peek() {
            Some('[') => {
                chars.next();
                while let Some(&n) = chars.peek() {
                    if n == '\n' || n == '\r' {
                        break;
                    }
                    chars.next();
                    // parameter (0x30-0x3F) and intermediate (0x20-0x2F) bytes
                    // continue the sequence; anything else terminates it.
                    if !('\u{20}'..='\u{3f}').contains(&n) {
                        break;
                    }
                }
            }
            Some(']') => {
                chars.next();
                while let Some(&n) = chars.peek() {
                    if n == '\n' || n == '\r' {
                        break;
                    }
                    chars.next();
                    if n == BEL {
                        break;
                    }
                    if n == ESC {
                        if chars.peek() == Some(&'\\') {
                            chars.next();
                        }
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    Cow::Owned(out)
}

/// Strip ANSI sequences from a whole blob, keeping every `\n` and `\r`.
pub fn normalize(text: &str) -> String {
    strip_ansi(text).into_owned()
}

/// Split text into logical lines.
///
/// Lines end at `\n`; a trailing `\r` (CRLF) is dropped, and embedded `\r`
/// progress overwrites split a physical line into several logical ones, in
/// their original order.
pub fn logical_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').flat_map(|line| {
        let line = line.strip_suffix('\r').unwrap_or(line);
        line.split('\r')
    })
}

/// Logical lines with ANSI sequences removed.
pub fn clean_lines(text: &str) -> impl Iterator<Item = Cow<'_, str>> {
    logical_lines(text).map(strip_ansi)
}
