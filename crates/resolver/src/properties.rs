//! Java `.properties` reading and writing
//!
//! Covers the subset Gradle scripts rely on for `key.properties`:
//! - `key=value`, `key:value` and `key value` separators
//! - `#` and `!` comment lines, blank lines
//! - Trailing-backslash line continuation
//! - `\t`, `\n`, `\r`, `\f`, `\uXXXX` (including surrogate pairs) and
//!   literal escapes
//!
//! Files are read as ISO-8859-1, like `Properties.load(InputStream)`, so
//! anything outside Latin-1 has to be written as `\uXXXX`.

use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from parsing a properties document
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropertiesError {
    /// Malformed `\uXXXX` escape
    #[error("line {line}: invalid unicode escape")]
    InvalidUnicodeEscape {
        /// 1-based line where the logical line starts
        line: usize,
    },
}

/// Parsed key/value pairs; later definitions override earlier ones
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    /// Look up a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Insert or replace a key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no keys are defined
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decode raw file bytes as ISO-8859-1
///
/// Every byte maps to the code point of the same value, so a UTF-8 file
/// reads the way Gradle's signing config sees it.
pub fn decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Parse a properties document
pub fn parse_properties(text: &str) -> Result<Properties, PropertiesError> {
    let mut props = Properties::default();

    for (line_no, logical) in logical_lines(text) {
        let (raw_key, raw_value) = split_key_value(&logical);
        let key = unescape(raw_key, line_no)?;
        let value = unescape(raw_value, line_no)?;
        props.insert(key, value);
    }

    Ok(props)
}

/// Render pairs in `key=value` form, escaping what the parser would misread
pub fn render_properties<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut out = String::new();
    for (key, value) in pairs {
        out.push_str(&escape(key, true));
        out.push('=');
        out.push_str(&escape(value, false));
        out.push('\n');
    }
    out
}

/// Join continuation lines and drop comments/blank lines
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut current: Option<(usize, String)> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim_start_matches([' ', '\t', '\u{c}']);

        let (start, mut buf) = match current.take() {
            Some(pending) => pending,
            None => {
                if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                    continue;
                }
                (idx + 1, String::new())
            }
        };

        if ends_with_continuation(line) {
            buf.push_str(&line[..line.len() - 1]);
            current = Some((start, buf));
        } else {
            buf.push_str(line);
            lines.push((start, buf));
        }
    }

    // A continuation on the final line just ends the value
    if let Some(pending) = current {
        lines.push(pending);
    }

    lines
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Split at the first unescaped separator
fn split_key_value(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\u{c}' => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start_matches([' ', '\t', '\u{c}']);
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start_matches([' ', '\t', '\u{c}']);
    }

    (key, rest)
}

fn unescape(raw: &str, line: usize) -> Result<String, PropertiesError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let unit = utf16_unit(&mut chars, line)?;
                let mut units = vec![unit];
                // A high surrogate must be followed by its low half
                if (0xD800..0xDC00).contains(&unit) {
                    match (chars.next(), chars.next()) {
                        (Some('\\'), Some('u')) => units.push(utf16_unit(&mut chars, line)?),
                        _ => return Err(PropertiesError::InvalidUnicodeEscape { line }),
                    }
                }
                for decoded in char::decode_utf16(units) {
                    out.push(decoded.map_err(|_| PropertiesError::InvalidUnicodeEscape { line })?);
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}

/// The four hex digits after `\u`
fn utf16_unit(chars: &mut std::str::Chars<'_>, line: usize) -> Result<u16, PropertiesError> {
    let hex: String = chars.by_ref().take(4).collect();
    if hex.len() != 4 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PropertiesError::InvalidUnicodeEscape { line });
    }
    u16::from_str_radix(&hex, 16).map_err(|_| PropertiesError::InvalidUnicodeEscape { line })
}

fn escape(raw: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, c) in raw.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{c}' => out.push_str("\\f"),
            '=' | ':' if is_key => {
                out.push('\\');
                out.push(c);
            }
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            '#' | '!' if is_key && i == 0 => {
                out.push('\\');
                out.push(c);
            }
            c if !c.is_ascii() || c.is_ascii_control() => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{:04X}", unit));
                }
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_key_properties_layout() {
        let props = parse_properties(
            "storePassword=storepass\nkeyPassword=keypass\nkeyAlias=upload\nstoreFile=/home/me/upload.jks\n",
        )
        .unwrap();

        assert_eq!(props.len(), 4);
        assert_eq!(props.get("storePassword"), Some("storepass"));
        assert_eq!(props.get("storeFile"), Some("/home/me/upload.jks"));
    }

    #[test]
    fn test_separators_and_comments() {
        let props = parse_properties(
            "# release signing\n! legacy comment\n\n  keyAlias : upload\nstoreFile /tmp/a.jks\nkeyPassword=a=b\n",
        )
        .unwrap();

        assert_eq!(props.get("keyAlias"), Some("upload"));
        assert_eq!(props.get("storeFile"), Some("/tmp/a.jks"));
        assert_eq!(props.get("keyPassword"), Some("a=b"));
        assert_eq!(props.len(), 3);
    }

    #[test]
    fn test_continuation_and_escapes() {
        let props = parse_properties(
            "storeFile=C:\\\\keys\\\\\\\n    upload.jks\nkey\\ with\\ spaces=tab\\there\nsnow=\\u2603\n",
        )
        .unwrap();

        assert_eq!(props.get("storeFile"), Some("C:\\keys\\upload.jks"));
        assert_eq!(props.get("key with spaces"), Some("tab\there"));
        assert_eq!(props.get("snow"), Some("\u{2603}"));
    }

    #[test]
    fn test_key_without_value() {
        let props = parse_properties("keyAlias\n").unwrap();
        assert_eq!(props.get("keyAlias"), Some(""));
    }

    #[test]
    fn test_later_definition_wins() {
        let props = parse_properties("keyAlias=a\nkeyAlias=b\n").unwrap();
        assert_eq!(props.get("keyAlias"), Some("b"));
    }

    #[test]
    fn test_invalid_unicode_escape() {
        let err = parse_properties("a=1\nkeyAlias=\\u12\n").unwrap_err();
        assert_eq!(err, PropertiesError::InvalidUnicodeEscape { line: 2 });
    }

    #[test]
    fn test_surrogate_pair_escape() {
        let props = parse_properties("storePassword=p\\ud83d\\ude00w\n").unwrap();
        assert_eq!(props.get("storePassword"), Some("p\u{1F600}w"));
    }

    #[test]
    fn test_unpaired_surrogates_rejected() {
        assert_eq!(
            parse_properties("a=\\ud83dx\n").unwrap_err(),
            PropertiesError::InvalidUnicodeEscape { line: 1 }
        );
        assert_eq!(
            parse_properties("a=\\ude00\n").unwrap_err(),
            PropertiesError::InvalidUnicodeEscape { line: 1 }
        );
        assert_eq!(
            parse_properties("a=\\ud83d\\u0041\n").unwrap_err(),
            PropertiesError::InvalidUnicodeEscape { line: 1 }
        );
    }

    #[test]
    fn test_unicode_escape_requires_hex_digits() {
        let err = parse_properties("a=\\u+041\n").unwrap_err();
        assert_eq!(err, PropertiesError::InvalidUnicodeEscape { line: 1 });
        assert_eq!(parse_properties("a=\\u0041\n").unwrap().get("a"), Some("A"));
    }

    #[test]
    fn test_decode_is_latin1() {
        assert_eq!(decode(b"key=caf\xe9"), "key=café");
        assert_eq!(decode("key=café".as_bytes()), "key=caf\u{c3}\u{a9}");
    }

    #[test]
    fn test_non_latin_values_written_as_escapes() {
        let text = render_properties([("storePassword", "pä\u{1F600}ss")]);
        assert_eq!(text, "storePassword=p\\u00E4\\uD83D\\uDE00ss\n");
        assert!(text.is_ascii());

        let props = parse_properties(&decode(text.as_bytes())).unwrap();
        assert_eq!(props.get("storePassword"), Some("pä\u{1F600}ss"));
    }

    #[test]
    fn test_render_then_parse_preserves_awkward_values() {
        let text = render_properties([
            ("storePassword", " lead space"),
            ("keyPassword", "p#ss=w:rd\\"),
            ("odd key", "v"),
        ]);
        let props = parse_properties(&text).unwrap();

        assert_eq!(props.get("storePassword"), Some(" lead space"));
        assert_eq!(props.get("keyPassword"), Some("p#ss=w:rd\\"));
        assert_eq!(props.get("odd key"), Some("v"));
    }

    proptest! {
        #[test]
        fn parse_never_panics(input in "\\PC*") {
            let _ = parse_properties(&input);
        }

        #[test]
        fn simple_pairs_survive_rendering(
            key in "[A-Za-z][A-Za-z0-9_.]{0,15}",
            value in "[ -~]{0,30}",
        ) {
            let text = render_properties([(key.as_str(), value.as_str())]);
            let props = parse_properties(&text).unwrap();
            prop_assert_eq!(props.get(&key), Some(value.as_str()));
        }
    }
}
