//! On-disk line codec for feature state records
//!
//! One record per line:
//!
//! ```text
//! <name>|<enabled>|<strategy>|<key>=<value>|<key>=<value>
//! ```
//!
//! `|` delimits fields, `=` separates a parameter key from its value, and
//! backslash escapes (`\\`, `\|`, `\=`, `\n`, `\r`) keep the encoding
//! unambiguous for arbitrary names and values. An absent strategy encodes as
//! an empty third field; a record without parameters has exactly three
//! fields. Blank lines and `#` comment lines are ignored on read.
//!
//! `encode_table` emits records sorted by feature name, so the file content
//! is deterministic for a given table. The codec is pure and does no I/O.

use crate::errors::{FlagFileError, Result};
use crate::state::{FeatureState, FeatureTable};

/// Lines starting with this character are ignored by [`decode_table`]
pub const COMMENT_PREFIX: char = '#';

const FIELD_DELIMITER: char = '|';
const PARAM_DELIMITER: char = '=';
const ESCAPE: char = '\\';

/// Encode a single feature name and state as one line of file content,
/// without the trailing newline
pub fn encode_line(name: &str, state: &FeatureState) -> String {
    let mut line = String::new();
    line.push_str(&escape_field(name));
    line.push(FIELD_DELIMITER);
    line.push_str(if state.enabled { "true" } else { "false" });
    line.push(FIELD_DELIMITER);
    if let Some(strategy_id) = &state.strategy_id {
        line.push_str(&escape_field(strategy_id));
    }
    for (key, value) in &state.parameters {
        line.push(FIELD_DELIMITER);
        line.push_str(&escape_field(key));
        line.push(PARAM_DELIMITER);
        line.push_str(&escape_field(value));
    }
    line
}

/// Decode one line of file content into a feature name and state
///
/// # Errors
///
/// Returns [`FlagFileError::MalformedRecord`] on wrong field count, empty
/// feature name, an enabled flag other than `true`/`false`, an invalid or
/// truncated escape sequence, or an ill-formed parameter field.
pub fn decode_line(line: &str) -> Result<(String, FeatureState)> {
    let fields = split_unescaped(line, FIELD_DELIMITER);
    if fields.len() < 3 {
        return Err(FlagFileError::MalformedRecord(format!(
            "expected at least 3 fields, found {}",
            fields.len()
        )));
    }

    let name = unescape_field(&fields[0])?;
    if name.is_empty() {
        return Err(FlagFileError::MalformedRecord(
            "empty feature name".to_string(),
        ));
    }

    let enabled = match fields[1].as_str() {
        "true" => true,
        "false" => false,
        other => {
            return Err(FlagFileError::MalformedRecord(format!(
                "invalid enabled flag: {:?}",
                other
            )))
        }
    };

    let mut state = FeatureState::new(enabled).with_strategy(unescape_field(&fields[2])?);

    for raw in &fields[3..] {
        let parts = split_unescaped(raw, PARAM_DELIMITER);
        if parts.len() != 2 {
            return Err(FlagFileError::MalformedRecord(format!(
                "invalid parameter field: {:?}",
                raw
            )));
        }
        let key = unescape_field(&parts[0])?;
        let value = unescape_field(&parts[1])?;
        if key.is_empty() {
            return Err(FlagFileError::MalformedRecord(
                "empty parameter key".to_string(),
            ));
        }
        if state.parameters.contains_key(&key) {
            return Err(FlagFileError::MalformedRecord(format!(
                "duplicate parameter key: {:?}",
                key
            )));
        }
        state.parameters.insert(key, value);
    }

    Ok((name, state))
}

/// Encode a full table as complete file content, one newline-terminated
/// record per line, sorted by feature name
pub fn encode_table(table: &FeatureTable) -> String {
    let mut content = String::new();
    for (name, state) in table {
        content.push_str(&encode_line(name, state));
        content.push('\n');
    }
    content
}

/// Decode complete file content into a table
///
/// Blank lines and comment lines are skipped. A single malformed line is
/// fatal for the whole decode: a half-parsed table must never be accepted
/// as authoritative.
///
/// # Errors
///
/// Returns [`FlagFileError::MalformedFile`] carrying the 1-based line number
/// of the offending line, or naming a duplicated feature name.
pub fn decode_table(content: &str) -> Result<FeatureTable> {
    let mut table = FeatureTable::new();
    for (idx, raw) in content.lines().enumerate() {
        let trimmed = raw.trim_start();
        if trimmed.is_empty() || trimmed.starts_with(COMMENT_PREFIX) {
            continue;
        }
        let (name, state) = decode_line(raw)
            .map_err(|e| FlagFileError::MalformedFile(format!("line {}: {}", idx + 1, e)))?;
        if table.contains_key(&name) {
            return Err(FlagFileError::MalformedFile(format!(
                "line {}: duplicate feature name {:?}",
                idx + 1,
                name
            )));
        }
        table.insert(name, state);
    }
    Ok(table)
}

fn escape_field(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            ESCAPE => out.push_str("\\\\"),
            FIELD_DELIMITER => out.push_str("\\|"),
            PARAM_DELIMITER => out.push_str("\\="),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape_field(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != ESCAPE {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('|') => out.push('|'),
            Some('=') => out.push('='),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => {
                return Err(FlagFileError::MalformedRecord(format!(
                    "invalid escape sequence: \\{}",
                    other
                )))
            }
            None => {
                return Err(FlagFileError::MalformedRecord(
                    "truncated escape sequence at end of field".to_string(),
                ))
            }
        }
    }
    Ok(out)
}

/// Split on the delimiter, treating backslash-escaped occurrences as field
/// content. Escape sequences themselves are left intact for `unescape_field`.
fn split_unescaped(input: &str, delimiter: char) -> Vec<String> {
    let mut fields = vec![String::new()];
    let mut escaped = false;
    for c in input.chars() {
        if escaped {
            fields.last_mut().unwrap().push(c);
            escaped = false;
        } else if c == ESCAPE {
            fields.last_mut().unwrap().push(c);
            escaped = true;
        } else if c == delimiter {
            fields.push(String::new());
        } else {
            fields.last_mut().unwrap().push(c);
        }
    }
    fields
}
