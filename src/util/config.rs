//! Configuration file parsing utilities.
//!
//! Helpers for `key = value` files with comment lines, used for the
//! persisted settings file.

/// What: Check if a line should be skipped (empty or comment).
///
/// Inputs:
/// - `line`: Line to check
///
/// Output:
/// - `true` if the line should be skipped, `false` otherwise
///
/// Details:
/// - Skips empty lines and lines starting with `#`, `//`, or `;`
#[must_use]
pub fn skip_comment_or_empty(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with("//")
        || trimmed.starts_with(';')
}

/// What: Parse a key-value pair from a line.
///
/// Inputs:
/// - `line`: Line containing key=value format
///
/// Output:
/// - `Some((key, value))` if parsing succeeds, `None` otherwise
///
/// Details:
/// - Splits on the first `=` character
/// - Trims whitespace from both key and value
#[must_use]
pub fn parse_key_value(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim();
    let (key, value) = trimmed.split_once('=')?;
    Some((key.trim().to_string(), value.trim().to_string()))
}

/// What: Read the value of `key` from `key = value` contents.
///
/// Inputs:
/// - `contents`: Whole file contents
/// - `key`: Key to look for (compared case-insensitively)
///
/// Output:
/// - Value of the last matching line, or `None`
#[must_use]
pub fn read_key(contents: &str, key: &str) -> Option<String> {
    contents
        .lines()
        .filter(|line| !skip_comment_or_empty(line))
        .filter_map(parse_key_value)
        .filter(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
        .last()
}

/// What: Set `key` in `key = value` contents, preserving every other line.
///
/// Inputs:
/// - `contents`: Existing file contents (may be empty)
/// - `key`: Key to set
/// - `value`: New value
///
/// Output:
/// - Updated contents ending with a newline
///
/// Details:
/// - Replaces the first matching line and drops later duplicates
/// - Appends the key when it is absent
#[must_use]
pub fn upsert_key(contents: &str, key: &str, value: &str) -> String {
    let mut out = String::with_capacity(contents.len() + key.len() + value.len() + 4);
    let mut written = false;
    for line in contents.lines() {
        let matches = !skip_comment_or_empty(line)
            && parse_key_value(line).is_some_and(|(k, _)| k.eq_ignore_ascii_case(key));
        if matches {
            if written {
                continue;
            }
            written = true;
            out.push_str(&format!("{key} = {value}"));
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    if !written {
        out.push_str(&format!("{key} = {value}\n"));
    }
    out
}
