//! Table payload parsing.
//!
//! Wire format (UTF-8 JSON):
//!
//! ```json
//! { "locale": "en-US", "table": "UI", "entries": { "Test.Key": "Hello, {name}!" } }
//! ```

use std::collections::HashMap;

use serde::Deserialize;

use crate::i18n::error::ParseError;
use crate::i18n::ids::TextKey;
use crate::i18n::store::TextTable;

/// One parsed table payload.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    /// Locale code the payload claims to hold.
    pub locale: String,
    /// Table name the payload claims to hold.
    pub table: String,
    /// Key -> template entries.
    pub entries: TextTable,
}

/// Turns raw table bytes into entries.
pub trait TableParser: Send + Sync {
    /// What: Parse one table payload.
    ///
    /// Inputs:
    /// - `bytes`: Raw payload as returned by the loader
    ///
    /// Output:
    /// - The parsed table
    ///
    /// # Errors
    /// - Returns `Err` when the payload is malformed or holds no usable entry
    fn parse(&self, bytes: &[u8]) -> Result<ParsedTable, ParseError>;
}

/// Serde shape of the JSON payload.
#[derive(Debug, Deserialize)]
struct TablePayload {
    #[serde(default)]
    locale: String,
    #[serde(default)]
    table: String,
    #[serde(default)]
    entries: Option<HashMap<String, String>>,
}

/// Parser for the JSON wire format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTableParser;

impl TableParser for JsonTableParser {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedTable, ParseError> {
        parse_table_json(bytes)
    }
}

/// What: Parse a JSON table payload.
///
/// Inputs:
/// - `bytes`: UTF-8 JSON payload, optionally prefixed with a byte-order mark
///
/// Output:
/// - `ParsedTable` with every non-blank key
///
/// # Errors
/// - `InvalidUtf8` when the bytes are not UTF-8
/// - `Json` when the text is not the expected object shape
/// - `MissingEntries` when `entries` is absent or null
/// - `EmptyEntries` when `entries` holds no usable key
///
/// Details:
/// - Unknown top-level fields are ignored
/// - Blank keys are skipped with a warning
pub fn parse_table_json(bytes: &[u8]) -> Result<ParsedTable, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ParseError::InvalidUtf8)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let payload: TablePayload = serde_json::from_str(text)?;
    let raw_entries = payload.entries.ok_or(ParseError::MissingEntries)?;

    let mut entries = TextTable::with_capacity(raw_entries.len());
    for (key, template) in raw_entries {
        match TextKey::new(key) {
            Ok(key) => {
                entries.insert(key, template);
            }
            Err(_) => {
                tracing::warn!(
                    locale = %payload.locale,
                    table = %payload.table,
                    "Skipping table entry with a blank key"
                );
            }
        }
    }
    if entries.is_empty() {
        return Err(ParseError::EmptyEntries);
    }

    Ok(ParsedTable {
        locale: payload.locale,
        table: payload.table,
        entries,
    })
}
