//! Identifier value types for locales, tables and keys.
//!
//! All three wrap a trimmed, non-empty string and compare ordinally. They
//! implement `Borrow<str>` so maps keyed by them can be queried with a plain
//! `&str`.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::i18n::error::IdError;

/// Generate a normalized string identifier newtype.
macro_rules! text_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// What: Build the identifier from a raw code.
            ///
            /// Inputs:
            /// - `code`: Raw string; surrounding whitespace is trimmed
            ///
            /// Output:
            /// - The identifier, or `IdError::Empty` when nothing is left after trimming
            ///
            /// # Errors
            /// - Returns `Err` when `code` is empty or whitespace-only
            pub fn new(code: impl Into<String>) -> Result<Self, IdError> {
                let code = code.into();
                let trimmed = code.trim();
                if trimmed.is_empty() {
                    return Err(IdError::Empty { kind: $kind });
                }
                if trimmed.len() == code.len() {
                    Ok(Self(code))
                } else {
                    Ok(Self(trimmed.to_string()))
                }
            }

            /// Normalized code as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = IdError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

text_id!(
    /// Locale code such as `en-US`, kept with the casing the catalog uses.
    LocaleId,
    "locale"
);

text_id!(
    /// Name of a text table (one logical group of keys, e.g. one screen).
    TextTableId,
    "table"
);

text_id!(
    /// Key of a single template inside a table.
    TextKey,
    "key"
);
