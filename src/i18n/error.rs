//! Error types for the localization engine.
//!
//! Every error is `Clone` so it can be fanned out on the service error stream;
//! I/O and JSON errors are wrapped in `Arc` for that reason.

use std::sync::Arc;

use thiserror::Error;

use crate::i18n::ids::{LocaleId, TextTableId};

/// Invalid identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The code was empty or whitespace-only.
    #[error("{kind} identifier must not be empty")]
    Empty {
        /// Which identifier kind was being built.
        kind: &'static str,
    },
}

/// Failure turning a table payload into entries.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// Payload bytes are not UTF-8.
    #[error("table payload is not valid UTF-8")]
    InvalidUtf8,

    /// Payload is not the expected JSON shape.
    #[error("table payload is not valid JSON: {0}")]
    Json(#[source] Arc<serde_json::Error>),

    /// The payload has no `entries` object.
    #[error("table payload has no 'entries' object")]
    MissingEntries,

    /// The `entries` object holds no usable entry.
    #[error("table payload has an empty 'entries' object")]
    EmptyEntries,
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(Arc::new(err))
    }
}

/// Failure producing a single table for one locale.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// The catalog has no address for the requested (locale, table).
    #[error("catalog has no address for this table")]
    NoAddress,

    /// Nothing exists at the address.
    #[error("nothing found at '{address}'")]
    NotFound {
        /// Address that was requested.
        address: String,
    },

    /// Reading the address failed.
    #[error("failed to read '{address}': {source}")]
    Io {
        /// Address that was requested.
        address: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The bytes could not be parsed into a table.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The load observed its cancel signal.
    #[error("load cancelled")]
    Cancelled,
}

impl LoadError {
    /// What: Classify an I/O error for a given address.
    ///
    /// Inputs:
    /// - `address`: Address that was being read
    /// - `err`: The I/O error
    ///
    /// Output:
    /// - `NotFound` for missing files, `Io` otherwise
    #[must_use]
    pub fn from_io(address: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                address: address.to_string(),
            }
        } else {
            Self::Io {
                address: address.to_string(),
                source: Arc::new(err),
            }
        }
    }
}

/// Errors surfaced by the localization service.
#[derive(Debug, Clone, Error)]
pub enum LocalizationError {
    /// The requested locale is not in the catalog's supported set.
    #[error("locale '{locale}' is not supported")]
    UnsupportedLocale {
        /// Rejected locale.
        locale: LocaleId,
    },

    /// A required table could not be produced.
    #[error("failed to load table '{table}' for locale '{locale}': {source}")]
    LoadFailure {
        /// Locale being assembled.
        locale: LocaleId,
        /// Table that failed.
        table: TextTableId,
        /// What went wrong.
        #[source]
        source: LoadError,
    },

    /// The operation was superseded or cancelled by its caller.
    #[error("operation cancelled")]
    Cancelled,

    /// Initialization found no supported locale to try.
    #[error("no supported locale could be loaded")]
    NoLoadableLocale,

    /// The service was disposed.
    #[error("localization service has been disposed")]
    Disposed,
}

impl LocalizationError {
    /// Whether this is an expected cancellation rather than a failure.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(
            self,
            Self::Cancelled
                | Self::LoadFailure {
                    source: LoadError::Cancelled,
                    ..
                }
        )
    }
}
