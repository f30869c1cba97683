//! Localization resolution engine.
//!
//! # Overview
//!
//! - **Catalog**: which locales exist and where each table lives ([`Catalog`])
//! - **Loading**: raw bytes per address ([`Loader`]), parsed into tables ([`TableParser`])
//! - **Store**: one immutable [`LoadedLocaleSet`] published atomically ([`TextStore`])
//! - **Policy**: default locale, single-level fallbacks, startup tables ([`LocalePolicy`])
//! - **Service**: initialization, supersedable locale switching, resolution and
//!   live observation ([`LocalizationService`])
//!
//! # Table files
//!
//! Each table is a JSON document:
//!
//! ```json
//! { "locale": "en-US", "table": "UI", "entries": { "Greeting": "Hello, {name}!" } }
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use loctable::i18n::{
//!     BundleLoader, CancelToken, LocaleId, LocalePolicy, LocalizationService, StaticCatalog,
//!     TextTableId, text_args,
//! };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let en = LocaleId::new("en-US")?;
//! let catalog = StaticCatalog::new([en.clone()], [TextTableId::new("UI")?]);
//! let loader = BundleLoader::new().with(
//!     "en-US/UI",
//!     br#"{"locale":"en-US","table":"UI","entries":{"Greeting":"Hello, {name}!"}}"#.to_vec(),
//! );
//! let service =
//!     LocalizationService::builder(Arc::new(catalog), Arc::new(loader), LocalePolicy::new(en))
//!         .build();
//! service.initialize(&CancelToken::never()).await?;
//! let args = text_args([("name", "Alice")]);
//! assert_eq!(service.resolve("UI", "Greeting", Some(&args)), "Hello, Alice!");
//! # Ok(())
//! # }
//! ```
//!
//! # Error handling
//!
//! - Missing keys resolve to `"[table.key]"` and are logged at debug level
//! - Load, parse and validation failures are returned to the caller and
//!   also published on [`LocalizationService::errors`]
//! - Superseded or cancelled switches return `Cancelled` and are never published

mod cancel;
mod catalog;
mod config;
mod detection;
mod error;
mod format;
mod ids;
mod loader;
mod parser;
mod persist;
mod policy;
mod service;
mod store;

pub use cancel::{CancelSource, CancelToken};
pub use catalog::{Catalog, DirectoryCatalog, StaticCatalog};
pub use config::{ConfigError, DEFAULT_LOCALE, I18nConfig, find_config_file, find_locales_dir};
pub use detection::detect_system_locale;
pub use error::{IdError, LoadError, LocalizationError, ParseError};
pub use format::{TextArgs, format, text_args};
pub use ids::{LocaleId, TextKey, TextTableId};
pub use loader::{BundleLoader, FileLoader, Loader};
pub use parser::{JsonTableParser, ParsedTable, TableParser, parse_table_json};
pub use persist::{LocalePersistence, MemoryLocaleStore, SettingsFileStore};
pub use policy::{LocalePolicy, MAX_FALLBACK_CHAIN};
pub use service::{
    LocalizationService, LocalizationServiceBuilder, ServiceState, TextSubscription,
    diagnostic_placeholder,
};
pub use store::{LoadedLocaleSet, TextStore, TextTable};
