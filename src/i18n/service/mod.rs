//! Localization service: initialization, locale switching, resolution and observation.
//!
//! The service owns the [`TextStore`] and is the only writer to it. Locale
//! switches run as supervised asynchronous operations: each one holds its own
//! [`CancelSource`], and starting a newer switch (or disposing the service)
//! cancels the predecessor before the new one proceeds. A switch installs its
//! tables only if it is still the most recent request when loading finishes.
//!
//! Reads ([`LocalizationService::resolve`] and subscriptions created by
//! [`LocalizationService::observe`]) only ever touch store snapshots.

mod observe;
mod switch;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, watch};

pub use observe::TextSubscription;

use self::observe::SubscriptionRegistry;
use crate::i18n::cancel::CancelSource;
use crate::i18n::catalog::{Catalog, DirectoryCatalog};
use crate::i18n::config::I18nConfig;
use crate::i18n::error::{IdError, LocalizationError};
use crate::i18n::format::{TextArgs, format};
use crate::i18n::ids::{LocaleId, TextTableId};
use crate::i18n::loader::{FileLoader, Loader};
use crate::i18n::parser::{JsonTableParser, TableParser};
use crate::i18n::persist::{LocalePersistence, MemoryLocaleStore};
use crate::i18n::policy::LocalePolicy;
use crate::i18n::store::TextStore;

/// Buffered error events per receiver before old ones are dropped.
const ERROR_CHANNEL_CAPACITY: usize = 64;

/// Lifecycle state of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Nothing installed yet (also after a failed initialization).
    Uninitialized,
    /// First locale is being loaded.
    Initializing,
    /// A locale is installed and no switch is running.
    Ready,
    /// A locale is installed and a switch is running.
    SwitchingLocale,
    /// `dispose` has been called.
    Disposed,
}

/// What: Diagnostic text shown in place of a missing key.
///
/// Inputs:
/// - `table`: Table name
/// - `key`: Key inside the table
///
/// Output:
/// - `"[<table>.<key>]"`
#[must_use]
pub fn diagnostic_placeholder(table: &str, key: &str) -> String {
    format!("[{table}.{key}]")
}

/// Look up and format one key against the current store snapshot.
fn resolve_text(store: &TextStore, table: &str, key: &str, args: Option<&TextArgs>) -> String {
    let Some(snapshot) = store.snapshot() else {
        return diagnostic_placeholder(table, key);
    };
    if let Some(template) = snapshot.lookup(table, key) {
        format(template, args).into_owned()
    } else {
        tracing::debug!(
            locale = %snapshot.locale(),
            table,
            key,
            "Missing text key; returning diagnostic placeholder"
        );
        diagnostic_placeholder(table, key)
    }
}

/// The switch currently allowed to install, identified by generation.
#[derive(Debug, Default)]
struct SwitchSlot {
    generation: u64,
    in_flight: Option<CancelSource>,
}

/// Resolves text for the selected locale and manages locale switches.
pub struct LocalizationService {
    catalog: Arc<dyn Catalog>,
    loader: Arc<dyn Loader>,
    parser: Arc<dyn TableParser>,
    persistence: Arc<dyn LocalePersistence>,
    policy: LocalePolicy,
    detect_system_locale: bool,
    store: Arc<TextStore>,
    current_locale: watch::Sender<Option<LocaleId>>,
    busy: watch::Sender<bool>,
    state: watch::Sender<ServiceState>,
    errors: broadcast::Sender<LocalizationError>,
    switch: Mutex<SwitchSlot>,
    persist_order: tokio::sync::Mutex<()>,
    subscriptions: Arc<SubscriptionRegistry>,
    disposed: AtomicBool,
}

/// Builder for [`LocalizationService`].
pub struct LocalizationServiceBuilder {
    catalog: Arc<dyn Catalog>,
    loader: Arc<dyn Loader>,
    policy: LocalePolicy,
    parser: Arc<dyn TableParser>,
    persistence: Arc<dyn LocalePersistence>,
    detect_system_locale: bool,
}

impl LocalizationServiceBuilder {
    /// Use `parser` instead of the JSON wire-format parser.
    #[must_use]
    pub fn parser(mut self, parser: Arc<dyn TableParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Persist the selected locale through `persistence` (default: in memory only).
    #[must_use]
    pub fn persistence(mut self, persistence: Arc<dyn LocalePersistence>) -> Self {
        self.persistence = persistence;
        self
    }

    /// Consider the system locale during initialization.
    #[must_use]
    pub const fn detect_system_locale(mut self, enabled: bool) -> Self {
        self.detect_system_locale = enabled;
        self
    }

    /// Build the service in the `Uninitialized` state.
    #[must_use]
    pub fn build(self) -> LocalizationService {
        let supported = self.catalog.supported_locales();
        if !supported.contains(self.policy.default_locale()) {
            tracing::warn!(
                default_locale = %self.policy.default_locale(),
                supported = supported.len(),
                "Default locale is not in the catalog's supported set"
            );
        }
        let (errors, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        LocalizationService {
            catalog: self.catalog,
            loader: self.loader,
            parser: self.parser,
            persistence: self.persistence,
            policy: self.policy,
            detect_system_locale: self.detect_system_locale,
            store: Arc::new(TextStore::new()),
            current_locale: watch::Sender::new(None),
            busy: watch::Sender::new(false),
            state: watch::Sender::new(ServiceState::Uninitialized),
            errors,
            switch: Mutex::new(SwitchSlot::default()),
            persist_order: tokio::sync::Mutex::new(()),
            subscriptions: Arc::new(SubscriptionRegistry::default()),
            disposed: AtomicBool::new(false),
        }
    }
}

impl LocalizationService {
    /// What: Start building a service.
    ///
    /// Inputs:
    /// - `catalog`: Supported locales, startup tables and table addresses
    /// - `loader`: Fetches bytes for catalog addresses
    /// - `policy`: Default locale, fallbacks and startup tables
    ///
    /// Output:
    /// - Builder defaulting to the JSON parser and in-memory persistence
    #[must_use]
    pub fn builder(
        catalog: Arc<dyn Catalog>,
        loader: Arc<dyn Loader>,
        policy: LocalePolicy,
    ) -> LocalizationServiceBuilder {
        LocalizationServiceBuilder {
            catalog,
            loader,
            policy,
            parser: Arc::new(JsonTableParser),
            persistence: Arc::new(MemoryLocaleStore::new()),
            detect_system_locale: false,
        }
    }

    /// What: Build a filesystem-backed service from `i18n.yml` settings.
    ///
    /// Inputs:
    /// - `config`: Parsed configuration
    /// - `locales_dir`: Directory holding `<locale>/<table>.json`
    /// - `persistence`: Where the selected locale is remembered
    ///
    /// Output:
    /// - Service over a `DirectoryCatalog` and `FileLoader`
    ///
    /// # Errors
    /// - Returns `Err` when the config names a blank locale or table
    pub fn from_config(
        config: &I18nConfig,
        locales_dir: PathBuf,
        persistence: Arc<dyn LocalePersistence>,
    ) -> Result<Self, IdError> {
        let catalog = DirectoryCatalog::from_config(config, locales_dir)?;
        let policy = LocalePolicy::from_config(config)?;
        Ok(Self::builder(Arc::new(catalog), Arc::new(FileLoader), policy)
            .persistence(persistence)
            .detect_system_locale(config.detect_system_locale)
            .build())
    }

    /// What: Resolve a key to display text for the installed locale.
    ///
    /// Inputs:
    /// - `table`: Table name
    /// - `key`: Key inside the table
    /// - `args`: Named arguments for `{name}` placeholders
    ///
    /// Output:
    /// - Formatted text, or `"[table.key]"` when neither the active nor the
    ///   fallback locale has the key (or nothing is installed yet)
    ///
    /// Details:
    /// - Never blocks and never fails; safe from any thread
    #[must_use]
    pub fn resolve(&self, table: &str, key: &str, args: Option<&TextArgs>) -> String {
        resolve_text(&self.store, table.trim(), key.trim(), args)
    }

    /// Supported locales in catalog order.
    #[must_use]
    pub fn supported_locales(&self) -> Vec<LocaleId> {
        self.catalog.supported_locales()
    }

    /// Locale currently installed, if any.
    #[must_use]
    pub fn current_locale(&self) -> Option<LocaleId> {
        self.current_locale.borrow().clone()
    }

    /// Receiver notified each time a locale is successfully installed.
    #[must_use]
    pub fn watch_current_locale(&self) -> watch::Receiver<Option<LocaleId>> {
        self.current_locale.subscribe()
    }

    /// Whether a switch or initialization is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        *self.busy.borrow()
    }

    /// Receiver for the busy flag.
    #[must_use]
    pub fn watch_busy(&self) -> watch::Receiver<bool> {
        self.busy.subscribe()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServiceState {
        *self.state.borrow()
    }

    /// Receiver for lifecycle state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ServiceState> {
        self.state.subscribe()
    }

    /// Stream of load and validation failures. Cancellations never appear here.
    #[must_use]
    pub fn errors(&self) -> broadcast::Receiver<LocalizationError> {
        self.errors.subscribe()
    }

    /// Read access to the store, e.g. for snapshot inspection.
    #[must_use]
    pub fn store(&self) -> &TextStore {
        &self.store
    }

    /// Policy in use.
    #[must_use]
    pub const fn policy(&self) -> &LocalePolicy {
        &self.policy
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether `dispose` has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// What: Shut the service down.
    ///
    /// Details:
    /// - Cancels any in-flight switch; its caller sees `Cancelled`
    /// - Ends every subscription
    /// - Idempotent; resolution keeps serving the last installed set
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        {
            let mut slot = self.lock_switch();
            slot.generation += 1;
            if let Some(in_flight) = slot.in_flight.take() {
                in_flight.cancel();
            }
            self.set_busy(false);
            self.state.send_replace(ServiceState::Disposed);
        }
        let released = self.subscriptions.close();
        tracing::info!(subscriptions = released, "Localization service disposed");
    }

    /// Tables every locale must provide: policy startup tables plus catalog ones.
    fn required_tables(&self) -> BTreeSet<TextTableId> {
        let mut tables = self.policy.startup_tables().clone();
        tables.extend(self.catalog.startup_tables());
        tables
    }

    /// Send `err` on the error stream unless it is an expected cancellation.
    fn publish_error(&self, err: &LocalizationError) {
        if err.is_cancellation() {
            return;
        }
        tracing::warn!(error = %err, "Localization error");
        // No receivers is fine: nobody is listening for diagnostics.
        let _ = self.errors.send(err.clone());
    }

    fn set_busy(&self, busy: bool) {
        self.busy.send_if_modified(|current| {
            let changed = *current != busy;
            *current = busy;
            changed
        });
    }

    fn lock_switch(&self) -> MutexGuard<'_, SwitchSlot> {
        self.switch.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for LocalizationService {
    fn drop(&mut self) {
        self.dispose();
    }
}
