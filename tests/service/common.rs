//! Shared fixtures: an in-memory catalog and a loader whose loads can be held open.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use loctable::i18n::{
    BundleLoader, CancelToken, LoadError, Loader, LocaleId, LocalePersistence, LocalePolicy,
    LocalizationService, MemoryLocaleStore, StaticCatalog, TextTableId,
};
use tokio::sync::Notify;

/// What: Parse a locale id in tests.
pub fn id(code: &str) -> LocaleId {
    LocaleId::new(code).expect("valid locale")
}

/// What: Build a table payload in the JSON wire format.
///
/// Inputs:
/// - `locale`, `table`: Header fields
/// - `entries`: Key/template pairs
pub fn payload(locale: &str, table: &str, entries: &[(&str, &str)]) -> Vec<u8> {
    let entries: serde_json::Map<String, serde_json::Value> = entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), serde_json::Value::from(*v)))
        .collect();
    serde_json::json!({ "locale": locale, "table": table, "entries": entries })
        .to_string()
        .into_bytes()
}

/// What: Bundle with `UI` tables for en-US, ru-RU and de-DE.
///
/// Details:
/// - `Only.English` exists in en-US only, to exercise fallback
pub fn bundle() -> BundleLoader {
    BundleLoader::new()
        .with(
            "en-US/UI",
            payload(
                "en-US",
                "UI",
                &[("Test.Key", "Hello, {name}!"), ("Only.English", "English only")],
            ),
        )
        .with(
            "ru-RU/UI",
            payload("ru-RU", "UI", &[("Test.Key", "Привет, {name}!")]),
        )
        .with(
            "de-DE/UI",
            payload("de-DE", "UI", &[("Test.Key", "Hallo, {name}!")]),
        )
}

/// Loader that records every request and holds gated addresses until opened or cancelled.
pub struct GatedLoader {
    inner: BundleLoader,
    gated: Mutex<HashSet<String>>,
    gate: Notify,
    requests: Mutex<Vec<(String, CancelToken)>>,
}

impl GatedLoader {
    pub fn new(inner: BundleLoader) -> Self {
        Self {
            inner,
            gated: Mutex::new(HashSet::new()),
            gate: Notify::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Hold loads of `address` until [`GatedLoader::open`].
    pub fn gate(&self, address: &str) {
        self.gated.lock().expect("gate lock").insert(address.to_string());
    }

    /// Release every held load.
    pub fn open(&self) {
        self.gated.lock().expect("gate lock").clear();
        self.gate.notify_waiters();
    }

    /// Token passed with the most recent request for `address`.
    pub fn token_for(&self, address: &str) -> Option<CancelToken> {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .rev()
            .find(|(a, _)| a == address)
            .map(|(_, token)| token.clone())
    }

    /// How many times `address` was requested.
    pub fn request_count(&self, address: &str) -> usize {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .filter(|(a, _)| a == address)
            .count()
    }

    /// Yield until `address` has been requested.
    pub async fn wait_for_request(&self, address: &str) -> CancelToken {
        loop {
            if let Some(token) = self.token_for(address) {
                return token;
            }
            tokio::task::yield_now().await;
        }
    }

    fn is_gated(&self, address: &str) -> bool {
        self.gated.lock().expect("gate lock").contains(address)
    }
}

impl Loader for GatedLoader {
    fn load_bytes<'a>(
        &'a self,
        address: &'a str,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<Vec<u8>, LoadError>> {
        Box::pin(async move {
            self.requests
                .lock()
                .expect("requests lock")
                .push((address.to_string(), cancel.clone()));
            loop {
                let notified = self.gate.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if !self.is_gated(address) {
                    break;
                }
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(LoadError::Cancelled),
                    () = &mut notified => {}
                }
            }
            self.inner.load_bytes(address, cancel).await
        })
    }
}

/// Service under test plus handles to its collaborators.
pub struct Harness {
    pub service: LocalizationService,
    pub loader: Arc<GatedLoader>,
    pub persisted: Arc<MemoryLocaleStore>,
}

/// What: Service over en-US, ru-RU, de-DE with en-US as default and `UI` required.
///
/// Inputs:
/// - `loader`: Bundle to serve, wrapped in a [`GatedLoader`]
pub fn harness(loader: BundleLoader) -> Harness {
    harness_with(loader, MemoryLocaleStore::new())
}

/// What: Like [`harness`] with a pre-seeded persistence store.
pub fn harness_with(loader: BundleLoader, persisted: MemoryLocaleStore) -> Harness {
    let loader = Arc::new(GatedLoader::new(loader));
    let persisted = Arc::new(persisted);
    let dyn_persisted: Arc<dyn LocalePersistence> = persisted.clone();
    let service = service_with(&loader, dyn_persisted, default_policy());
    Harness {
        service,
        loader,
        persisted,
    }
}

/// What: en-US default with `de-CH` mapped onto `de-DE`.
pub fn default_policy() -> LocalePolicy {
    LocalePolicy::new(id("en-US")).with_fallback(id("de-CH"), id("de-DE"))
}

/// What: Service over en-US, ru-RU, de-DE with explicit collaborators.
pub fn service_with(
    loader: &Arc<GatedLoader>,
    persistence: Arc<dyn LocalePersistence>,
    policy: LocalePolicy,
) -> LocalizationService {
    let catalog = StaticCatalog::new(
        [id("en-US"), id("ru-RU"), id("de-DE")],
        [TextTableId::new("UI").expect("valid table")],
    );
    let dyn_loader: Arc<dyn Loader> = loader.clone();
    LocalizationService::builder(Arc::new(catalog), dyn_loader, policy)
        .persistence(persistence)
        .build()
}

/// Persistence whose saves of one locale wait until released.
pub struct HeldSaveStore {
    inner: MemoryLocaleStore,
    held: Mutex<Option<String>>,
    started: Mutex<Vec<String>>,
    release: Notify,
}

impl HeldSaveStore {
    /// Hold saves of `locale` until [`HeldSaveStore::release`].
    pub fn holding(locale: &str) -> Self {
        Self {
            inner: MemoryLocaleStore::new(),
            held: Mutex::new(Some(locale.to_string())),
            started: Mutex::new(Vec::new()),
            release: Notify::new(),
        }
    }

    /// Let held saves complete.
    pub fn release(&self) {
        self.held.lock().expect("held lock").take();
        self.release.notify_waiters();
    }

    /// Last value written.
    pub fn saved(&self) -> Option<String> {
        self.inner.saved()
    }

    /// Yield until a save of `locale` has started.
    pub async fn wait_for_save(&self, locale: &str) {
        while !self
            .started
            .lock()
            .expect("started lock")
            .iter()
            .any(|l| l == locale)
        {
            tokio::task::yield_now().await;
        }
    }

    fn is_held(&self, locale: &str) -> bool {
        self.held.lock().expect("held lock").as_deref() == Some(locale)
    }
}

impl LocalePersistence for HeldSaveStore {
    fn load(&self) -> BoxFuture<'_, std::io::Result<Option<LocaleId>>> {
        self.inner.load()
    }

    fn save<'a>(&'a self, locale: &'a LocaleId) -> BoxFuture<'a, std::io::Result<()>> {
        Box::pin(async move {
            self.started
                .lock()
                .expect("started lock")
                .push(locale.to_string());
            loop {
                let released = self.release.notified();
                tokio::pin!(released);
                released.as_mut().enable();
                if !self.is_held(locale.as_str()) {
                    break;
                }
                released.await;
            }
            self.inner.save(locale).await
        })
    }
}

/// Yield to the runtime so spawned subscription tasks catch up.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// What: Harness that has already installed en-US.
pub async fn ready_harness() -> Harness {
    let h = harness(bundle());
    let locale = h
        .service
        .initialize(&CancelToken::never())
        .await
        .expect("initialization succeeds");
    assert_eq!(locale, id("en-US"));
    h
}
