//! Initialization and locale switching.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use futures::future::{try_join, try_join_all};

use super::{LocalizationService, ServiceState};
use crate::i18n::cancel::{CancelSource, CancelToken};
use crate::i18n::detection::detect_system_locale;
use crate::i18n::error::{LoadError, LocalizationError};
use crate::i18n::ids::{LocaleId, TextTableId};
use crate::i18n::store::{LoadedLocaleSet, TextTable};

/// Identity of one switch, checked again before it may install.
#[derive(Debug)]
struct SwitchTicket {
    generation: u64,
    token: CancelToken,
}

type AssembledSets = (LoadedLocaleSet, Option<Arc<LoadedLocaleSet>>);

impl LocalizationService {
    /// What: Install the first locale.
    ///
    /// Inputs:
    /// - `cancel`: Caller-side cancellation
    ///
    /// Output:
    /// - The locale that was installed
    ///
    /// Details:
    /// - Candidates in order: persisted locale, system locale (when enabled),
    ///   default locale. Persisted and detected locales are mapped onto the
    ///   supported set through the fallback-override chain.
    /// - Each candidate that fails to load is reported on the error stream
    ///   and the next one is tried.
    /// - Already initialized: returns the current locale without reloading.
    ///
    /// # Errors
    /// - `Cancelled` when `cancel` fires or a `set_locale` supersedes it
    /// - The last candidate's failure, or `NoLoadableLocale` when there was
    ///   nothing to try
    /// - `Disposed` after `dispose`
    pub async fn initialize(&self, cancel: &CancelToken) -> Result<LocaleId, LocalizationError> {
        if self.is_disposed() {
            return Err(LocalizationError::Disposed);
        }
        if let Some(locale) = self.store.active_locale() {
            tracing::debug!(locale = %locale, "Already initialized");
            return Ok(locale);
        }
        let ticket = self.begin_switch(cancel)?;
        tracing::info!(generation = ticket.generation, "Initializing localization");
        let result = self.run_initialize(&ticket).await;
        self.finish(&ticket);
        match result {
            Err(err) if err.is_cancellation() => {
                tracing::debug!("Initialization cancelled");
                Err(LocalizationError::Cancelled)
            }
            other => other,
        }
    }

    /// What: Switch to `locale`.
    ///
    /// Inputs:
    /// - `locale`: Target locale
    /// - `cancel`: Caller-side cancellation
    ///
    /// Details:
    /// - Cancels whichever switch is still running; only the newest request installs
    /// - Loads every required table for the target and its fallback, then
    ///   installs them in one step. On failure nothing changes.
    /// - Requesting the locale that is already installed completes immediately
    ///   (after superseding any running switch)
    /// - The locale is persisted after a successful install unless a newer
    ///   switch has installed since; a persistence failure is logged and does
    ///   not fail the switch
    /// - A fallback locale the catalog does not list is skipped
    ///
    /// # Errors
    /// - `UnsupportedLocale` when the catalog does not list `locale`
    /// - `LoadFailure` when any required table cannot be loaded or parsed
    /// - `Cancelled` when superseded, disposed mid-flight, or `cancel` fires
    /// - `Disposed` after `dispose`
    pub async fn set_locale(
        &self,
        locale: &LocaleId,
        cancel: &CancelToken,
    ) -> Result<(), LocalizationError> {
        if self.is_disposed() {
            return Err(LocalizationError::Disposed);
        }
        let supported = self.catalog.supported_locales();
        if let Err(err) = self.policy.validate_locale(locale, &supported) {
            self.publish_error(&err);
            return Err(err);
        }
        let ticket = self.begin_switch(cancel)?;
        tracing::info!(locale = %locale, generation = ticket.generation, "Switching locale");
        let result = self.run_set_locale(locale, &ticket).await;
        self.finish(&ticket);
        match result {
            Err(err) if err.is_cancellation() => {
                tracing::debug!(locale = %locale, "Locale switch cancelled");
                Err(LocalizationError::Cancelled)
            }
            Err(err) => {
                self.publish_error(&err);
                Err(err)
            }
            Ok(()) => Ok(()),
        }
    }

    async fn run_initialize(&self, ticket: &SwitchTicket) -> Result<LocaleId, LocalizationError> {
        let supported = self.catalog.supported_locales();
        let candidates = self.startup_candidates(&supported, &ticket.token).await?;
        tracing::debug!(candidates = ?candidates, "Startup locale candidates");
        if candidates.is_empty() {
            let err = LocalizationError::NoLoadableLocale;
            self.publish_error(&err);
            return Err(err);
        }

        let mut last_error = None;
        for locale in candidates {
            match self.assemble(&locale, &ticket.token).await {
                Ok((active, fallback)) => {
                    self.commit(ticket, active, fallback)?;
                    return Ok(locale);
                }
                Err(err) if err.is_cancellation() => return Err(LocalizationError::Cancelled),
                Err(err) => {
                    self.publish_error(&err);
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or(LocalizationError::NoLoadableLocale))
    }

    async fn run_set_locale(
        &self,
        locale: &LocaleId,
        ticket: &SwitchTicket,
    ) -> Result<(), LocalizationError> {
        if self.store.active_locale().as_ref() == Some(locale) {
            tracing::debug!(locale = %locale, "Locale already active");
            return Ok(());
        }
        let (active, fallback) = self.assemble(locale, &ticket.token).await?;
        self.commit(ticket, active, fallback)?;
        self.persist(locale).await;
        Ok(())
    }

    /// Save `locale` if it is still the installed one.
    ///
    /// Saves run one at a time and each checks the store first, so the last
    /// write always names the locale installed most recently.
    async fn persist(&self, locale: &LocaleId) {
        let _order = self.persist_order.lock().await;
        if self.store.active_locale().as_ref() != Some(locale) {
            tracing::debug!(locale = %locale, "Newer locale installed; skipping save");
            return;
        }
        if let Err(e) = self.persistence.save(locale).await {
            tracing::warn!(locale = %locale, error = %e, "Failed to persist selected locale");
        }
    }

    /// Ordered, de-duplicated locales to try during initialization.
    async fn startup_candidates(
        &self,
        supported: &[LocaleId],
        cancel: &CancelToken,
    ) -> Result<Vec<LocaleId>, LocalizationError> {
        let persisted = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(LocalizationError::Cancelled),
            res = self.persistence.load() => match res {
                Ok(saved) => saved,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read persisted locale");
                    None
                }
            },
        };
        let detected = if self.detect_system_locale {
            detect_system_locale()
        } else {
            None
        };

        let mut candidates: Vec<LocaleId> = Vec::new();
        for candidate in persisted.iter().chain(detected.iter()) {
            match self.policy.resolve_startup_locale(candidate, supported) {
                Some(resolved) if !candidates.contains(&resolved) => candidates.push(resolved),
                Some(_) => {}
                None => tracing::debug!(locale = %candidate, "Ignoring unsupported startup locale"),
            }
        }
        let default = self.policy.default_locale();
        if supported.contains(default) {
            if !candidates.contains(default) {
                candidates.push(default.clone());
            }
        } else {
            tracing::warn!(locale = %default, "Default locale is not supported; not trying it");
        }
        Ok(candidates)
    }

    /// Load (or reuse) the sets for `locale` and its fallback, concurrently.
    async fn assemble(
        &self,
        locale: &LocaleId,
        cancel: &CancelToken,
    ) -> Result<AssembledSets, LocalizationError> {
        let required = self.required_tables();
        let snapshot = self.store.snapshot();
        let supported = self.catalog.supported_locales();
        let fallback_locale = self.policy.fallback_for(locale).filter(|fallback| {
            let servable = supported.contains(fallback);
            if !servable {
                tracing::warn!(
                    locale = %locale,
                    fallback = %fallback,
                    "Fallback locale is not supported; switching without fallback"
                );
            }
            servable
        });

        let active = async {
            match reusable_set(snapshot.as_deref(), locale, &required) {
                Some(set) => {
                    tracing::debug!(locale = %locale, "Reusing loaded tables");
                    Ok(set.detached())
                }
                None => self.load_set(locale, &required, cancel).await,
            }
        };
        let fallback = async {
            let Some(fallback_locale) = fallback_locale.as_ref() else {
                return Ok(None);
            };
            match reusable_set(snapshot.as_deref(), fallback_locale, &required) {
                Some(set) => {
                    tracing::debug!(locale = %fallback_locale, "Reusing loaded fallback tables");
                    Ok(Some(Arc::new(set.detached())))
                }
                None => self
                    .load_set(fallback_locale, &required, cancel)
                    .await
                    .map(|set| Some(Arc::new(set))),
            }
        };
        try_join(active, fallback).await
    }

    async fn load_set(
        &self,
        locale: &LocaleId,
        required: &BTreeSet<TextTableId>,
        cancel: &CancelToken,
    ) -> Result<LoadedLocaleSet, LocalizationError> {
        tracing::debug!(locale = %locale, tables = required.len(), "Loading text tables");
        let loads = required
            .iter()
            .map(|table| self.load_table(locale, table, cancel));
        let tables = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(LocalizationError::Cancelled),
            res = try_join_all(loads) => res?,
        };
        Ok(LoadedLocaleSet::new(
            locale.clone(),
            tables.into_iter().collect::<HashMap<_, _>>(),
        ))
    }

    async fn load_table(
        &self,
        locale: &LocaleId,
        table: &TextTableId,
        cancel: &CancelToken,
    ) -> Result<(TextTableId, Arc<TextTable>), LocalizationError> {
        let failure = |source: LoadError| {
            if matches!(source, LoadError::Cancelled) || cancel.is_cancelled() {
                LocalizationError::Cancelled
            } else {
                LocalizationError::LoadFailure {
                    locale: locale.clone(),
                    table: table.clone(),
                    source,
                }
            }
        };
        let address = self
            .catalog
            .address_for(locale, table)
            .ok_or_else(|| failure(LoadError::NoAddress))?;
        let bytes = self
            .loader
            .load_bytes(&address, cancel)
            .await
            .map_err(failure)?;
        let parsed = self
            .parser
            .parse(&bytes)
            .map_err(|e| failure(LoadError::Parse(e)))?;
        if (!parsed.locale.is_empty() && parsed.locale != locale.as_str())
            || (!parsed.table.is_empty() && parsed.table != table.as_str())
        {
            tracing::warn!(
                address = %address,
                expected_locale = %locale,
                expected_table = %table,
                payload_locale = %parsed.locale,
                payload_table = %parsed.table,
                "Table payload names a different locale or table"
            );
        }
        tracing::debug!(
            locale = %locale,
            table = %table,
            entries = parsed.entries.len(),
            "Loaded text table"
        );
        Ok((table.clone(), Arc::new(parsed.entries)))
    }

    /// Supersede the running switch and register a new one.
    fn begin_switch(&self, cancel: &CancelToken) -> Result<SwitchTicket, LocalizationError> {
        let mut slot = self.lock_switch();
        if self.is_disposed() {
            return Err(LocalizationError::Disposed);
        }
        if let Some(previous) = slot.in_flight.take() {
            tracing::debug!(generation = slot.generation, "Superseding in-flight locale switch");
            previous.cancel();
        }
        slot.generation += 1;
        let source = CancelSource::child_of(cancel);
        let ticket = SwitchTicket {
            generation: slot.generation,
            token: source.token(),
        };
        slot.in_flight = Some(source);
        self.set_busy(true);
        self.state.send_replace(if self.store.is_loaded() {
            ServiceState::SwitchingLocale
        } else {
            ServiceState::Initializing
        });
        Ok(ticket)
    }

    /// Install the assembled sets if `ticket` is still the newest switch.
    fn commit(
        &self,
        ticket: &SwitchTicket,
        active: LoadedLocaleSet,
        fallback: Option<Arc<LoadedLocaleSet>>,
    ) -> Result<(), LocalizationError> {
        let slot = self.lock_switch();
        if slot.generation != ticket.generation
            || ticket.token.is_cancelled()
            || self.is_disposed()
        {
            return Err(LocalizationError::Cancelled);
        }
        let locale = active.locale().clone();
        self.store.replace(active, fallback);
        self.current_locale.send_replace(Some(locale.clone()));
        drop(slot);
        tracing::info!(locale = %locale, "Locale installed");
        Ok(())
    }

    /// Release the slot if `ticket` still owns it and settle busy/state.
    fn finish(&self, ticket: &SwitchTicket) {
        let mut slot = self.lock_switch();
        if slot.generation != ticket.generation {
            return;
        }
        slot.in_flight = None;
        self.set_busy(false);
        self.state.send_replace(if self.is_disposed() {
            ServiceState::Disposed
        } else if self.store.is_loaded() {
            ServiceState::Ready
        } else {
            ServiceState::Uninitialized
        });
    }
}

/// The snapshot's active or fallback set when it is `locale` and covers `required`.
fn reusable_set<'a>(
    snapshot: Option<&'a LoadedLocaleSet>,
    locale: &LocaleId,
    required: &BTreeSet<TextTableId>,
) -> Option<&'a LoadedLocaleSet> {
    let snapshot = snapshot?;
    std::iter::once(snapshot)
        .chain(snapshot.fallback().map(Arc::as_ref))
        .find(|set| set.locale() == locale && set.covers(required))
}
