//! Locale admission and fallback rules.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::i18n::config::I18nConfig;
use crate::i18n::error::{IdError, LocalizationError};
use crate::i18n::ids::{LocaleId, TextTableId};

/// Upper bound on fallback-chain steps walked when mapping a startup locale.
pub const MAX_FALLBACK_CHAIN: usize = 10;

/// Default locale, per-locale fallbacks and startup tables.
#[derive(Debug, Clone)]
pub struct LocalePolicy {
    default_locale: LocaleId,
    fallbacks: HashMap<LocaleId, LocaleId>,
    startup_tables: BTreeSet<TextTableId>,
}

impl LocalePolicy {
    /// Policy with only a default locale: no overrides, no startup tables.
    #[must_use]
    pub fn new(default_locale: LocaleId) -> Self {
        Self {
            default_locale,
            fallbacks: HashMap::new(),
            startup_tables: BTreeSet::new(),
        }
    }

    /// Override the fallback of `locale`.
    #[must_use]
    pub fn with_fallback(mut self, locale: LocaleId, fallback: LocaleId) -> Self {
        self.fallbacks.insert(locale, fallback);
        self
    }

    /// Add tables that must be loaded before a locale can be installed.
    #[must_use]
    pub fn with_startup_tables(mut self, tables: impl IntoIterator<Item = TextTableId>) -> Self {
        self.startup_tables.extend(tables);
        self
    }

    /// What: Build a policy from `i18n.yml` settings.
    ///
    /// Inputs:
    /// - `config`: Parsed configuration
    ///
    /// Output:
    /// - Policy with the configured default locale, fallbacks and startup tables
    ///
    /// # Errors
    /// - Returns `Err` when any configured code is blank
    pub fn from_config(config: &I18nConfig) -> Result<Self, IdError> {
        let mut policy = Self::new(LocaleId::new(config.default_locale.as_str())?);
        for (locale, fallback) in &config.fallbacks {
            policy = policy.with_fallback(
                LocaleId::new(locale.as_str())?,
                LocaleId::new(fallback.as_str())?,
            );
        }
        let tables = config
            .startup_tables
            .iter()
            .map(|t| TextTableId::new(t.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(policy.with_startup_tables(tables))
    }

    /// Locale used when nothing else is selected.
    #[must_use]
    pub const fn default_locale(&self) -> &LocaleId {
        &self.default_locale
    }

    /// Tables that must be fully loaded for any locale.
    #[must_use]
    pub const fn startup_tables(&self) -> &BTreeSet<TextTableId> {
        &self.startup_tables
    }

    /// What: Check that `locale` may be selected.
    ///
    /// Inputs:
    /// - `locale`: Requested locale
    /// - `supported`: Locales the catalog can serve
    ///
    /// Output:
    /// - `Ok(())` when supported
    ///
    /// # Errors
    /// - Returns `LocalizationError::UnsupportedLocale` otherwise
    pub fn validate_locale(
        &self,
        locale: &LocaleId,
        supported: &[LocaleId],
    ) -> Result<(), LocalizationError> {
        if supported.contains(locale) {
            Ok(())
        } else {
            Err(LocalizationError::UnsupportedLocale {
                locale: locale.clone(),
            })
        }
    }

    /// What: Single-level fallback locale for `locale`.
    ///
    /// Inputs:
    /// - `locale`: Active locale
    ///
    /// Output:
    /// - Configured override, else the default locale, else `None`
    ///
    /// Details:
    /// - The default locale never has a fallback, and no locale falls back to itself
    #[must_use]
    pub fn fallback_for(&self, locale: &LocaleId) -> Option<LocaleId> {
        if *locale == self.default_locale {
            return None;
        }
        let fallback = self.fallbacks.get(locale).unwrap_or(&self.default_locale);
        (fallback != locale).then(|| fallback.clone())
    }

    /// What: Map a remembered or detected locale onto a supported one.
    ///
    /// Inputs:
    /// - `candidate`: Locale to start from (e.g. persisted `de-CH`)
    /// - `supported`: Locales the catalog can serve
    ///
    /// Output:
    /// - `candidate` itself if supported, else the first supported locale on its
    ///   fallback-override chain, else `None`
    ///
    /// Details:
    /// - Walks only explicit overrides, never the default, so callers can
    ///   decide where the default sits in their own candidate order
    /// - Stops on cycles and after a bounded number of steps
    #[must_use]
    pub fn resolve_startup_locale(
        &self,
        candidate: &LocaleId,
        supported: &[LocaleId],
    ) -> Option<LocaleId> {
        let mut current = candidate;
        let mut visited = HashSet::new();
        while visited.insert(current) {
            if supported.contains(current) {
                if current != candidate {
                    tracing::debug!(
                        requested = %candidate,
                        resolved = %current,
                        "Locale resolved via fallback chain"
                    );
                }
                return Some(current.clone());
            }
            if visited.len() > MAX_FALLBACK_CHAIN {
                tracing::warn!(
                    locale = %candidate,
                    steps = visited.len(),
                    "Fallback chain too long"
                );
                return None;
            }
            current = self.fallbacks.get(current)?;
        }
        tracing::warn!(locale = %candidate, "Detected cycle in fallback chain");
        None
    }
}
