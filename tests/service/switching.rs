//! Locale switching: supersession, fallback, failures and persistence.

use std::sync::Arc;

use loctable::i18n::{
    BundleLoader, CancelSource, CancelToken, LocalePersistence, LocalePolicy, LocalizationError,
    MemoryLocaleStore, ServiceState, text_args,
};

use crate::common::{
    GatedLoader, HeldSaveStore, bundle, default_policy, harness, harness_with, id, payload,
    ready_harness, service_with,
};

#[tokio::test]
/// What: A newer switch cancels the older one and wins.
///
/// Details:
/// - de-DE is held open by the loader; ru-RU is requested while it waits
/// - The de-DE call reports `Cancelled`, its load token is cancelled, and
///   nothing is published on the error stream
async fn newer_switch_supersedes_pending_one() {
    let h = ready_harness().await;
    h.loader.gate("de-DE/UI");
    let mut errors = h.service.errors();

    let target = id("de-DE");
    let never = CancelToken::never();
    let (first, second) = tokio::join!(
        h.service.set_locale(&target, &never),
        async {
            h.loader.wait_for_request("de-DE/UI").await;
            h.service.set_locale(&id("ru-RU"), &CancelToken::never()).await
        }
    );

    assert!(matches!(first, Err(LocalizationError::Cancelled)));
    second.expect("ru-RU switch succeeds");
    let de_token = h.loader.token_for("de-DE/UI").expect("de-DE was requested");
    assert!(de_token.is_cancelled());
    assert_eq!(h.service.current_locale(), Some(id("ru-RU")));
    assert_eq!(h.persisted.saved().as_deref(), Some("ru-RU"));
    assert!(errors.try_recv().is_err());
    assert_eq!(h.service.state(), ServiceState::Ready);
    assert!(!h.service.is_busy());
}

#[tokio::test]
/// What: Missing keys fall back to the default locale, then to a placeholder.
async fn fallback_then_placeholder() {
    let h = ready_harness().await;
    h.service
        .set_locale(&id("ru-RU"), &CancelToken::never())
        .await
        .expect("switch succeeds");

    let args = text_args([("name", "Alice")]);
    assert_eq!(
        h.service.resolve("UI", "Test.Key", Some(&args)),
        "Привет, Alice!"
    );
    assert_eq!(h.service.resolve("UI", "Only.English", None), "English only");
    assert_eq!(h.service.resolve("UI", "Nope", None), "[UI.Nope]");
    assert_eq!(h.service.resolve("Menu", "Test.Key", None), "[Menu.Test.Key]");
}

#[tokio::test]
/// What: Arguments substitute by name; unknown placeholders stay verbatim.
async fn resolve_substitutes_named_arguments() {
    let h = ready_harness().await;
    let args = text_args([("name", "Alice"), ("unused", "x")]);
    assert_eq!(h.service.resolve("UI", "Test.Key", Some(&args)), "Hello, Alice!");
    assert_eq!(h.service.resolve("UI", "Test.Key", None), "Hello, {name}!");
}

#[tokio::test]
/// What: A failed load leaves the installed locale, text and persistence untouched.
async fn load_failure_keeps_previous_locale() {
    let loader = bundle().with("de-DE/UI", b"{\"entries\": {}}".to_vec());
    let h = harness(loader);
    h.service
        .initialize(&CancelToken::never())
        .await
        .expect("initialization succeeds");
    let mut errors = h.service.errors();

    let err = h
        .service
        .set_locale(&id("de-DE"), &CancelToken::never())
        .await
        .expect_err("empty entries are rejected");
    assert!(matches!(
        err,
        LocalizationError::LoadFailure { ref locale, ref table, .. }
            if locale.as_str() == "de-DE" && table.as_str() == "UI"
    ));
    assert!(matches!(
        errors.try_recv(),
        Ok(LocalizationError::LoadFailure { .. })
    ));
    assert_eq!(h.service.current_locale(), Some(id("en-US")));
    assert_eq!(
        h.service.resolve("UI", "Test.Key", Some(&text_args([("name", "Bo")]))),
        "Hello, Bo!"
    );
    assert_eq!(h.persisted.saved(), None);
}

#[tokio::test]
/// What: A missing fallback table fails the whole switch.
///
/// Details:
/// - ru-RU's own table loads but its en-US fallback is absent, so nothing installs
async fn missing_fallback_table_fails_switch() {
    let loader =
        BundleLoader::new().with("ru-RU/UI", payload("ru-RU", "UI", &[("Test.Key", "Привет")]));
    let h = harness(loader);
    let err = h
        .service
        .set_locale(&id("ru-RU"), &CancelToken::never())
        .await
        .expect_err("fallback table is absent");
    assert!(matches!(
        err,
        LocalizationError::LoadFailure { ref locale, .. } if locale.as_str() == "en-US"
    ));
    assert_eq!(h.service.current_locale(), None);
    assert!(!h.service.store().is_loaded());
}

#[tokio::test]
/// What: Unsupported locales are rejected before anything is loaded.
async fn unsupported_locale_is_rejected() {
    let h = ready_harness().await;
    let mut errors = h.service.errors();
    let err = h
        .service
        .set_locale(&id("fr-FR"), &CancelToken::never())
        .await
        .expect_err("fr-FR is not in the catalog");
    assert!(matches!(err, LocalizationError::UnsupportedLocale { .. }));
    assert!(matches!(
        errors.try_recv(),
        Ok(LocalizationError::UnsupportedLocale { .. })
    ));
    assert_eq!(h.loader.request_count("fr-FR/UI"), 0);
    assert_eq!(h.service.current_locale(), Some(id("en-US")));
}

#[tokio::test]
/// What: Caller cancellation mid-load is silent and changes nothing.
async fn caller_cancellation_mid_load() {
    let h = ready_harness().await;
    h.loader.gate("ru-RU/UI");
    let mut errors = h.service.errors();
    let source = CancelSource::new();
    let token = source.token();

    let target = id("ru-RU");
    let (result, ()) = tokio::join!(h.service.set_locale(&target, &token), async {
        h.loader.wait_for_request("ru-RU/UI").await;
        source.cancel();
    });

    assert!(matches!(result, Err(LocalizationError::Cancelled)));
    assert!(errors.try_recv().is_err());
    assert_eq!(h.service.current_locale(), Some(id("en-US")));
    assert_eq!(h.persisted.saved(), None);
    assert!(!h.service.is_busy());
}

#[tokio::test]
/// What: Busy and state reflect a running switch.
async fn busy_and_state_track_running_switch() {
    let h = ready_harness().await;
    h.loader.gate("ru-RU/UI");

    let target = id("ru-RU");
    let never = CancelToken::never();
    let (result, ()) = tokio::join!(
        h.service.set_locale(&target, &never),
        async {
            h.loader.wait_for_request("ru-RU/UI").await;
            assert!(h.service.is_busy());
            assert_eq!(h.service.state(), ServiceState::SwitchingLocale);
            h.loader.open();
        }
    );

    result.expect("switch completes once released");
    assert!(!h.service.is_busy());
    assert_eq!(h.service.state(), ServiceState::Ready);
    assert_eq!(h.service.current_locale(), Some(id("ru-RU")));
}

#[tokio::test]
/// What: Requesting the active locale completes without loading or persisting.
async fn same_locale_is_a_no_op() {
    let h = ready_harness().await;
    let before = h.loader.request_count("en-US/UI");
    let locale_rx = h.service.watch_current_locale();

    h.service
        .set_locale(&id("en-US"), &CancelToken::never())
        .await
        .expect("no-op succeeds");

    assert_eq!(h.loader.request_count("en-US/UI"), before);
    assert!(!locale_rx.has_changed().expect("service alive"));
    assert_eq!(h.persisted.saved(), None);
}

#[tokio::test]
/// What: Switching before initialization installs the requested locale directly.
async fn set_locale_before_initialize() {
    let h = harness(bundle());
    h.service
        .set_locale(&id("de-DE"), &CancelToken::never())
        .await
        .expect("switch succeeds");
    assert_eq!(h.service.current_locale(), Some(id("de-DE")));
    let locale = h
        .service
        .initialize(&CancelToken::never())
        .await
        .expect("already initialized");
    assert_eq!(locale, id("de-DE"));
}

#[tokio::test]
/// What: Startup maps a persisted regional locale through the fallback overrides.
async fn initialize_uses_persisted_locale() {
    let h = harness_with(bundle(), MemoryLocaleStore::with_saved("de-CH"));
    let locale = h
        .service
        .initialize(&CancelToken::never())
        .await
        .expect("initialization succeeds");
    assert_eq!(locale, id("de-DE"));
    assert_eq!(
        h.service.resolve("UI", "Only.English", None),
        "English only"
    );
}

#[tokio::test]
/// What: A persisted locale that cannot load gives way to the default.
async fn initialize_falls_back_to_default() {
    let loader = bundle().with("ru-RU/UI", b"\xff\xfe".to_vec());
    let h = harness_with(loader, MemoryLocaleStore::with_saved("ru-RU"));
    let mut errors = h.service.errors();
    let locale = h
        .service
        .initialize(&CancelToken::never())
        .await
        .expect("default locale loads");
    assert_eq!(locale, id("en-US"));
    assert!(matches!(
        errors.try_recv(),
        Ok(LocalizationError::LoadFailure { ref locale, .. }) if locale.as_str() == "ru-RU"
    ));
}

#[tokio::test]
/// What: Initialization fails when not even the default locale loads.
async fn initialize_fails_when_nothing_loads() {
    let h = harness(BundleLoader::new());
    let err = h
        .service
        .initialize(&CancelToken::never())
        .await
        .expect_err("no tables at all");
    assert!(matches!(err, LocalizationError::LoadFailure { .. }));
    assert_eq!(h.service.state(), ServiceState::Uninitialized);
    assert_eq!(h.service.resolve("UI", "Test.Key", None), "[UI.Test.Key]");
}

#[tokio::test]
/// What: A slow save from an older switch never outlives a newer switch's save.
///
/// Details:
/// - The ru-RU save is held open while de-DE installs; once released, the
///   persisted locale must match the installed one
async fn slow_save_does_not_overwrite_newer_locale() {
    let store = Arc::new(HeldSaveStore::holding("ru-RU"));
    let loader = Arc::new(GatedLoader::new(bundle()));
    let persistence: Arc<dyn LocalePersistence> = store.clone();
    let service = service_with(&loader, persistence, default_policy());
    service
        .initialize(&CancelToken::never())
        .await
        .expect("initialization succeeds");

    let target = id("ru-RU");
    let never = CancelToken::never();
    let (first, second, ()) = tokio::join!(
        service.set_locale(&target, &never),
        async {
            store.wait_for_save("ru-RU").await;
            service.set_locale(&id("de-DE"), &CancelToken::never()).await
        },
        async {
            while service.current_locale() != Some(id("de-DE")) {
                tokio::task::yield_now().await;
            }
            store.release();
        }
    );

    first.expect("ru-RU installed before being superseded");
    second.expect("de-DE switch succeeds");
    assert_eq!(service.current_locale(), Some(id("de-DE")));
    assert_eq!(store.saved().as_deref(), Some("de-DE"));
    assert!(!service.is_busy());
}

#[tokio::test]
/// What: A fallback locale missing from the catalog is skipped, not loaded.
async fn unsupported_fallback_is_skipped() {
    let loader = Arc::new(GatedLoader::new(bundle()));
    let policy = LocalePolicy::new(id("en-US")).with_fallback(id("ru-RU"), id("fr-FR"));
    let service = service_with(&loader, Arc::new(MemoryLocaleStore::new()), policy);
    let mut errors = service.errors();

    service
        .set_locale(&id("ru-RU"), &CancelToken::never())
        .await
        .expect("switch succeeds without a fallback");

    assert_eq!(service.current_locale(), Some(id("ru-RU")));
    assert_eq!(
        service.resolve("UI", "Test.Key", Some(&text_args([("name", "Ann")]))),
        "Привет, Ann!"
    );
    assert_eq!(service.resolve("UI", "Only.English", None), "[UI.Only.English]");
    assert_eq!(loader.request_count("fr-FR/UI"), 0);
    assert!(errors.try_recv().is_err());
}
