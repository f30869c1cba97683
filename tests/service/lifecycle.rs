//! Dispose and service-state transitions.

use loctable::i18n::{CancelToken, LocalizationError, ServiceState};

use crate::common::{bundle, harness, id, ready_harness};

#[tokio::test]
/// What: Dispose ends subscriptions, refuses new work and is idempotent.
async fn dispose_ends_subscriptions() {
    let h = ready_harness().await;
    let mut sub = h.service.observe("UI", "Test.Key", None);
    assert_eq!(h.service.active_subscriptions(), 1);

    h.service.dispose();
    h.service.dispose();

    assert_eq!(h.service.state(), ServiceState::Disposed);
    assert_eq!(h.service.active_subscriptions(), 0);
    assert_eq!(sub.recv().await.as_deref(), Some("Hello, {name}!"));
    assert_eq!(sub.recv().await, None);

    assert!(matches!(
        h.service
            .set_locale(&id("ru-RU"), &CancelToken::never())
            .await,
        Err(LocalizationError::Disposed)
    ));
    assert!(matches!(
        h.service.initialize(&CancelToken::never()).await,
        Err(LocalizationError::Disposed)
    ));

    // Resolution still serves the last installed set.
    assert_eq!(h.service.resolve("UI", "Test.Key", None), "Hello, {name}!");
    let mut late = h.service.observe("UI", "Test.Key", None);
    assert_eq!(late.recv().await.as_deref(), Some("[UI.Test.Key]"));
    assert_eq!(late.recv().await, None);
}

#[tokio::test]
/// What: Disposing during a switch cancels it without installing anything.
async fn dispose_cancels_in_flight_switch() {
    let h = ready_harness().await;
    h.loader.gate("ru-RU/UI");
    let mut errors = h.service.errors();

    let target = id("ru-RU");
    let never = CancelToken::never();
    let (result, ()) = tokio::join!(
        h.service.set_locale(&target, &never),
        async {
            let token = h.loader.wait_for_request("ru-RU/UI").await;
            h.service.dispose();
            assert!(token.is_cancelled());
        }
    );

    assert!(matches!(result, Err(LocalizationError::Cancelled)));
    assert!(errors.try_recv().is_err());
    assert_eq!(h.service.current_locale(), Some(id("en-US")));
    assert_eq!(h.service.state(), ServiceState::Disposed);
    assert!(!h.service.is_busy());
}

#[tokio::test]
/// What: State moves Uninitialized -> Initializing -> Ready during startup.
async fn state_transitions_during_initialization() {
    let h = harness(bundle());
    h.loader.gate("en-US/UI");
    let mut states = h.service.watch_state();
    assert_eq!(*states.borrow_and_update(), ServiceState::Uninitialized);

    let never = CancelToken::never();
    let (result, ()) = tokio::join!(h.service.initialize(&never), async {
        h.loader.wait_for_request("en-US/UI").await;
        assert_eq!(h.service.state(), ServiceState::Initializing);
        assert!(h.service.is_busy());
        h.loader.open();
    });

    assert_eq!(result.expect("initialization succeeds"), id("en-US"));
    assert!(states.has_changed().expect("service alive"));
    assert_eq!(*states.borrow_and_update(), ServiceState::Ready);
}

#[tokio::test]
/// What: The current-locale watch fires once per successful install.
async fn current_locale_watch_fires_on_install() {
    let h = ready_harness().await;
    let mut locale_rx = h.service.watch_current_locale();
    h.service
        .set_locale(&id("de-DE"), &CancelToken::never())
        .await
        .expect("switch succeeds");
    locale_rx.changed().await.expect("service alive");
    assert_eq!(*locale_rx.borrow_and_update(), Some(id("de-DE")));
}
