//! Live observation of resolved text.

use futures::StreamExt;
use loctable::i18n::{CancelToken, LocalizationError, text_args};
use tokio::sync::watch;

use crate::common::{id, ready_harness, settle};

#[tokio::test]
/// What: A subscription yields the current text, then exactly one value per switch.
async fn observe_follows_locale_changes() {
    let h = ready_harness().await;
    let (_args_tx, args_rx) = watch::channel(text_args([("name", "Alice")]));
    let mut sub = h.service.observe("UI", "Test.Key", Some(args_rx));
    assert_eq!(sub.recv().await.as_deref(), Some("Hello, Alice!"));
    settle().await;
    assert_eq!(sub.try_recv(), None);

    h.service
        .set_locale(&id("ru-RU"), &CancelToken::never())
        .await
        .expect("switch succeeds");
    assert_eq!(sub.recv().await.as_deref(), Some("Привет, Alice!"));
    settle().await;
    assert_eq!(sub.try_recv(), None);

    h.service
        .set_locale(&id("en-US"), &CancelToken::never())
        .await
        .expect("switch back succeeds");
    assert_eq!(sub.next().await.as_deref(), Some("Hello, Alice!"));
    settle().await;
    assert_eq!(sub.try_recv(), None);
}

#[tokio::test]
/// What: A superseded switch never reaches subscribers.
///
/// Details:
/// - de-DE is held open and then superseded by ru-RU; the subscriber sees
///   the English text and then the Russian text, nothing in between
async fn observe_skips_superseded_switch() {
    let h = ready_harness().await;
    h.loader.gate("de-DE/UI");
    let mut sub = h.service.observe("UI", "Test.Key", None);

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
    settle().await;

    let mut seen = Vec::new();
    while let Some(text) = sub.try_recv() {
        seen.push(text);
    }
    assert_eq!(seen, ["Hello, {name}!", "Привет, {name}!"]);
}

#[tokio::test]
/// What: Argument updates re-emit with the latest arguments and current locale.
async fn observe_follows_argument_changes() {
    let h = ready_harness().await;
    let (args_tx, args_rx) = watch::channel(text_args([("name", "Alice")]));
    let mut sub = h.service.observe("UI", "Test.Key", Some(args_rx));
    assert_eq!(sub.recv().await.as_deref(), Some("Hello, Alice!"));

    args_tx.send_replace(text_args([("name", "Bob")]));
    assert_eq!(sub.recv().await.as_deref(), Some("Hello, Bob!"));

    // Closing the argument source keeps the last arguments for locale updates.
    drop(args_tx);
    h.service
        .set_locale(&id("ru-RU"), &CancelToken::never())
        .await
        .expect("switch succeeds");
    assert_eq!(sub.recv().await.as_deref(), Some("Привет, Bob!"));
}

#[tokio::test]
/// What: Missing keys are observed as placeholders, and fallback text is served.
async fn observe_missing_and_fallback_keys() {
    let h = ready_harness().await;
    let mut missing = h.service.observe("UI", "Nope", None);
    let mut english = h.service.observe("UI", "Only.English", None);
    assert_eq!(missing.recv().await.as_deref(), Some("[UI.Nope]"));
    assert_eq!(english.recv().await.as_deref(), Some("English only"));

    h.service
        .set_locale(&id("ru-RU"), &CancelToken::never())
        .await
        .expect("switch succeeds");
    assert_eq!(missing.recv().await.as_deref(), Some("[UI.Nope]"));
    assert_eq!(english.recv().await.as_deref(), Some("English only"));
}

#[tokio::test]
/// What: Unsubscribed or dropped subscriptions stop receiving updates.
async fn unsubscribe_stops_updates() {
    let h = ready_harness().await;
    let mut kept = h.service.observe("UI", "Test.Key", None);
    let mut stopped = h.service.observe("UI", "Test.Key", None);
    let dropped = h.service.observe("UI", "Test.Key", None);
    assert_eq!(h.service.active_subscriptions(), 3);

    stopped.unsubscribe();
    drop(dropped);
    assert_eq!(h.service.active_subscriptions(), 1);

    h.service
        .set_locale(&id("ru-RU"), &CancelToken::never())
        .await
        .expect("switch succeeds");

    assert_eq!(kept.recv().await.as_deref(), Some("Hello, {name}!"));
    assert_eq!(kept.recv().await.as_deref(), Some("Привет, {name}!"));
    assert_eq!(stopped.recv().await.as_deref(), Some("Hello, {name}!"));
    assert_eq!(stopped.recv().await, None);
}
