//! Live text subscriptions.
//!
//! Each subscription runs one small task that waits on the locale watch
//! channel and, optionally, an argument watch channel. Whenever either fires
//! it resolves the key again against the latest store snapshot and pushes the
//! result into the subscriber's channel.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{mpsc, watch};

use super::{LocalizationService, diagnostic_placeholder, resolve_text};
use crate::i18n::cancel::{CancelSource, CancelToken};
use crate::i18n::format::TextArgs;
use crate::i18n::ids::LocaleId;
use crate::i18n::store::TextStore;

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: u64,
    active: HashMap<u64, CancelSource>,
    closed: bool,
}

/// Tracks live subscriptions so dispose can stop all of them.
#[derive(Debug, Default)]
pub(super) struct SubscriptionRegistry {
    inner: Mutex<RegistryInner>,
}

impl SubscriptionRegistry {
    /// New subscription id and stop token, or `None` once closed.
    fn register(&self) -> Option<(u64, CancelToken)> {
        let mut inner = self.lock();
        if inner.closed {
            return None;
        }
        inner.next_id += 1;
        let id = inner.next_id;
        let source = CancelSource::new();
        let token = source.token();
        inner.active.insert(id, source);
        Some((id, token))
    }

    fn release(&self, id: u64) {
        let removed = self.lock().active.remove(&id);
        if let Some(source) = removed {
            source.cancel();
            tracing::trace!(id, "Subscription released");
        }
    }

    /// Stop every subscription and refuse new ones. Returns how many were live.
    pub(super) fn close(&self) -> usize {
        let drained: Vec<CancelSource> = {
            let mut inner = self.lock();
            inner.closed = true;
            inner.active.drain().map(|(_, source)| source).collect()
        };
        for source in &drained {
            source.cancel();
        }
        drained.len()
    }

    pub(super) fn len(&self) -> usize {
        self.lock().active.len()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Stream of resolved text for one (table, key) pair.
///
/// Yields the current text immediately, then a fresh value after every
/// locale change and every argument change. Ends after `unsubscribe`, on
/// drop, or when the service is disposed.
#[derive(Debug)]
pub struct TextSubscription {
    id: Option<u64>,
    rx: mpsc::UnboundedReceiver<String>,
    registry: Weak<SubscriptionRegistry>,
}

impl TextSubscription {
    /// Subscription that yields `initial` and then ends.
    fn finished(initial: String) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(initial);
        Self {
            id: None,
            rx,
            registry: Weak::new(),
        }
    }

    /// Next value, or `None` once the subscription has ended and drained.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Next already-available value without waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// Whether updates can still arrive.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.id.is_some() && !self.rx.is_closed()
    }

    /// Stop receiving updates. Values already delivered stay readable.
    pub fn unsubscribe(&mut self) {
        if let Some(id) = self.id.take()
            && let Some(registry) = self.registry.upgrade()
        {
            registry.release(id);
        }
    }
}

impl Drop for TextSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl Stream for TextSubscription {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        self.rx.poll_recv(cx)
    }
}

/// State owned by one subscription's update task.
struct SubscriptionTask {
    store: Arc<TextStore>,
    table: String,
    key: String,
    locale_rx: watch::Receiver<Option<LocaleId>>,
    args_rx: Option<watch::Receiver<TextArgs>>,
    latest_args: Option<TextArgs>,
    stop: CancelToken,
    tx: mpsc::UnboundedSender<String>,
}

impl SubscriptionTask {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                () = self.stop.cancelled() => break,
                changed = self.locale_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = next_args(&mut self.args_rx) => {
                    if changed.is_err() {
                        // Argument source is gone; keep the last arguments.
                        self.args_rx = None;
                        continue;
                    }
                    self.latest_args = self
                        .args_rx
                        .as_mut()
                        .map(|rx| rx.borrow_and_update().clone());
                }
            }
            let text = resolve_text(&self.store, &self.table, &self.key, self.latest_args.as_ref());
            if self.tx.send(text).is_err() {
                break;
            }
        }
        tracing::trace!(table = %self.table, key = %self.key, "Subscription task finished");
    }
}

async fn next_args(
    rx: &mut Option<watch::Receiver<TextArgs>>,
) -> Result<(), watch::error::RecvError> {
    match rx {
        Some(rx) => rx.changed().await,
        None => std::future::pending().await,
    }
}

impl LocalizationService {
    /// What: Observe the text for (`table`, `key`).
    ///
    /// Inputs:
    /// - `table`: Table name
    /// - `key`: Key inside the table
    /// - `args`: Optional live arguments; each new value re-emits the text
    ///
    /// Output:
    /// - Subscription yielding the current text first, then updates
    ///
    /// Details:
    /// - After `dispose` the subscription yields the diagnostic placeholder and ends
    /// - Updates are driven by a task on the current tokio runtime; outside a
    ///   runtime the subscription yields the current text and ends
    /// - Argument updates stop when the sender side is dropped; locale updates
    ///   keep using the last arguments seen
    #[must_use]
    pub fn observe(
        &self,
        table: &str,
        key: &str,
        args: Option<watch::Receiver<TextArgs>>,
    ) -> TextSubscription {
        let table = table.trim().to_string();
        let key = key.trim().to_string();

        let registration = if self.is_disposed() {
            None
        } else {
            self.subscriptions.register()
        };
        let Some((id, stop)) = registration else {
            tracing::debug!(
                table = %table,
                key = %key,
                "Observe after dispose; no updates will follow"
            );
            return TextSubscription::finished(diagnostic_placeholder(&table, &key));
        };

        // Subscribe before the first resolve so no install slips in between.
        let locale_rx = self.current_locale.subscribe();
        let mut args_rx = args;
        let latest_args = args_rx.as_mut().map(|rx| rx.borrow_and_update().clone());
        let initial = resolve_text(&self.store, &table, &key, latest_args.as_ref());

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                table = %table,
                key = %key,
                "Observe outside a tokio runtime; no updates will follow"
            );
            self.subscriptions.release(id);
            return TextSubscription::finished(initial);
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(initial);
        let task = SubscriptionTask {
            store: Arc::clone(&self.store),
            table,
            key,
            locale_rx,
            args_rx,
            latest_args,
            stop,
            tx,
        };
        handle.spawn(task.run());
        TextSubscription {
            id: Some(id),
            rx,
            registry: Arc::downgrade(&self.subscriptions),
        }
    }
}
