//! Signal dispatcher — named broadcast channels with callback subscribers.
//!
//! Integrations announce discoveries by sending a payload on a named signal
//! (e.g. `"netatmo_create_doortag_sensor"`); platform listeners connect a
//! callback to that signal during setup and hold the returned
//! [`Subscription`] until the integration unloads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

struct Slot<T> {
    id: u64,
    callback: Callback<T>,
}

struct Inner<T> {
    next_id: AtomicU64,
    signals: Mutex<HashMap<String, Vec<Slot<T>>>>,
}

impl<T> Inner<T> {
    fn disconnect(&self, signal: &str, id: u64) {
        let mut signals = self
            .signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(slots) = signals.get_mut(signal) {
            slots.retain(|slot| slot.id != id);
            if slots.is_empty() {
                signals.remove(signal);
            }
        }
    }
}

/// Broadcasts payloads of type `T` to the callbacks connected to a signal.
///
/// Callbacks run synchronously on the sender's thread, in connection order,
/// after the internal lock is released, so a callback may itself connect or
/// send.
pub struct Dispatcher<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Dispatcher<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(0),
                signals: Mutex::new(HashMap::new()),
            }),
        }
    }
}

impl<T: Clone + 'static> Dispatcher<T> {
    /// Create a dispatcher with no signals.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect `callback` to `signal`.
    ///
    /// The callback stays connected until the returned [`Subscription`] is
    /// dropped or explicitly disconnected.
    #[must_use = "dropping the subscription disconnects the callback"]
    pub fn connect(
        &self,
        signal: impl Into<String>,
        callback: impl Fn(T) + Send + Sync + 'static,
    ) -> Subscription {
        let signal = signal.into();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut signals = self
                .inner
                .signals
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            signals.entry(signal.clone()).or_default().push(Slot {
                id,
                callback: Arc::new(callback),
            });
        }
        tracing::debug!(%signal, id, "signal connected");

        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        Subscription {
            disconnect: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.disconnect(&signal, id);
                    tracing::debug!(%signal, id, "signal disconnected");
                }
            })),
        }
    }

    /// Send `payload` to every callback connected to `signal`.
    ///
    /// Returns the number of callbacks invoked; sending on a signal nobody
    /// listens to is not an error.
    pub fn send(&self, signal: &str, payload: T) -> usize {
        let callbacks: Vec<Callback<T>> = {
            let signals = self
                .inner
                .signals
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            signals
                .get(signal)
                .map(|slots| slots.iter().map(|slot| Arc::clone(&slot.callback)).collect())
                .unwrap_or_default()
        };

        if callbacks.is_empty() {
            tracing::debug!(%signal, "signal sent with no subscribers");
        }
        for callback in &callbacks {
            callback(payload.clone());
        }
        callbacks.len()
    }

    /// Number of callbacks currently connected to `signal`.
    #[must_use]
    pub fn subscriber_count(&self, signal: &str) -> usize {
        self.inner
            .signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(signal)
            .map_or(0, Vec::len)
    }
}

/// Keeps a dispatcher callback connected; disconnects it on drop.
#[must_use = "dropping the subscription disconnects the callback"]
pub struct Subscription {
    disconnect: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Disconnect now instead of at drop.
    pub fn disconnect(mut self) {
        if let Some(disconnect) = self.disconnect.take() {
            disconnect();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(disconnect) = self.disconnect.take() {
            disconnect();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("connected", &self.disconnect.is_some())
            .finish()
    }
}
