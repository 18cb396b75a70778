use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;
use tracing::{debug, info};

/// What observers of the session signal are told.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session became invalid. Sent once per episode.
    Expired { episode: u64 },
    /// Someone acknowledged the expiry; a modal can be dismissed everywhere.
    Acknowledged { episode: u64 },
}

type Observer = Arc<dyn Fn(SessionEvent) + Send + Sync>;

struct SignalState {
    raised: bool,
    episode: u64,
    next_id: u64,
    observers: BTreeMap<u64, Observer>,
}

struct SignalInner {
    state: Mutex<SignalState>,
    raised_tx: watch::Sender<bool>,
}

impl SignalInner {
    fn lock(&self) -> MutexGuard<'_, SignalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Process-wide "session expired" broadcast.
///
/// However many requests discover the expiry, observers hear about it once until
/// [`SessionSignal::acknowledge`] is called.
#[derive(Clone)]
pub struct SessionSignal {
    inner: Arc<SignalInner>,
}

impl Default for SessionSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionSignal {
    pub fn new() -> Self {
        let (raised_tx, _) = watch::channel(false);
        SessionSignal {
            inner: Arc::new(SignalInner {
                state: Mutex::new(SignalState {
                    raised: false,
                    episode: 0,
                    next_id: 0,
                    observers: BTreeMap::new(),
                }),
                raised_tx,
            }),
        }
    }

    /// Marks the session invalid. Returns `true` only for the call that opened the episode.
    pub fn raise(&self) -> bool {
        let (episode, observers) = {
            let mut state = self.inner.lock();
            if state.raised {
                debug!("Session signal already raised; ignoring repeat raise");
                return false;
            }
            state.raised = true;
            state.episode += 1;
            (state.episode, snapshot(&state))
        };

        self.inner.raised_tx.send_replace(true);
        info!(
            event_name = "session.expired",
            event_domain = "session",
            episode,
            observers = observers.len(),
            "session expired; notifying observers"
        );
        // Observers run outside the lock so they may call back into the signal.
        for observer in observers {
            observer(SessionEvent::Expired { episode });
        }
        true
    }

    /// Clears the raised state. Returns `false` when nothing was raised.
    pub fn acknowledge(&self) -> bool {
        let (episode, observers) = {
            let mut state = self.inner.lock();
            if !state.raised {
                return false;
            }
            state.raised = false;
            (state.episode, snapshot(&state))
        };

        self.inner.raised_tx.send_replace(false);
        info!(
            event_name = "session.acknowledged",
            event_domain = "session",
            episode,
            "session expiry acknowledged"
        );
        for observer in observers {
            observer(SessionEvent::Acknowledged { episode });
        }
        true
    }

    pub fn is_raised(&self) -> bool {
        self.inner.lock().raised
    }

    /// Number of expiry episodes so far.
    pub fn episode(&self) -> u64 {
        self.inner.lock().episode
    }

    /// Registers an observer. It stays registered until the returned handle is dropped.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(SessionEvent) + Send + Sync + 'static,
    {
        let mut state = self.inner.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.observers.insert(id, Arc::new(observer));
        Subscription {
            id: Some(id),
            signal: Arc::downgrade(&self.inner),
        }
    }

    /// Async view of the raised flag, for tasks that want to `changed().await`.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.inner.raised_tx.subscribe()
    }

    /// Captures the current episode so late responses can be recognised and dropped.
    pub fn guard(&self) -> ExpiryGuard {
        ExpiryGuard {
            signal: self.clone(),
            episode: self.episode(),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.inner.lock().observers.len()
    }
}

fn snapshot(state: &SignalState) -> Vec<Observer> {
    state.observers.values().cloned().collect()
}

/// Unsubscribes its observer when dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: Option<u64>,
    signal: Weak<SignalInner>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self)
    }

    /// Keeps the observer registered for the lifetime of the signal.
    pub fn detach(mut self) {
        self.id = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let (Some(id), Some(inner)) = (self.id.take(), self.signal.upgrade()) {
            inner.lock().observers.remove(&id);
        }
    }
}

/// Tells a caller whether a response it is about to render still belongs to a live session.
#[derive(Clone)]
pub struct ExpiryGuard {
    signal: SessionSignal,
    episode: u64,
}

impl ExpiryGuard {
    /// `false` once the session expired at any point after the guard was taken.
    pub fn is_current(&self) -> bool {
        let state = self.signal.inner.lock();
        !state.raised && state.episode == self.episode
    }
}
