use parking_lot::Mutex;
use std::sync::{
    Arc, Weak,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use tokio::sync::OnceCell;

use crate::{
    backend::BackendState,
    errors::SessionError,
    models::{Credentials, Role, SessionState, SessionStatus},
};

/// Callback invoked synchronously after every session transition.
pub type Listener = Arc<dyn Fn(&SessionState) + Send + Sync>;

// The state plus a counter bumped on every write, both guarded by the same lock.
struct Versioned {
    seq: u64,
    state: SessionState,
}

struct ListenerSlot {
    id: u64,
    callback: Listener,
    // Highest sequence number this listener has been handed.
    delivered: AtomicU64,
    // Set while some thread is running `callback` for this slot.
    draining: AtomicBool,
}

struct Inner {
    backend: BackendState,
    state: Mutex<Versioned>,
    listeners: Mutex<Vec<Arc<ListenerSlot>>>,
    next_listener_id: AtomicU64,
    // Completes once the single `/auth/me` bootstrap has settled.
    bootstrap: OnceCell<()>,
}

/// SessionStore
///
/// The single authoritative holder of `SessionState`. One store is built per process and
/// handed to whoever needs it; clones share the same state.
///
/// All mutation funnels through `initialize`, `login`, `logout` and `expire`. Each change
/// is checked against the session state machine and then pushed to subscribers.
///
/// Listeners only ever move forward. A listener never receives a state older than one it
/// has already seen, and once transitions stop every listener has been handed the final
/// state. When transitions race on different threads a listener may skip an intermediate
/// state, never the latest one.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    pub fn new(backend: BackendState) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                state: Mutex::new(Versioned {
                    seq: 1,
                    state: SessionState::Uninitialized,
                }),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(0),
                bootstrap: OnceCell::new(),
            }),
        }
    }

    /// Current state, without side effects.
    pub fn snapshot(&self) -> SessionState {
        self.inner.state.lock().state.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.state.lock().state.status()
    }

    /// initialize
    ///
    /// Bootstraps the session from `GET /auth/me`. Idempotent: concurrent and repeated
    /// callers share one in-flight request and all return after the terminal status is
    /// set. Failures are absorbed into `UNAUTHENTICATED`.
    pub async fn initialize(&self) {
        self.inner.bootstrap.get_or_init(|| self.bootstrap()).await;
    }

    async fn bootstrap(&self) {
        match self.status() {
            SessionStatus::Uninitialized => {
                self.transition(SessionState::Loading);
            }
            // A previous bootstrap future was dropped mid-flight; pick it up from here.
            SessionStatus::Loading => {}
            _ => return,
        }

        let next = match self.inner.backend.me().await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, role = %user.role, "session restored");
                SessionState::Authenticated(user)
            }
            Err(e) => {
                tracing::info!(error = %e, "no active session");
                SessionState::Unauthenticated
            }
        };
        self.transition(next);
    }

    /// login
    ///
    /// Exchanges credentials for an identity and returns the resolved role so the caller
    /// can redirect. Unlike bootstrap, failures propagate: the login form has to show them.
    ///
    /// Waits for bootstrap first, so a login never overlaps `LOADING`. A previously
    /// authenticated identity does not survive the attempt: it is cleared on failure and
    /// replaced on success.
    pub async fn login(&self, credentials: &Credentials) -> Result<Role, SessionError> {
        self.initialize().await;

        let outcome = self.inner.backend.login(credentials).await;
        self.clear_identity();

        match outcome {
            Ok(user) => {
                let role = user.role;
                tracing::info!(user_id = %user.id, %role, "login succeeded");
                self.transition(SessionState::Authenticated(user));
                Ok(role)
            }
            Err(e) => {
                tracing::warn!(error = %e, "login failed");
                Err(e)
            }
        }
    }

    /// logout
    ///
    /// Best-effort remote logout. The local session ends `UNAUTHENTICATED` whatever the
    /// backend answers.
    pub async fn logout(&self) {
        self.initialize().await;

        if let Err(e) = self.inner.backend.logout().await {
            tracing::warn!(error = %e, "remote logout failed, clearing local session anyway");
        }
        self.clear_identity();
    }

    /// The backend reported the session as invalid.
    ///
    /// Called by the UI layer when one of its own data requests to the clinic backend comes
    /// back 401 after the session was established. The shell itself makes no such calls,
    /// so nothing in this crate triggers it. Drops the identity; a no-op unless currently
    /// authenticated.
    pub fn expire(&self) {
        if self.clear_identity() {
            tracing::info!("session expired by backend");
        }
    }

    /// subscribe
    ///
    /// Registers `listener` for every subsequent transition. The listener runs on the
    /// thread that made the change, outside the store's locks, so it may read the store.
    /// Dropping the returned `Subscription` unregisters it.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        self.register(Arc::new(listener), false)
    }

    /// Like `subscribe`, but `listener` is first handed the current state. That initial
    /// delivery goes through the same ordering as transitions, so a transition racing the
    /// registration can never be overwritten by the older state.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn watch<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        self.register(Arc::new(listener), true)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    fn register(&self, callback: Listener, replay_current: bool) -> Subscription {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let slot = {
            // Holding the state lock while registering: any later write gets a higher seq
            // and will find this slot in the list.
            let versioned = self.inner.state.lock();
            let seen = if replay_current { 0 } else { versioned.seq };
            let slot = Arc::new(ListenerSlot {
                id,
                callback,
                delivered: AtomicU64::new(seen),
                draining: AtomicBool::new(false),
            });
            self.inner.listeners.lock().push(slot.clone());
            slot
        };
        if replay_current {
            self.inner.deliver(&slot);
        }
        Subscription {
            id,
            store: Arc::downgrade(&self.inner),
        }
    }

    // Applies `next` if the state machine allows it. Invalid edges are refused.
    fn transition(&self, next: SessionState) -> bool {
        {
            let mut versioned = self.inner.state.lock();
            let (from, to) = (versioned.state.status(), next.status());
            if !from.can_transition_to(to) {
                tracing::error!(?from, ?to, "refused invalid session transition");
                return false;
            }
            versioned.state = next;
            versioned.seq += 1;
            tracing::debug!(?from, ?to, seq = versioned.seq, "session transition");
        }
        self.notify();
        true
    }

    // AUTHENTICATED -> UNAUTHENTICATED, checked and applied under one lock.
    fn clear_identity(&self) -> bool {
        {
            let mut versioned = self.inner.state.lock();
            if !matches!(versioned.state, SessionState::Authenticated(_)) {
                return false;
            }
            versioned.state = SessionState::Unauthenticated;
            versioned.seq += 1;
            tracing::debug!(
                from = ?SessionStatus::Authenticated,
                to = ?SessionStatus::Unauthenticated,
                seq = versioned.seq,
                "session transition"
            );
        }
        self.notify();
        true
    }

    fn notify(&self) {
        let slots: Vec<Arc<ListenerSlot>> = self.inner.listeners.lock().clone();
        for slot in slots {
            self.inner.deliver(&slot);
        }
    }
}

impl Inner {
    fn current(&self) -> (u64, SessionState) {
        let versioned = self.state.lock();
        (versioned.seq, versioned.state.clone())
    }

    // Hands `slot` the latest state it has not seen yet. If another thread is already
    // running this listener, that thread picks the newer state up on its next pass and
    // this call returns without waiting, so a blocked listener never stalls a transition.
    fn deliver(&self, slot: &ListenerSlot) {
        loop {
            if slot.draining.swap(true, Ordering::AcqRel) {
                return;
            }
            loop {
                let (seq, state) = self.current();
                if seq <= slot.delivered.load(Ordering::Acquire) {
                    break;
                }
                slot.delivered.store(seq, Ordering::Release);
                (slot.callback)(&state);
            }
            slot.draining.store(false, Ordering::Release);

            // A write that landed after our last read saw `draining` set and left the
            // delivery to us.
            if self.current().0 <= slot.delivered.load(Ordering::Acquire) {
                return;
            }
        }
    }
}

/// Subscription
///
/// Handle returned by [`SessionStore::subscribe`]. A view holds it while mounted; once it
/// is dropped no further updates reach that view, even for responses still in flight.
pub struct Subscription {
    id: u64,
    store: Weak<Inner>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.store.upgrade() {
            inner.listeners.lock().retain(|slot| slot.id != self.id);
        }
    }
}
