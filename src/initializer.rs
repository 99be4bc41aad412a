use tokio::task::JoinHandle;

use crate::session::SessionStore;

/// SessionInitializer
///
/// Kicks off the session bootstrap when the application root mounts. Mounting more than
/// once is harmless: the store collapses repeat calls into the single bootstrap.
pub struct SessionInitializer;

impl SessionInitializer {
    /// Spawns `store.initialize()` onto the current runtime. The task is detached from
    /// whatever mounted it, so tearing down the caller never cancels the bootstrap.
    pub fn mount(store: &SessionStore) -> JoinHandle<()> {
        let store = store.clone();
        tokio::spawn(async move {
            store.initialize().await;
            let state = store.snapshot();
            tracing::debug!(
                settled = state.is_settled(),
                status = ?state.status(),
                "session bootstrap finished"
            );
        })
    }
}
