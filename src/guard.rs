use axum::{
    Json,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;

use crate::{
    errors::SessionError,
    models::{Role, SessionState},
    resolver::{LOGIN_PATH, resolve_landing_path},
    session::{SessionStore, Subscription},
};

/// GuardDecision
///
/// What a protected view should do for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Bootstrap has not settled: show a neutral placeholder and do not navigate.
    Loading,
    /// Show the protected view.
    Render,
    /// Navigate elsewhere without rendering the view.
    Redirect(&'static str),
}

/// AccessGuard
///
/// Wraps a protected view. `allowed_roles == None` admits any authenticated role.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccessGuard {
    allowed_roles: Option<Vec<Role>>,
}

impl AccessGuard {
    /// Any authenticated user passes.
    pub fn any_role() -> Self {
        Self::default()
    }

    /// Only the listed roles pass. An empty list admits nobody.
    pub fn only(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed_roles: Some(roles.into_iter().collect()),
        }
    }

    /// Builds a guard from role tags, e.g. from route configuration. A tag outside the
    /// closed set is an error, never a silently ignored or widened entry.
    pub fn from_role_names(names: &[&str]) -> Result<Self, SessionError> {
        let roles = names
            .iter()
            .map(|name| name.parse::<Role>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::only(roles))
    }

    pub fn allowed_roles(&self) -> Option<&[Role]> {
        self.allowed_roles.as_deref()
    }

    pub fn admits(&self, role: Role) -> bool {
        self.allowed_roles
            .as_ref()
            .is_none_or(|allowed| allowed.contains(&role))
    }

    /// decide
    ///
    /// 1. `UNINITIALIZED`/`LOADING` -> `Loading`, whatever the allowed roles are.
    /// 2. `UNAUTHENTICATED` -> redirect to the login view.
    /// 3. `AUTHENTICATED` -> render when the role is admitted, otherwise redirect to that
    ///    role's own landing view (forbidden here, but still signed in).
    pub fn decide(&self, state: &SessionState) -> GuardDecision {
        match state {
            SessionState::Uninitialized | SessionState::Loading => GuardDecision::Loading,
            SessionState::Unauthenticated => GuardDecision::Redirect(LOGIN_PATH),
            SessionState::Authenticated(user) if self.admits(user.role) => GuardDecision::Render,
            SessionState::Authenticated(user) => {
                GuardDecision::Redirect(resolve_landing_path(user.role))
            }
        }
    }

    /// mount
    ///
    /// Reactive form of [`AccessGuard::decide`]: reports the decision for the current
    /// state right away, then again after every transition until the returned
    /// `Subscription` is dropped.
    #[must_use = "dropping the Subscription stops further decisions"]
    pub fn mount<F>(&self, store: &SessionStore, on_decision: F) -> Subscription
    where
        F: Fn(GuardDecision) + Send + Sync + 'static,
    {
        let guard = self.clone();
        store.watch(move |state| on_decision(guard.decide(state)))
    }
}

/// GuardedView
///
/// Middleware state pairing a guard with the store it reads.
#[derive(Clone)]
pub struct GuardedView {
    pub store: SessionStore,
    pub guard: AccessGuard,
}

impl GuardedView {
    pub fn new(store: SessionStore, guard: AccessGuard) -> Self {
        Self { store, guard }
    }
}

/// enforce
///
/// Access Guard as axum middleware for the portal's dashboard routes. The decision is
/// taken per request from the live session snapshot.
pub async fn enforce(State(view): State<GuardedView>, request: Request, next: Next) -> Response {
    match view.guard.decide(&view.store.snapshot()) {
        GuardDecision::Loading => Json(json!({ "status": "LOADING" })).into_response(),
        GuardDecision::Render => next.run(request).await,
        GuardDecision::Redirect(path) => {
            tracing::debug!(from = %request.uri(), to = path, "access guard redirect");
            Redirect::to(path).into_response()
        }
    }
}
