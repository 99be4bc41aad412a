use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. These are the only routes that may change the
/// session: login and logout funnel straight into the Session Store.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check; does not touch the session.
        .route("/health", get(|| async { "ok" }))
        // GET /session
        // Read-only snapshot for the presentational layer to render from.
        .route("/session", get(handlers::get_session))
        // GET /login, POST /login
        // The login view (redirect target for unauthenticated visitors) and the form submit.
        .route("/login", get(handlers::login_view).post(handlers::login))
        // POST /logout
        // Fire-and-forget from the visitor's side; always ends on the login view.
        .route("/logout", post(handlers::logout))
}
