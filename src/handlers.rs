use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    errors::SessionError,
    models::{Credentials, DashboardView, ErrorResponse, LoginResponse, SessionSnapshot},
    resolver::{LOGIN_PATH, resolve_landing_path},
    session::SessionStore,
};

// --- Session Endpoints ---

/// get_session
///
/// [Public Route] Read-only snapshot of the session (`status` plus `user` when signed in).
#[utoipa::path(
    get,
    path = "/session",
    responses((status = 200, description = "Current session", body = SessionSnapshot))
)]
pub async fn get_session(State(store): State<SessionStore>) -> Json<SessionSnapshot> {
    Json(SessionSnapshot::from(&store.snapshot()))
}

/// login
///
/// [Public Route] Signs in through the backend and answers with the resolved role and its
/// landing view. Failures carry the status of the underlying `SessionError` and an
/// `ErrorResponse` naming its kind, so the form can tell rejected credentials (401) from
/// an unreachable backend or an unusable answer (502).
#[utoipa::path(
    post,
    path = "/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 502, description = "Backend unavailable or returned bad data", body = ErrorResponse)
    )
)]
pub async fn login(
    State(store): State<SessionStore>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<LoginResponse>, SessionError> {
    let role = store.login(&credentials).await?;
    Ok(Json(LoginResponse {
        role,
        redirect_to: resolve_landing_path(role).to_string(),
    }))
}

/// logout
///
/// [Public Route] Clears the session and sends the visitor to the login view. Always
/// succeeds from the caller's side; a failing remote logout is only logged.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 303, description = "Signed out, redirected to /login"))
)]
pub async fn logout(State(store): State<SessionStore>) -> Redirect {
    store.logout().await;
    Redirect::to(LOGIN_PATH)
}

/// login_view
///
/// [Public Route] Target of every "not signed in" redirect. Already signed-in visitors
/// are bounced to their own landing view.
#[utoipa::path(
    get,
    path = "/login",
    responses(
        (status = 200, description = "Login view", body = SessionSnapshot),
        (status = 303, description = "Already signed in")
    )
)]
pub async fn login_view(State(store): State<SessionStore>) -> Response {
    let state = store.snapshot();
    match state.user() {
        Some(user) => Redirect::to(resolve_landing_path(user.role)).into_response(),
        None => Json(SessionSnapshot::from(&state)).into_response(),
    }
}

// --- Dashboards ---

// Guarded routes only reach here once the guard decided `Render`. If the session moved
// on between that decision and this read, fall back to the login view.
fn render_dashboard(store: &SessionStore, view: &str) -> Result<Json<DashboardView>, Redirect> {
    match store.snapshot().user() {
        Some(user) => Ok(Json(DashboardView {
            view: view.to_string(),
            user: user.clone(),
        })),
        None => Err(Redirect::to(LOGIN_PATH)),
    }
}

/// super_admin_dashboard
///
/// [SUPER_ADMIN Route] Clinic-wide administration.
#[utoipa::path(
    get,
    path = "/super-admin",
    responses(
        (status = 200, description = "Dashboard", body = DashboardView),
        (status = 303, description = "Not signed in, or not a super admin")
    )
)]
pub async fn super_admin_dashboard(
    State(store): State<SessionStore>,
) -> Result<Json<DashboardView>, Redirect> {
    render_dashboard(&store, "super-admin")
}

/// admin_dashboard
///
/// [ADMIN Route] Clinic administration.
#[utoipa::path(
    get,
    path = "/admin",
    responses(
        (status = 200, description = "Dashboard", body = DashboardView),
        (status = 303, description = "Not signed in, or not an admin")
    )
)]
pub async fn admin_dashboard(
    State(store): State<SessionStore>,
) -> Result<Json<DashboardView>, Redirect> {
    render_dashboard(&store, "admin")
}

/// doctor_dashboard
///
/// [DOCTOR Route]
#[utoipa::path(
    get,
    path = "/doctor",
    responses(
        (status = 200, description = "Dashboard", body = DashboardView),
        (status = 303, description = "Not signed in, or not a doctor")
    )
)]
pub async fn doctor_dashboard(
    State(store): State<SessionStore>,
) -> Result<Json<DashboardView>, Redirect> {
    render_dashboard(&store, "doctor")
}

/// account_view
///
/// [Authenticated Route] The signed-in user's own account, open to every role.
#[utoipa::path(
    get,
    path = "/account",
    responses(
        (status = 200, description = "Account", body = DashboardView),
        (status = 303, description = "Not signed in")
    )
)]
pub async fn account_view(
    State(store): State<SessionStore>,
) -> Result<Json<DashboardView>, Redirect> {
    render_dashboard(&store, "account")
}
