use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Session and authorization core.
pub mod backend;
pub mod errors;
pub mod guard;
pub mod initializer;
pub mod models;
pub mod resolver;
pub mod session;

// Portal shell around the core.
pub mod config;
pub mod handlers;
pub mod routes;
use routes::{dashboards, public};

// --- Public Re-exports ---

pub use backend::{AuthBackend, BackendState, HttpAuthBackend, MockAuthBackend};
pub use config::AppConfig;
pub use errors::SessionError;
pub use guard::{AccessGuard, GuardDecision};
pub use initializer::SessionInitializer;
pub use models::{Credentials, Role, SessionState, SessionStatus, User};
pub use resolver::{LOGIN_PATH, resolve_landing_path};
pub use session::{SessionStore, Subscription};

/// ApiDoc
///
/// OpenAPI document for the portal shell, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_session, handlers::login, handlers::logout, handlers::login_view,
        handlers::super_admin_dashboard, handlers::admin_dashboard,
        handlers::doctor_dashboard, handlers::account_view
    ),
    components(
        schemas(
            models::Role, models::User, models::Credentials, models::LoginResponse,
            models::SessionStatus, models::SessionSnapshot, models::DashboardView,
            models::ErrorKind, models::ErrorResponse,
        )
    ),
    tags(
        (name = "clinic-portal", description = "Clinic portal session shell")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared by every request: the one process-wide Session Store plus the loaded config.
#[derive(Clone)]
pub struct AppState {
    pub session: SessionStore,
    pub config: AppConfig,
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(app_state: &AppState) -> SessionStore {
        app_state.session.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the shell: public session routes, guarded dashboards, API docs, and the
/// tracing / request-id / CORS layers.
///
/// Browser access is limited to `config.allowed_origins`. The session is process-wide,
/// so a page from any other origin must neither read it nor change it.
///
/// Does not start the bootstrap; the caller mounts `SessionInitializer` once the runtime
/// is up.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter(|origin| origin.as_str() != "*")
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(%origin, error = %e, "ignoring unusable allowed origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let origin_check = middleware::from_fn_with_state(state.config.clone(), same_origin_only);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(dashboards::dashboard_routes(&state.session))
        .layer(origin_check)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// same_origin_only
///
/// Refuses a state-changing request whose `Origin` is not an allowed front end. CORS only
/// hides responses; a cross-site form post would still reach `/login` or `/logout`.
/// Requests without an `Origin` header (curl, server-to-server) pass through.
async fn same_origin_only(
    State(config): State<AppConfig>,
    request: Request,
    next: Next,
) -> Response {
    if request.method().is_safe() {
        return next.run(request).await;
    }

    let foreign = request
        .headers()
        .get(header::ORIGIN)
        .map(|origin| {
            let origin = origin.to_str().unwrap_or_default();
            !config.allowed_origins.iter().any(|allowed| allowed == origin)
        })
        .unwrap_or(false);

    if foreign {
        tracing::warn!(
            method = %request.method(),
            uri = %request.uri(),
            "refused state-changing request from foreign origin"
        );
        return StatusCode::FORBIDDEN.into_response();
    }
    next.run(request).await
}

/// trace_span_logger
///
/// Request span carrying method, URI and the generated `x-request-id`, so every log line
/// for one request correlates.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
