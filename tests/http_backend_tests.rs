use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use clinic_portal::{
    backend::{AuthBackend, HttpAuthBackend},
    errors::SessionError,
    models::{Credentials, Role, SessionState, SessionStatus},
    session::SessionStore,
};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;

// --- Stub Clinic Backend ---

const ADMIN_BODY: &str =
    r#"{"user":{"id":"u1","email":"ada@clinic.test","displayName":"Ada","role":"ADMIN"}}"#;
const SESSION_COOKIE: &str = "sid=abc123";

/// Serves `router` on an ephemeral port and returns its base URL.
async fn spawn_stub(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

fn json_response(status: StatusCode, body: &'static str) -> impl IntoResponse {
    (status, [(header::CONTENT_TYPE, "application/json")], body)
}

fn has_session_cookie(headers: &HeaderMap) -> bool {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|cookies| cookies.contains(SESSION_COOKIE))
}

/// A backend that issues a cookie on login and only answers `/auth/me` when it is sent.
fn cookie_backend() -> Router {
    Router::new()
        .route(
            "/auth/login",
            post(|Json(body): Json<serde_json::Value>| async move {
                if body == json!({ "email": "ada@clinic.test", "password": "secret" }) {
                    (
                        StatusCode::OK,
                        [
                            (header::SET_COOKIE, format!("{SESSION_COOKIE}; Path=/")),
                            (header::CONTENT_TYPE, "application/json".to_string()),
                        ],
                        ADMIN_BODY,
                    )
                        .into_response()
                } else {
                    StatusCode::UNAUTHORIZED.into_response()
                }
            }),
        )
        .route(
            "/auth/me",
            get(|headers: HeaderMap| async move {
                if has_session_cookie(&headers) {
                    json_response(StatusCode::OK, ADMIN_BODY).into_response()
                } else {
                    StatusCode::UNAUTHORIZED.into_response()
                }
            }),
        )
        .route(
            "/auth/logout",
            post(|| async {
                (
                    StatusCode::NO_CONTENT,
                    [(header::SET_COOKIE, "sid=; Path=/; Max-Age=0")],
                )
            }),
        )
}

fn backend(base_url: &str) -> HttpAuthBackend {
    HttpAuthBackend::new(base_url, Duration::from_secs(5)).unwrap()
}

// --- GET /auth/me ---

#[tokio::test]
async fn test_me_decodes_identity() {
    let url = spawn_stub(Router::new().route(
        "/auth/me",
        get(|| async { json_response(StatusCode::OK, ADMIN_BODY) }),
    ))
    .await;

    let user = backend(&url).me().await.unwrap();
    assert_eq!(user.id, "u1");
    assert_eq!(user.display_name, "Ada");
    assert_eq!(user.role, Role::Admin);
}

#[tokio::test]
async fn test_me_without_session_is_unauthenticated() {
    for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
        let url = spawn_stub(Router::new().route("/auth/me", get(move || async move { status })))
            .await;
        assert_eq!(backend(&url).me().await, Err(SessionError::Unauthenticated));
    }
}

#[tokio::test]
async fn test_me_server_error_is_network_failure() {
    let url = spawn_stub(Router::new().route(
        "/auth/me",
        get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    ))
    .await;

    assert!(matches!(
        backend(&url).me().await,
        Err(SessionError::NetworkFailure(_))
    ));
}

#[tokio::test]
async fn test_me_rejects_malformed_body_and_unknown_role() {
    let url = spawn_stub(
        Router::new()
            .route(
                "/auth/me",
                get(|| async { json_response(StatusCode::OK, r#"{"id":"u1"}"#) }),
            )
            .route(
                "/auth/login",
                post(|| async {
                    json_response(
                        StatusCode::OK,
                        r#"{"user":{"id":"u1","email":"a@clinic.test","displayName":"A","role":"doctor"}}"#,
                    )
                }),
            ),
    )
    .await;
    let client = backend(&url);

    assert!(matches!(
        client.me().await,
        Err(SessionError::MalformedResponse(_))
    ));
    assert_eq!(
        client.login(&Credentials::new("a@clinic.test", "pw")).await,
        Err(SessionError::UnknownRole("doctor".into()))
    );
}

#[tokio::test]
async fn test_unreachable_backend_is_network_failure() {
    // Bind then drop so the port is known to be closed.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    assert!(matches!(
        backend(&url).me().await,
        Err(SessionError::NetworkFailure(_))
    ));
}

#[tokio::test]
async fn test_slow_backend_times_out_as_network_failure() {
    let url = spawn_stub(Router::new().route(
        "/auth/me",
        get(|| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            json_response(StatusCode::OK, ADMIN_BODY)
        }),
    ))
    .await;

    let client = HttpAuthBackend::new(&url, Duration::from_millis(50)).unwrap();
    assert!(matches!(
        client.me().await,
        Err(SessionError::NetworkFailure(_))
    ));
}

// --- POST /auth/login, POST /auth/logout ---

#[tokio::test]
async fn test_login_rejection_is_invalid_credentials() {
    let url = spawn_stub(cookie_backend()).await;

    let result = backend(&url)
        .login(&Credentials::new("ada@clinic.test", "wrong"))
        .await;
    assert_eq!(result, Err(SessionError::InvalidCredentials));
}

#[tokio::test]
async fn test_login_cookie_is_replayed_on_me() {
    let url = spawn_stub(cookie_backend()).await;
    let client = backend(&url);

    assert_eq!(client.me().await, Err(SessionError::Unauthenticated));

    let user = client
        .login(&Credentials::new("ada@clinic.test", "secret"))
        .await
        .unwrap();
    assert_eq!(user.role, Role::Admin);

    // The ambient cookie jar now carries the session.
    assert_eq!(client.me().await.unwrap().id, "u1");
}

#[tokio::test]
async fn test_logout_error_status_is_reported() {
    let url = spawn_stub(Router::new().route(
        "/auth/logout",
        post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    ))
    .await;

    assert!(matches!(
        backend(&url).logout().await,
        Err(SessionError::NetworkFailure(_))
    ));
}

// --- Session Store over HTTP ---

#[tokio::test]
async fn test_session_store_full_cycle_over_http() {
    let url = spawn_stub(cookie_backend()).await;
    let store = SessionStore::new(Arc::new(backend(&url)));

    store.initialize().await;
    assert_eq!(store.snapshot(), SessionState::Unauthenticated);

    let role = store
        .login(&Credentials::new("ada@clinic.test", "secret"))
        .await
        .unwrap();
    assert_eq!(role, Role::Admin);
    assert_eq!(store.status(), SessionStatus::Authenticated);

    store.logout().await;
    assert_eq!(store.snapshot(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn test_session_store_absorbs_unreachable_backend() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let store = SessionStore::new(Arc::new(backend(&url)));
    store.initialize().await;
    assert_eq!(store.snapshot(), SessionState::Unauthenticated);

    // Logout against a dead backend still clears locally and does not panic.
    store.logout().await;
    assert_eq!(store.snapshot(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn test_session_store_settles_against_silent_backend() {
    // Accepts every connection and never answers.
    let url = spawn_stub(
        Router::new()
            .route("/auth/me", get(std::future::pending::<StatusCode>))
            .route("/auth/logout", post(std::future::pending::<StatusCode>)),
    )
    .await;
    let client = HttpAuthBackend::new(&url, Duration::from_millis(100)).unwrap();
    let store = SessionStore::new(Arc::new(client));

    tokio::time::timeout(Duration::from_secs(5), async {
        store.initialize().await;
        assert_eq!(store.snapshot(), SessionState::Unauthenticated);

        // Logout still reaches its local clear.
        store.logout().await;
    })
    .await
    .expect("the request timeout must bound bootstrap and logout");
    assert_eq!(store.status(), SessionStatus::Unauthenticated);
}
