use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{StatusCode, Url};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use crate::{
    errors::SessionError,
    models::{Credentials, IdentityEnvelope, User},
};

// 1. AuthBackend Contract
/// AuthBackend
///
/// The three backend operations the session core depends on. Swapping the concrete
/// implementation (HTTP in the shell, in-memory in tests) leaves the Session Store
/// untouched.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// `GET /auth/me`: who the ambient session belongs to.
    async fn me(&self) -> Result<User, SessionError>;

    /// `POST /auth/login`: exchanges credentials for an identity. Any token the backend
    /// issues travels in the ambient cookie jar, never through this return value.
    async fn login(&self, credentials: &Credentials) -> Result<User, SessionError>;

    /// `POST /auth/logout`. The outcome is advisory.
    async fn logout(&self) -> Result<(), SessionError>;
}

/// BackendState
///
/// Shared handle to the backend, held by the Session Store.
pub type BackendState = Arc<dyn AuthBackend>;

// 2. The Real Implementation (HTTP + cookie jar)
/// HttpAuthBackend
///
/// reqwest-backed client. The cookie store keeps whatever session cookie the backend
/// sets on login, so `/auth/me` and `/auth/logout` ride on it implicitly.
#[derive(Clone)]
pub struct HttpAuthBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpAuthBackend {
    /// new
    ///
    /// Builds the client against `base_url`. `timeout` bounds every call end to end, so a
    /// backend that accepts the connection and never answers still settles the session.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SessionError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SessionError::NetworkFailure(format!("invalid base URL: {e}")))?;

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, SessionError> {
        self.base_url
            .join(path)
            .map_err(|e| SessionError::NetworkFailure(format!("invalid endpoint {path}: {e}")))
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn me(&self) -> Result<User, SessionError> {
        let response = self.client.get(self.endpoint("/auth/me")?).send().await?;

        match response.status() {
            status if status.is_success() => parse_identity(&response.text().await?),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SessionError::Unauthenticated),
            status => Err(SessionError::NetworkFailure(format!(
                "GET /auth/me returned {status}"
            ))),
        }
    }

    async fn login(&self, credentials: &Credentials) -> Result<User, SessionError> {
        let response = self
            .client
            .post(self.endpoint("/auth/login")?)
            .json(credentials)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => parse_identity(&response.text().await?),
            StatusCode::BAD_REQUEST
            | StatusCode::UNAUTHORIZED
            | StatusCode::FORBIDDEN
            | StatusCode::UNPROCESSABLE_ENTITY => Err(SessionError::InvalidCredentials),
            status => Err(SessionError::NetworkFailure(format!(
                "POST /auth/login returned {status}"
            ))),
        }
    }

    async fn logout(&self) -> Result<(), SessionError> {
        let response = self.client.post(self.endpoint("/auth/logout")?).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(SessionError::NetworkFailure(format!(
                "POST /auth/logout returned {}",
                response.status()
            )))
        }
    }
}

/// parse_identity
///
/// Decodes a `{ "user": { ... } }` body. Shape errors become `MalformedResponse`; a
/// well-formed body carrying a role outside the closed set becomes `UnknownRole`.
pub fn parse_identity(body: &str) -> Result<User, SessionError> {
    let envelope: IdentityEnvelope = serde_json::from_str(body)
        .map_err(|e| SessionError::MalformedResponse(e.to_string()))?;
    User::try_from(envelope.user)
}

// 3. The Mock Implementation (For Tests)
/// MockAuthBackend
///
/// In-memory backend with a scripted identity, a table of known accounts and call
/// counters, so tests can assert how many round trips the store made.
#[derive(Default)]
pub struct MockAuthBackend {
    // What `/auth/me` answers. `None` means no ambient session.
    current: Mutex<Option<User>>,
    // email -> (password, user)
    accounts: HashMap<String, (String, User)>,
    // Forces `/auth/me` to fail with this error regardless of `current`.
    me_failure: Option<SessionError>,
    login_failure: Option<SessionError>,
    logout_fails: bool,
    latency: Option<Duration>,
    me_calls: AtomicUsize,
    login_calls: AtomicUsize,
    logout_calls: AtomicUsize,
}

impl MockAuthBackend {
    /// A backend with no ambient session.
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose `/auth/me` already resolves to `user`.
    pub fn signed_in(user: User) -> Self {
        Self {
            current: Mutex::new(Some(user)),
            ..Self::default()
        }
    }

    pub fn with_account(mut self, password: &str, user: User) -> Self {
        self.accounts
            .insert(user.email.clone(), (password.to_string(), user));
        self
    }

    pub fn with_me_failure(mut self, error: SessionError) -> Self {
        self.me_failure = Some(error);
        self
    }

    /// Every login fails with `error`, whatever the credentials.
    pub fn with_login_failure(mut self, error: SessionError) -> Self {
        self.login_failure = Some(error);
        self
    }

    pub fn with_failing_logout(mut self) -> Self {
        self.logout_fails = true;
        self
    }

    /// Delay every call, widening the window in which concurrent callers overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn me_calls(&self) -> usize {
        self.me_calls.load(Ordering::SeqCst)
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl AuthBackend for MockAuthBackend {
    async fn me(&self) -> Result<User, SessionError> {
        self.me_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if let Some(error) = &self.me_failure {
            return Err(error.clone());
        }
        self.current.lock().clone().ok_or(SessionError::Unauthenticated)
    }

    async fn login(&self, credentials: &Credentials) -> Result<User, SessionError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if let Some(error) = &self.login_failure {
            return Err(error.clone());
        }
        match self.accounts.get(&credentials.email) {
            Some((password, user)) if *password == credentials.password => {
                *self.current.lock() = Some(user.clone());
                Ok(user.clone())
            }
            _ => Err(SessionError::InvalidCredentials),
        }
    }

    async fn logout(&self) -> Result<(), SessionError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if self.logout_fails {
            return Err(SessionError::NetworkFailure(
                "mock logout failure".to_string(),
            ));
        }
        *self.current.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn parse_identity_accepts_canonical_body() {
        let user = parse_identity(
            r#"{"user":{"id":"u1","email":"a@clinic.test","displayName":"Ada","role":"ADMIN"}}"#,
        )
        .unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn parse_identity_separates_unknown_role_from_bad_shape() {
        let lowercase = parse_identity(
            r#"{"user":{"id":"u1","email":"a@clinic.test","displayName":"Ada","role":"admin"}}"#,
        );
        assert_eq!(
            lowercase.unwrap_err(),
            SessionError::UnknownRole("admin".into())
        );

        let missing_user = parse_identity(r#"{"id":"u1"}"#);
        assert!(matches!(
            missing_user,
            Err(SessionError::MalformedResponse(_))
        ));

        assert!(matches!(
            parse_identity("not json"),
            Err(SessionError::MalformedResponse(_))
        ));
    }
}
