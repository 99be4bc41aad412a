use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::errors::SessionError;

// --- Identity Schemas ---

/// Role
///
/// The closed set of clinic roles. The upper-case tag is the only accepted wire form:
/// parsing is exact, so `"admin"` or `"Admin"` are rejected as `UnknownRole` instead of
/// being coerced into a privileged variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TS, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Role {
    SuperAdmin,
    Admin,
    Doctor,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Role; 3] = [Role::SuperAdmin, Role::Admin, Role::Doctor];

    /// The canonical wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Admin => "ADMIN",
            Role::Doctor => "DOCTOR",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = SessionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| SessionError::UnknownRole(value.to_string()))
    }
}

// Routed through FromStr so serde input goes through the same exact-match check.
impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// User
///
/// Identity record resolved from the backend. Immutable once fetched; a re-fetch or
/// logout replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    // Opaque backend identifier.
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

/// Wire shape of a user as the backend emits it. The role stays a raw string here so
/// an out-of-set value surfaces as `UnknownRole` rather than a generic decode failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireUser {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: String,
}

impl TryFrom<WireUser> for User {
    type Error = SessionError;

    fn try_from(wire: WireUser) -> Result<Self, Self::Error> {
        Ok(User {
            role: wire.role.parse()?,
            id: wire.id,
            email: wire.email,
            display_name: wire.display_name,
        })
    }
}

/// Body of both `GET /auth/me` and `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct IdentityEnvelope {
    pub user: WireUser,
}

// --- Request / Response Payloads ---

/// Credentials
///
/// Login payload (`POST /auth/login`, and the shell's `POST /login`). The password is
/// forwarded to the backend only and never appears in `Debug` output or logs.
#[derive(Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// LoginResponse
///
/// Returned by the shell after a successful login so the caller can navigate to the
/// role's landing view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginResponse {
    pub role: Role,
    pub redirect_to: String,
}

/// ErrorKind
///
/// Machine-readable tag for a failed shell call, one per `SessionError` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorKind {
    NetworkFailure,
    Unauthenticated,
    InvalidCredentials,
    MalformedResponse,
    UnknownRole,
}

/// ErrorResponse
///
/// Body of every failed login, so the form can tell a rejected password from a backend
/// that is down or answered with something unusable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
}

/// DashboardView
///
/// Body of a rendered role dashboard: which view was served and to whom. Layout and
/// markup belong to the presentational front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DashboardView {
    pub view: String,
    pub user: User,
}

// --- Session Schemas ---

/// SessionStatus
///
/// Exactly one holds at any time. See [`SessionStatus::can_transition_to`] for the
/// allowed edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum SessionStatus {
    Uninitialized,
    Loading,
    Authenticated,
    Unauthenticated,
}

impl SessionStatus {
    /// The session state machine. Nothing re-enters `Uninitialized`, and `Loading`
    /// only resolves to one of the two terminal outcomes of a bootstrap.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (Uninitialized, Loading)
                | (Loading, Authenticated)
                | (Loading, Unauthenticated)
                | (Authenticated, Unauthenticated)
                | (Unauthenticated, Authenticated)
        )
    }
}

/// SessionState
///
/// The Session Store's payload. The user lives inside the `Authenticated` variant, so
/// "user present iff authenticated" cannot be violated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Loading,
    Authenticated(User),
    Unauthenticated,
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            SessionState::Uninitialized => SessionStatus::Uninitialized,
            SessionState::Loading => SessionStatus::Loading,
            SessionState::Authenticated(_) => SessionStatus::Authenticated,
            SessionState::Unauthenticated => SessionStatus::Unauthenticated,
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    /// True once bootstrap has produced an answer either way.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            SessionState::Authenticated(_) | SessionState::Unauthenticated
        )
    }
}

/// SessionSnapshot
///
/// Read-only, serialisable view of the session handed to the UI layer (`GET /session`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub user: Option<User>,
}

impl From<&SessionState> for SessionSnapshot {
    fn from(state: &SessionState) -> Self {
        Self {
            status: state.status(),
            user: state.user().cloned(),
        }
    }
}
