use std::{env, time::Duration};

/// AppConfig
///
/// Everything the portal shell needs at startup. Loaded once and cloned into the
/// application state via FromRef.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Base URL of the clinic backend serving /auth/me, /auth/login and /auth/logout.
    pub api_base_url: String,
    // Address the shell listens on. Loopback unless deployed behind something else.
    pub bind_addr: String,
    // Front-end origins allowed to call the shell from a browser. Nothing else gets CORS
    // headers or may send state-changing requests.
    pub allowed_origins: Vec<String>,
    // Per-call bound for backend requests.
    pub request_timeout: Duration,
    // Runtime environment marker. Selects the log format and how strict loading is.
    pub env: Env,
}

/// Env
///
/// Local development versus production deployment.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

pub const LOCAL_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_PORTAL_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

impl Default for AppConfig {
    /// Non-panicking configuration for test scaffolding.
    fn default() -> Self {
        Self {
            api_base_url: LOCAL_API_URL.to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            allowed_origins: vec![DEFAULT_PORTAL_ORIGIN.to_string()],
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from the environment (call `dotenv` first to pick up a
    /// `.env` file).
    ///
    /// # Panics
    /// Panics in production when `CLINIC_API_URL` or `PORTAL_ORIGINS` is missing, and in
    /// any environment when `AUTH_REQUEST_TIMEOUT_SECS` is set but not a positive whole
    /// number of seconds. Starting with
    /// a half-configured backend would only surface later as a confusing logged-out state.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let api_base_url = match env {
            Env::Production => env::var("CLINIC_API_URL")
                .expect("FATAL: CLINIC_API_URL must be set in production."),
            Env::Local => env::var("CLINIC_API_URL").unwrap_or_else(|_| LOCAL_API_URL.to_string()),
        };

        // Comma-separated, e.g. "https://portal.clinic.example,https://admin.clinic.example".
        let allowed_origins = match env {
            Env::Production => env::var("PORTAL_ORIGINS")
                .expect("FATAL: PORTAL_ORIGINS must be set in production."),
            Env::Local => {
                env::var("PORTAL_ORIGINS").unwrap_or_else(|_| DEFAULT_PORTAL_ORIGIN.to_string())
            }
        }
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect();

        let request_timeout = match env::var("AUTH_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs = raw
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .expect("FATAL: AUTH_REQUEST_TIMEOUT_SECS must be a positive whole number of seconds");
                Duration::from_secs(secs)
            }
            Err(_) => DEFAULT_REQUEST_TIMEOUT,
        };

        Self {
            api_base_url,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            allowed_origins,
            request_timeout,
            env,
        }
    }
}
