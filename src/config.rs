use std::env;

/// AppConfig
///
/// Holds the portal's configuration. Loaded once at startup and shared read-only
/// through the application state (pulled out by handlers via `FromRef`).
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Selects log format and fail-fast behaviour.
    pub env: Env,
    // Base URL of the external Resource API (users, books, issuedBooks, reviews, activities).
    pub api_base_url: String,
    // File backing the durable key/value store that holds the current session.
    pub session_store_path: String,
    // Address the HTTP shell binds to. Loopback by default: the stored session
    // belongs to one browser context on this machine.
    pub bind_addr: String,
    // The only browser origin allowed to call the shell cross-origin (the front-end).
    pub allowed_origin: String,
}

/// Env
///
/// Runtime context. `Local` tolerates missing settings and falls back to the
/// development defaults; `Production` refuses to start without them.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_SESSION_STORE_PATH: &str = ".library-portal/session.json";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";

impl Default for AppConfig {
    /// Safe, non-panicking values for test state scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            session_store_path: DEFAULT_SESSION_STORE_PATH.to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics in `production` when `RESOURCE_API_URL` is not set. The portal has no
    /// useful behaviour without its data collaborator, so it refuses to start.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let api_base_url = match env {
            Env::Production => env::var("RESOURCE_API_URL")
                .expect("FATAL: RESOURCE_API_URL must be set in production."),
            Env::Local => {
                env::var("RESOURCE_API_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string())
            }
        };

        Self {
            env,
            // Trailing slashes would double up when collection paths are appended.
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            session_store_path: env::var("SESSION_STORE_PATH")
                .unwrap_or_else(|_| DEFAULT_SESSION_STORE_PATH.to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            allowed_origin: env::var("ALLOWED_ORIGIN")
                .map(|origin| origin.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGIN.to_string()),
        }
    }
}
