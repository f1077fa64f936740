use std::env;
use std::path::PathBuf;

/// AppConfig
///
/// Holds the console's entire configuration state. Immutable once loaded and pulled
/// into handlers through the application state via FromRef.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Base URL of the REST backend the console consumes.
    pub api_url: String,
    // Address the console host listens on.
    pub bind_addr: String,
    // File-backed session store location; in-memory store when unset.
    pub session_store_path: Option<PathBuf>,
    // Page size of the user management list.
    pub users_page_size: usize,
    // Page size of the findings list.
    pub findings_page_size: usize,
    // Runtime environment marker. Controls the log format and fail-fast checks.
    pub env: Env,
}

/// Env
///
/// Defines the runtime context: pretty logs and local defaults, or JSON logs and
/// mandatory settings.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

pub const DEFAULT_USERS_PAGE_SIZE: usize = 10;
pub const DEFAULT_FINDINGS_PAGE_SIZE: usize = 5;

impl Default for AppConfig {
    /// default
    ///
    /// Safe, non-panicking values for test state setup.
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
            session_store_path: None,
            users_page_size: DEFAULT_USERS_PAGE_SIZE,
            findings_page_size: DEFAULT_FINDINGS_PAGE_SIZE,
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables at startup.
    ///
    /// # Panics
    /// Panics in production when `API_URL` is not set, so the console never starts
    /// pointed at a development backend by accident.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let api_url = match env {
            Env::Production => {
                env::var("API_URL").expect("FATAL: API_URL must be set in production.")
            }
            Env::Local => env::var("API_URL").unwrap_or_else(|_| Self::default().api_url),
        };

        Self {
            api_url,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| Self::default().bind_addr),
            session_store_path: env::var("SESSION_STORE_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            users_page_size: page_size_var("USERS_PAGE_SIZE", DEFAULT_USERS_PAGE_SIZE),
            findings_page_size: page_size_var("FINDINGS_PAGE_SIZE", DEFAULT_FINDINGS_PAGE_SIZE),
            env,
        }
    }
}

// Page sizes must be positive; anything unparseable or zero falls back to the default.
fn page_size_var(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}
