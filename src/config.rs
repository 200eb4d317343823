use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// How the front-end obtains credentials for the budget backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// One service token shared by every visitor. `None` sends no
    /// `Authorization` header at all.
    ServiceToken(Option<String>),
    /// Each visitor signs in; the backend token is kept in their session.
    Login,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub api_url: String,
    pub api_timeout: Duration,
    pub static_path: PathBuf,
    pub auth_mode: AuthMode,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let token = env::var("BUCKETWISE_API_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        let auth_mode = match env::var("BUCKETWISE_AUTH").as_deref().map(str::trim) {
            Ok("login") => AuthMode::Login,
            Ok("token") | Ok("") | Err(_) => AuthMode::ServiceToken(token),
            Ok(other) => {
                tracing::warn!(
                    "Unknown BUCKETWISE_AUTH value '{}', falling back to service token mode",
                    other
                );
                AuthMode::ServiceToken(token)
            }
        };

        Self {
            host: env::var("BUCKETWISE_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("BUCKETWISE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(7171),
            api_url: env::var("BUCKETWISE_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://127.0.0.1:8000/api".into()),
            api_timeout: Duration::from_secs(
                env::var("BUCKETWISE_API_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            static_path: env::var("BUCKETWISE_STATIC_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("static")),
            auth_mode,
        }
    }

    /// Config pointing at a given backend, used by tests and embedders.
    pub fn for_backend(api_url: &str, auth_mode: AuthMode) -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_timeout: Duration::from_secs(5),
            static_path: PathBuf::from("static"),
            auth_mode,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn requires_login(&self) -> bool {
        self.auth_mode == AuthMode::Login
    }
}
