//! Client for the budget REST backend.
//!
//! The backend owns every piece of data; this module only moves JSON.
//! Calls are grouped per resource as free functions taking the shared
//! [`ApiClient`] and the caller's [`RequestContext`].

pub mod auth;
pub mod buckets;
pub mod cashflow;
pub mod chat;
pub mod members;
pub mod performance;
pub mod rules;
pub mod settings;
pub mod transactions;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Credentials and session identity for one incoming request.
///
/// Passed explicitly into every backend call; nothing in the client reads
/// ambient token state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    token: Option<String>,
    session_id: String,
}

impl RequestContext {
    pub fn new(token: Option<String>, session_id: impl Into<String>) -> Self {
        Self {
            token,
            session_id: session_id.into(),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Stable digest of the credentials, used to keep cache entries of
    /// different households apart without storing the token itself.
    pub fn credential_digest(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.token.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Arc<str>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, ctx: &RequestContext, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.http.request(method, url);
        match ctx.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// `GET path?params` decoded as `T`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        debug!(path, "GET backend");
        let response = self
            .request(ctx, Method::GET, path)
            .query(params)
            .send()
            .await?;
        let response = check(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Send a JSON body and decode the JSON reply.
    pub async fn send<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        method: Method,
        path: &str,
        body: &B,
    ) -> AppResult<T> {
        debug!(%method, path, "backend mutation");
        let response = self.request(ctx, method, path).json(body).send().await?;
        let response = check(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Mutation whose reply body is irrelevant (204s, echo payloads).
    pub async fn send_empty<B: Serialize + ?Sized>(
        &self,
        ctx: &RequestContext,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> AppResult<()> {
        debug!(%method, path, "backend mutation");
        let mut builder = self.request(ctx, method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        check(builder.send().await?).await?;
        Ok(())
    }

    pub async fn delete(&self, ctx: &RequestContext, path: &str) -> AppResult<()> {
        self.send_empty::<()>(ctx, Method::DELETE, path, None).await
    }
}

async fn check(response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(error_for_status(status.as_u16(), &body))
}

/// Map a non-2xx backend reply to an [`AppError`].
pub fn error_for_status(status: u16, body: &str) -> AppError {
    let message = extract_message(body);
    match status {
        401 => AppError::Unauthorized,
        404 => AppError::NotFound(message.unwrap_or_else(|| "Resource not found".into())),
        400 | 422 => {
            AppError::Validation(message.unwrap_or_else(|| "The request was rejected".into()))
        }
        _ => AppError::Api {
            status,
            message: message.unwrap_or_else(|| body.chars().take(200).collect()),
        },
    }
}

/// Pull a human readable message out of `{"detail"|"error"|"message": ...}`.
/// `detail` may also be a list of `{msg}` objects.
fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    for key in ["detail", "error", "message"] {
        match value.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Array(items)) => {
                let parts: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .collect();
                if !parts.is_empty() {
                    return Some(parts.join("; "));
                }
            }
            _ => {}
        }
    }
    None
}
