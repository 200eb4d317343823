use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{ApiClient, RequestContext};
use crate::error::{AppError, AppResult};

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default, alias = "access_token")]
    token: Option<String>,
}

/// Exchange credentials for a backend bearer token.
pub async fn login(api: &ApiClient, username: &str, password: &str) -> AppResult<String> {
    if username.is_empty() || password.is_empty() {
        return Err(AppError::validation("Username and password are required"));
    }
    let anonymous = RequestContext::default();
    let response: LoginResponse = api
        .send(
            &anonymous,
            Method::POST,
            "/auth/login",
            &LoginRequest { username, password },
        )
        .await?;
    response
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Internal("Login response did not contain a token".into()))
}
