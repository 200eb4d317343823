//! Authentication middleware and handlers.
//!
//! In service-token mode every request shares one configured backend token
//! and one implicit session. In login mode visitors sign in against the
//! backend; the returned token stays server-side in the session store and
//! the browser only holds a random session id cookie.

use askama::Template;
use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use tower_cookies::{Cookie, Cookies};

use crate::api::{self, RequestContext};
use crate::config::AuthMode;
use crate::error::{AppError, RenderHtml};
use crate::session::SHARED_SESSION;
use crate::state::{AppState, JsManifest};
use crate::VERSION;

/// Cookie name for the session id.
const SESSION_COOKIE: &str = "session";

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub title: String,
    pub manifest: JsManifest,
    pub version: &'static str,
    pub username: String,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginFormData {
    pub username: String,
    pub password: String,
}

fn is_public(path: &str) -> bool {
    path == "/login" || path == "/health" || path.starts_with("/static/")
}

/// Attach a [`RequestContext`] to every request, redirecting visitors
/// without a session to the login page in login mode.
pub async fn auth_middleware(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = match &state.config.auth_mode {
        AuthMode::ServiceToken(token) => {
            let ctx = RequestContext::new(token.clone(), SHARED_SESSION);
            request.extensions_mut().insert(ctx.clone());
            let mut response = next.run(request).await;
            attach_context(&mut response, ctx);
            return response;
        }
        AuthMode::Login => cookies
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .and_then(|id| state.sessions.token(&id).map(|token| (id, token))),
    };

    let path = request.uri().path().to_owned();
    let is_htmx = request.headers().contains_key("HX-Request");

    let Some((session_id, token)) = token else {
        if is_public(&path) {
            return next.run(request).await;
        }
        if is_htmx || path.starts_with("/api/") {
            return (StatusCode::UNAUTHORIZED, "Authentication required").into_response();
        }
        return Redirect::to("/login").into_response();
    };

    let ctx = RequestContext::new(token, session_id.clone());
    request.extensions_mut().insert(ctx.clone());
    let mut response = next.run(request).await;
    attach_context(&mut response, ctx);

    // The backend rejected the stored token: the session is over.
    if response.status() == StatusCode::UNAUTHORIZED && !is_public(&path) {
        tracing::info!("backend rejected session token, signing out");
        state.sessions.remove(&session_id);
        cookies.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
        if !is_htmx && !path.starts_with("/api/") {
            return Redirect::to("/login").into_response();
        }
    }
    response
}

/// Failed responses carry the context outward so the error page can load
/// the visitor's settings.
fn attach_context(response: &mut Response, ctx: RequestContext) {
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        response.extensions_mut().insert(ctx);
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

fn render_login(state: &AppState, username: String, error: Option<String>) -> Response {
    let template = LoginTemplate {
        title: "Sign in".into(),
        manifest: state.manifest.clone(),
        version: VERSION,
        username,
        error,
    };
    match template.render_html() {
        Ok(html) => html.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn login_page(State(state): State<AppState>) -> Response {
    if !state.config.requires_login() {
        return Redirect::to("/").into_response();
    }
    render_login(&state, String::new(), None)
}

pub async fn login_submit(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<LoginFormData>,
) -> Response {
    if !state.config.requires_login() {
        return Redirect::to("/").into_response();
    }

    let username = form.username.trim().to_string();
    match api::auth::login(&state.api, &username, &form.password).await {
        Ok(token) => {
            let session_id = state.sessions.create(Some(token));
            let cookie = Cookie::build((SESSION_COOKIE, session_id))
                .path("/")
                .http_only(true)
                .same_site(tower_cookies::cookie::SameSite::Strict)
                .build();
            cookies.add(cookie);
            tracing::info!("user signed in");
            Redirect::to("/").into_response()
        }
        Err(AppError::Unauthorized) | Err(AppError::Validation(_)) => {
            tracing::warn!("failed sign-in attempt");
            render_login(&state, username, Some("Invalid username or password".into()))
        }
        Err(e) => {
            tracing::error!("sign-in failed: {}", e);
            render_login(
                &state,
                username,
                Some("The budget service is unavailable. Try again shortly.".into()),
            )
        }
    }
}

pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> Redirect {
    if let Some(session_cookie) = cookies.get(SESSION_COOKIE) {
        state.sessions.remove(session_cookie.value());
    }
    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .build();
    cookies.remove(cookie);

    if state.config.requires_login() {
        Redirect::to("/login")
    } else {
        Redirect::to("/")
    }
}
