use askama::Template;
use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};

use crate::api::RequestContext;
use crate::models::Settings;
use crate::state::{AppState, JsManifest};
use crate::VERSION;

/// Newtype for passing error messages through response extensions.
#[derive(Clone)]
pub struct ErrorMessage(pub String);

#[derive(Template)]
#[template(path = "pages/error.html")]
struct ErrorPageTemplate {
    title: String,
    settings: Settings,
    manifest: JsManifest,
    version: &'static str,
    login_enabled: bool,
    status_code: u16,
    status_text: &'static str,
    message: String,
}

/// Requests whose failures keep their original body: HTMX swaps, JSON
/// endpoints and the health check.
fn keeps_raw_errors(request: &Request<Body>) -> bool {
    let path = request.uri().path();
    request.headers().contains_key("hx-request") || path.starts_with("/api/") || path == "/health"
}

/// Replace failed full-page responses with the rendered error page.
/// Every failure is logged here once, whatever its body ends up being.
pub async fn error_page_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let raw = keeps_raw_errors(&request);
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let response = next.run(request).await;

    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }
    let message = response
        .extensions()
        .get::<ErrorMessage>()
        .map(|e| e.0.as_str())
        .unwrap_or("");
    tracing::warn!(%status, %method, %path, message, "request failed");

    if raw {
        response
    } else {
        render_error_page(&state, status, response).await
    }
}

/// Fallback handler for unmatched routes.
pub async fn fallback_handler() -> Response {
    let mut response = StatusCode::NOT_FOUND.into_response();
    response.extensions_mut().insert(ErrorMessage(
        "The page you're looking for doesn't exist.".into(),
    ));
    response
}

async fn render_error_page(state: &AppState, status: StatusCode, response: Response) -> Response {
    let message = response
        .extensions()
        .get::<ErrorMessage>()
        .map(|e| e.0.clone())
        .unwrap_or_else(|| default_message(status));

    let (status_text, _) = status_info(status);

    // Auth runs inside this layer, so the visitor's context only comes back
    // on the failed response. Without it, or with the backend down, the page
    // uses default settings.
    let settings = match response.extensions().get::<RequestContext>() {
        Some(ctx) if status != StatusCode::BAD_GATEWAY => {
            state.load_settings(ctx).await.unwrap_or_default()
        }
        _ => Settings::default(),
    };

    let template = ErrorPageTemplate {
        title: status_text.to_string(),
        settings,
        manifest: state.manifest.clone(),
        version: VERSION,
        login_enabled: state.config.requires_login(),
        status_code: status.as_u16(),
        status_text,
        message,
    };

    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render error page template: {}", e);
            (status, "Internal Server Error").into_response()
        }
    }
}

fn status_info(status: StatusCode) -> (&'static str, &'static str) {
    match status.as_u16() {
        400 => ("Bad Request", "The request could not be understood."),
        401 => ("Unauthorized", "Sign in to continue."),
        404 => ("Not Found", "The page you're looking for doesn't exist."),
        405 => ("Method Not Allowed", "This action is not supported."),
        500 => ("Internal Server Error", "Something went wrong on our end."),
        502 => (
            "Bad Gateway",
            "The budget service could not be reached. Try again shortly.",
        ),
        _ => ("Error", ""),
    }
}

fn default_message(status: StatusCode) -> String {
    let msg = status_info(status).1;
    if msg.is_empty() {
        format!("An unexpected error occurred ({}).", status.as_u16())
    } else {
        msg.to_string()
    }
}
