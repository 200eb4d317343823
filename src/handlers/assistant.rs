use askama::Template;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::api::{self, RequestContext};
use crate::error::{AppError, AppResult, RenderHtml};
use crate::models::{ChatMessage, ChatRole, Settings};
use crate::state::{AppState, JsManifest};
use crate::VERSION;

#[derive(Template)]
#[template(path = "pages/assistant.html")]
pub struct AssistantTemplate {
    pub title: String,
    pub settings: Settings,
    pub manifest: JsManifest,
    pub version: &'static str,
    pub login_enabled: bool,
    pub messages: Vec<ChatMessage>,
    /// Unsent text kept in the input after a failure.
    pub draft: String,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AskFormData {
    #[serde(default)]
    pub message: String,
}

async fn render(
    state: &AppState,
    ctx: &RequestContext,
    draft: String,
    error: Option<String>,
) -> AppResult<Html<String>> {
    let settings = state.load_settings(ctx).await?;
    let messages = state
        .sessions
        .with_session(ctx.session_id(), |session| session.chat.clone());
    let template = AssistantTemplate {
        title: "Assistant".into(),
        messages,
        draft,
        error,
        settings,
        manifest: state.manifest.clone(),
        version: VERSION,
        login_enabled: state.config.requires_login(),
    };
    template.render_html()
}

pub async fn index(State(state): State<AppState>, ctx: RequestContext) -> AppResult<Html<String>> {
    render(&state, &ctx, String::new(), None).await
}

pub async fn ask(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<AskFormData>,
) -> AppResult<Response> {
    let message = form.message.trim();
    if message.is_empty() {
        return Ok(Redirect::to("/assistant").into_response());
    }

    let history = state
        .sessions
        .with_session(ctx.session_id(), |session| session.chat.clone());
    debug!(history = history.len(), "Asking assistant");

    match api::chat::ask(&state.api, &ctx, message, &history).await {
        Ok(reply) => {
            state.sessions.with_session(ctx.session_id(), |session| {
                session.push_chat(ChatMessage {
                    role: ChatRole::User,
                    content: message.to_string(),
                });
                session.push_chat(ChatMessage {
                    role: ChatRole::Assistant,
                    content: reply,
                });
            });
            Ok(Redirect::to("/assistant").into_response())
        }
        Err(AppError::Unauthorized) => Err(AppError::Unauthorized),
        Err(e) => {
            warn!("assistant request failed: {}", e);
            let html = render(
                &state,
                &ctx,
                message.to_string(),
                Some("The assistant is unavailable right now. Try again in a moment.".into()),
            )
            .await?;
            Ok(html.into_response())
        }
    }
}

pub async fn clear(State(state): State<AppState>, ctx: RequestContext) -> Redirect {
    state
        .sessions
        .with_session(ctx.session_id(), |session| session.chat.clear());
    Redirect::to("/assistant")
}
