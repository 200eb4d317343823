use askama::Template;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use tracing::info;

use crate::api::{self, RequestContext};
use crate::error::{AppError, AppResult, RenderHtml};
use crate::models::{Member, NewMember, Settings, MEMBER_PALETTE};
use crate::state::{AppState, JsManifest};
use crate::VERSION;

pub struct Swatch {
    pub name: &'static str,
    pub hex: &'static str,
}

#[derive(Template)]
#[template(path = "pages/members.html")]
pub struct MembersTemplate {
    pub title: String,
    pub settings: Settings,
    pub manifest: JsManifest,
    pub version: &'static str,
    pub login_enabled: bool,
    pub members: Vec<Member>,
    pub palette: Vec<Swatch>,
    pub next_color: &'static str,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MemberFormData {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

impl MemberFormData {
    fn into_new_member(self) -> AppResult<NewMember> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Member name is required"));
        }
        if matches!(name, "Joint" | "Combined") {
            return Err(AppError::validation(format!(
                "\"{}\" is reserved for shared spending",
                name
            )));
        }
        let color = self.color.trim();
        Ok(NewMember {
            name: name.to_string(),
            color: if is_hex_color(color) {
                color.to_string()
            } else {
                MEMBER_PALETTE[0].1.to_string()
            },
        })
    }
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// First palette color nobody uses yet, cycling when all are taken.
fn next_color(members: &[Member]) -> &'static str {
    MEMBER_PALETTE
        .iter()
        .map(|(_, hex)| *hex)
        .find(|hex| !members.iter().any(|m| m.color.eq_ignore_ascii_case(hex)))
        .unwrap_or(MEMBER_PALETTE[members.len() % MEMBER_PALETTE.len()].1)
}

async fn render_index(
    state: &AppState,
    ctx: &RequestContext,
    error: Option<String>,
) -> AppResult<Html<String>> {
    let (settings, members) =
        tokio::try_join!(state.load_settings(ctx), state.cached_members(ctx))?;
    let template = MembersTemplate {
        title: "Household".into(),
        next_color: next_color(&members),
        palette: MEMBER_PALETTE
            .iter()
            .map(|&(name, hex)| Swatch { name, hex })
            .collect(),
        members,
        error,
        settings,
        manifest: state.manifest.clone(),
        version: VERSION,
        login_enabled: state.config.requires_login(),
    };
    template.render_html()
}

pub async fn index(State(state): State<AppState>, ctx: RequestContext) -> AppResult<Html<String>> {
    render_index(&state, &ctx, None).await
}

async fn finish(state: &AppState, ctx: &RequestContext, result: AppResult<()>) -> AppResult<Response> {
    match result {
        Ok(()) => {
            state.cache.invalidate_endpoint(api::members::ENDPOINT);
            Ok(Redirect::to("/members").into_response())
        }
        Err(AppError::Validation(msg)) => Ok(render_index(state, ctx, Some(msg)).await?.into_response()),
        Err(e) => Err(e),
    }
}

pub async fn create(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<MemberFormData>,
) -> AppResult<Response> {
    let result = match form.into_new_member() {
        Ok(member) => {
            let created = api::members::create(&state.api, &ctx, &member).await;
            if created.is_ok() {
                info!(name = %member.name, "Added household member");
            }
            created
        }
        Err(e) => Err(e),
    };
    finish(&state, &ctx, result).await
}

pub async fn update(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i64>,
    Form(form): Form<MemberFormData>,
) -> AppResult<Response> {
    let result = match form.into_new_member() {
        Ok(member) => api::members::update(&state.api, &ctx, id, &member).await,
        Err(e) => Err(e),
    };
    finish(&state, &ctx, result).await
}

pub async fn delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let result = api::members::delete(&state.api, &ctx, id).await;
    if result.is_ok() {
        info!(member_id = id, "Removed household member");
    }
    finish(&state, &ctx, result).await
}
