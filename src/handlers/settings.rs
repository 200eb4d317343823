use askama::Template;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use tracing::info;

use crate::api::{self, RequestContext};
use crate::error::{AppError, AppResult, RenderHtml};
use crate::filters::{CURRENCIES, LOCALES};
use crate::handlers::is_htmx;
use crate::models::{BudgetMode, Settings};
use crate::state::{AppState, JsManifest};
use crate::VERSION;

pub const PAGE_SIZES: &[i64] = &[10, 25, 50, 100];
pub const THEMES: &[&str] = &["system", "light", "dark"];

#[derive(Template)]
#[template(path = "pages/settings.html")]
pub struct SettingsTemplate {
    pub title: String,
    pub settings: Settings,
    pub manifest: JsManifest,
    pub version: &'static str,
    pub login_enabled: bool,
    pub currencies: &'static [&'static str],
    pub locales: &'static [&'static str],
    pub themes: &'static [&'static str],
    pub page_sizes: &'static [i64],
    pub saved: bool,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SettingsFormData {
    #[serde(default)]
    pub budget_mode: String,
    #[serde(default)]
    pub partner_a: String,
    #[serde(default)]
    pub partner_b: String,
    pub currency: String,
    pub locale: String,
    pub theme: String,
    pub page_size: String,
}

impl SettingsFormData {
    /// Apply the form over the current settings. Partner names are kept
    /// when the form omits them.
    fn apply(self, current: &Settings) -> AppResult<Settings> {
        if !CURRENCIES.contains(&self.currency.as_str()) {
            return Err(AppError::validation(format!("Unsupported currency: {}", self.currency)));
        }
        if !LOCALES.contains(&self.locale.as_str()) {
            return Err(AppError::validation(format!("Unsupported locale: {}", self.locale)));
        }
        if !THEMES.contains(&self.theme.as_str()) {
            return Err(AppError::validation(format!("Unknown theme: {}", self.theme)));
        }
        let page_size: i64 = self
            .page_size
            .trim()
            .parse()
            .ok()
            .filter(|n| PAGE_SIZES.contains(n))
            .ok_or_else(|| AppError::validation("Choose one of the offered page sizes"))?;

        let partner = |raw: &str, fallback: &str| {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                fallback.to_string()
            } else {
                trimmed.to_string()
            }
        };
        Ok(Settings {
            budget_mode: BudgetMode::parse(&self.budget_mode),
            partner_a: partner(&self.partner_a, &current.partner_a),
            partner_b: partner(&self.partner_b, &current.partner_b),
            currency: self.currency,
            locale: self.locale,
            theme: self.theme,
            page_size,
        })
    }
}

async fn render(
    state: &AppState,
    settings: Settings,
    saved: bool,
    error: Option<String>,
) -> AppResult<Html<String>> {
    let template = SettingsTemplate {
        title: "Settings".into(),
        settings,
        manifest: state.manifest.clone(),
        version: VERSION,
        login_enabled: state.config.requires_login(),
        currencies: CURRENCIES,
        locales: LOCALES,
        themes: THEMES,
        page_sizes: PAGE_SIZES,
        saved,
        error,
    };
    template.render_html()
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsParams {
    pub saved: Option<String>,
}

pub async fn index(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(params): Query<SettingsParams>,
) -> AppResult<Html<String>> {
    let settings = state.load_settings(&ctx).await?;
    render(&state, settings, params.saved.is_some(), None).await
}

pub async fn update(
    State(state): State<AppState>,
    ctx: RequestContext,
    headers: HeaderMap,
    Form(form): Form<SettingsFormData>,
) -> AppResult<Response> {
    let current = state.load_settings(&ctx).await?;
    let result = match form.apply(&current) {
        Ok(updated) => api::settings::update(&state.api, &ctx, &updated)
            .await
            .map(|()| updated),
        Err(e) => Err(e),
    };

    match result {
        Ok(updated) => {
            info!(mode = updated.budget_mode.as_str(), currency = %updated.currency, "Settings saved");
            state.cache.invalidate();
            if is_htmx(&headers) {
                return Ok(Html(
                    r#"<span class="text-sm text-green-600" role="status">Settings saved</span>"#.to_string(),
                )
                .into_response());
            }
            Ok(Redirect::to("/settings?saved=1").into_response())
        }
        Err(AppError::Validation(msg)) => Ok(render(&state, current, false, Some(msg))
            .await?
            .into_response()),
        Err(e) => Err(e),
    }
}
