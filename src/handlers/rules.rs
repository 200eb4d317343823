use askama::Template;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use tracing::{info, warn};

use crate::api::{self, RequestContext};
use crate::error::{AppError, AppResult, RenderHtml};
use crate::form_utils::deserialize_optional_i64;
use crate::handlers::{bucket_select, SelectOption};
use crate::models::{MatchType, NewRule, Rule, RuleSuggestion, Settings};
use crate::services::bucket_tree;
use crate::state::{AppState, JsManifest};
use crate::VERSION;

/// Result of trying a pattern against a sample description.
pub struct RulePreview {
    pub pattern: String,
    pub description: String,
    pub matched: Option<bool>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/rules.html")]
pub struct RulesTemplate {
    pub title: String,
    pub settings: Settings,
    pub manifest: JsManifest,
    pub version: &'static str,
    pub login_enabled: bool,
    pub rules: Vec<Rule>,
    pub suggestions: Vec<RuleSuggestion>,
    pub buckets: Vec<SelectOption>,
    pub match_types: Vec<SelectOption>,
    pub notice: Option<String>,
    pub error: Option<String>,
    pub preview: Option<RulePreview>,
}

#[derive(Debug, Deserialize)]
pub struct RuleFormData {
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub match_type: String,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub bucket_id: Option<i64>,
    #[serde(default)]
    pub spender: String,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub priority: Option<i64>,
}

impl RuleFormData {
    fn match_type(&self) -> MatchType {
        MatchType::parse(self.match_type.trim()).unwrap_or_default()
    }

    fn into_new_rule(self) -> NewRule {
        let spender = self.spender.trim();
        NewRule {
            match_type: self.match_type(),
            pattern: self.pattern.trim().to_string(),
            bucket_id: self.bucket_id,
            spender: (!spender.is_empty()).then(|| spender.to_string()),
            priority: self.priority.unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RuleTestFormData {
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub match_type: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Default)]
struct PageMessages {
    notice: Option<String>,
    error: Option<String>,
    preview: Option<RulePreview>,
}

async fn render_index(
    state: &AppState,
    ctx: &RequestContext,
    messages: PageMessages,
) -> AppResult<Html<String>> {
    let (settings, rules, buckets) = tokio::try_join!(
        state.load_settings(ctx),
        api::rules::list(&state.api, ctx),
        state.cached_buckets(ctx),
    )?;
    // Suggestions are optional; an older backend may not offer them.
    let suggestions = match api::rules::suggestions(&state.api, ctx).await {
        Ok(suggestions) => suggestions,
        Err(AppError::Unauthorized) => return Err(AppError::Unauthorized),
        Err(e) => {
            warn!("rule suggestions unavailable: {}", e);
            Vec::new()
        }
    };
    let options = bucket_tree::flatten_for_select(&bucket_tree::build_tree(&buckets));

    let template = RulesTemplate {
        title: "Rules".into(),
        rules,
        suggestions,
        buckets: bucket_select(&options, None),
        match_types: MatchType::all()
            .iter()
            .map(|m| SelectOption {
                value: m.as_str().to_string(),
                label: m.display_name().to_string(),
                selected: *m == MatchType::default(),
            })
            .collect(),
        notice: messages.notice,
        error: messages.error,
        preview: messages.preview,
        settings,
        manifest: state.manifest.clone(),
        version: VERSION,
        login_enabled: state.config.requires_login(),
    };
    template.render_html()
}

pub async fn index(State(state): State<AppState>, ctx: RequestContext) -> AppResult<Html<String>> {
    render_index(&state, &ctx, PageMessages::default()).await
}

pub async fn create(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<RuleFormData>,
) -> AppResult<Response> {
    let rule = form.into_new_rule();
    match api::rules::create(&state.api, &ctx, &rule).await {
        Ok(()) => {
            info!(pattern = %rule.pattern, match_type = %rule.match_type, "Created rule");
            Ok(Redirect::to("/rules").into_response())
        }
        Err(AppError::Validation(msg)) => {
            let messages = PageMessages {
                error: Some(msg),
                ..Default::default()
            };
            Ok(render_index(&state, &ctx, messages).await?.into_response())
        }
        Err(e) => Err(e),
    }
}

pub async fn delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i64>,
) -> AppResult<Redirect> {
    api::rules::delete(&state.api, &ctx, id).await?;
    info!(rule_id = id, "Deleted rule");
    Ok(Redirect::to("/rules"))
}

/// Run every rule over uncategorized transactions and report the count.
pub async fn apply(State(state): State<AppState>, ctx: RequestContext) -> AppResult<Html<String>> {
    let result = api::rules::apply(&state.api, &ctx).await?;
    info!(updated = result.updated, "Applied rules");
    // Assignments changed behind every cached view.
    state.cache.invalidate();
    let messages = PageMessages {
        notice: Some(match result.updated {
            0 => "No uncategorized transactions matched a rule.".to_string(),
            1 => "1 transaction was categorized.".to_string(),
            n => format!("{} transactions were categorized.", n),
        }),
        ..Default::default()
    };
    render_index(&state, &ctx, messages).await
}

/// Try a pattern locally without saving it.
pub async fn test(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<RuleTestFormData>,
) -> AppResult<Html<String>> {
    let match_type = MatchType::parse(form.match_type.trim()).unwrap_or_default();
    let (matched, error) = match match_type.matches(&form.pattern, &form.description) {
        Ok(matched) => (Some(matched), None),
        Err(e) => (None, Some(e.to_string())),
    };
    let messages = PageMessages {
        preview: Some(RulePreview {
            pattern: form.pattern,
            description: form.description,
            matched,
            error,
        }),
        ..Default::default()
    };
    render_index(&state, &ctx, messages).await
}
