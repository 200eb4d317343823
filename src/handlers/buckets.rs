use std::collections::HashMap;

use askama::Template;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use tracing::{debug, info};

use crate::api::{self, RequestContext};
use crate::error::{AppError, AppResult, RenderHtml};
use crate::filters::format_amount_input;
use crate::form_utils::{deserialize_amount, deserialize_checkbox, deserialize_optional_i64};
use crate::handlers::{is_htmx, SelectOption};
use crate::models::category::parse_tags;
use crate::models::{Bucket, BucketGroup, BucketNode, BucketOption, BudgetMode, NewBucket, Settings};
use crate::services::bucket_tree;
use crate::services::edit_buffer::EditBuffer;
use crate::services::partition::{self, GroupEntry};
use crate::state::{AppState, JsManifest};
use crate::VERSION;

#[derive(Debug, Deserialize)]
pub struct BucketFormData {
    pub name: String,
    #[serde(default)]
    pub group: String,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub limit_a: f64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub limit_b: f64,
    #[serde(default, deserialize_with = "deserialize_checkbox")]
    pub rollover: bool,
    #[serde(default, deserialize_with = "deserialize_checkbox")]
    pub is_shared: bool,
}

impl BucketFormData {
    /// An empty group select means "same as the parent", or Wants at the top
    /// level.
    fn into_new_bucket(self, groups: &HashMap<i64, BucketGroup>) -> NewBucket {
        let group = BucketGroup::parse(&self.group)
            .or_else(|| self.parent_id.and_then(|p| groups.get(&p).copied()))
            .unwrap_or_default();
        let icon = self.icon.trim();
        NewBucket {
            name: self.name.trim().to_string(),
            group,
            parent_id: self.parent_id,
            icon: if icon.is_empty() { "folder".into() } else { icon.to_string() },
            rollover: self.rollover,
            is_shared: self.is_shared,
            limit_a: self.limit_a,
            limit_b: self.limit_b,
            tags: parse_tags(&self.tags),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteFormData {
    #[serde(default)]
    pub confirm: String,
}

pub struct BucketRow {
    pub id: i64,
    pub name: String,
    pub indent: usize,
    pub orphan_of: Option<String>,
    pub icon: String,
    pub dirty: bool,
    pub draft_name: String,
    pub tags: String,
    pub limit_a: String,
    pub limit_b: String,
    pub monthly_limit: String,
    /// Saved limit, for section totals.
    pub saved_limit: f64,
    pub rollover: bool,
    pub is_shared: bool,
    pub groups: Vec<SelectOption>,
    pub parents: Vec<SelectOption>,
}

pub struct BucketSection {
    pub title: &'static str,
    pub rows: Vec<BucketRow>,
    pub total_limit: String,
}

#[derive(Template)]
#[template(path = "pages/buckets.html")]
pub struct BucketsTemplate {
    pub title: String,
    pub settings: Settings,
    pub manifest: JsManifest,
    pub version: &'static str,
    pub login_enabled: bool,
    pub sections: Vec<BucketSection>,
    pub parent_options: Vec<BucketOption>,
    pub group_options: Vec<SelectOption>,
    pub error: Option<String>,
}

fn group_choices(selected: Option<BucketGroup>) -> Vec<SelectOption> {
    BucketGroup::all()
        .iter()
        .map(|g| SelectOption {
            value: g.as_str().to_string(),
            label: g.label().to_string(),
            selected: selected == Some(*g),
        })
        .collect()
}

/// Effective group of every bucket, after tree defaulting.
fn effective_groups(options: &[BucketOption]) -> HashMap<i64, BucketGroup> {
    options.iter().map(|o| (o.id, o.group)).collect()
}

fn server_value(bucket: &Bucket, groups: &HashMap<i64, BucketGroup>) -> NewBucket {
    NewBucket::from_bucket(bucket, groups.get(&bucket.id).copied().unwrap_or_default())
}

/// Bring this session's edit buffers up to date with the server copy and
/// return the value each buffered bucket should display.
fn sync_drafts(
    state: &AppState,
    ctx: &RequestContext,
    buckets: &[Bucket],
    groups: &HashMap<i64, BucketGroup>,
) -> HashMap<i64, (NewBucket, bool)> {
    state.sessions.with_session(ctx.session_id(), |session| {
        session.bucket_drafts.retain(|id, _| groups.contains_key(id));
        buckets
            .iter()
            .filter_map(|bucket| {
                let buffer = session.bucket_drafts.get_mut(&bucket.id)?;
                buffer.sync(&server_value(bucket, groups));
                Some((bucket.id, (buffer.value().clone(), buffer.is_dirty())))
            })
            .collect()
    })
}

struct RowBuilder<'a> {
    settings: &'a Settings,
    options: &'a [BucketOption],
    drafts: &'a HashMap<i64, (NewBucket, bool)>,
    groups: &'a HashMap<i64, BucketGroup>,
}

impl RowBuilder<'_> {
    fn row(&self, bucket: &Bucket, depth: usize, orphan_of: Option<String>) -> BucketRow {
        let (draft, dirty) = self
            .drafts
            .get(&bucket.id)
            .cloned()
            .unwrap_or_else(|| (server_value(bucket, self.groups), false));
        let monthly = match self.settings.budget_mode {
            BudgetMode::Single => draft.limit_a,
            BudgetMode::Couple => draft.limit_a + draft.limit_b,
        };
        BucketRow {
            id: bucket.id,
            name: if orphan_of.is_some() {
                format!("{} *", bucket.name)
            } else {
                bucket.name.clone()
            },
            indent: depth * 20,
            orphan_of,
            icon: draft.icon.clone(),
            dirty,
            draft_name: draft.name.clone(),
            tags: draft.tags.join(", "),
            limit_a: format_amount_input(draft.limit_a),
            limit_b: format_amount_input(draft.limit_b),
            monthly_limit: self.settings.format_money_neutral(&monthly),
            saved_limit: bucket.monthly_limit(self.settings.budget_mode),
            rollover: draft.rollover,
            is_shared: draft.is_shared,
            groups: group_choices(Some(draft.group)),
            parents: self
                .options
                .iter()
                .filter(|o| o.id != bucket.id)
                .map(|o| SelectOption {
                    value: o.id.to_string(),
                    label: o.display_name(),
                    selected: draft.parent_id == Some(o.id),
                })
                .collect(),
        }
    }

    fn push_node(&self, node: &BucketNode, depth: usize, rows: &mut Vec<BucketRow>) {
        rows.push(self.row(&node.bucket, depth, None));
        for child in &node.children {
            self.push_node(child, depth + 1, rows);
        }
    }

    fn push_entry(&self, entry: &GroupEntry, rows: &mut Vec<BucketRow>) {
        rows.push(self.row(&entry.bucket, 0, entry.orphan_of.clone()));
        for child in &entry.children {
            self.push_node(child, 1, rows);
        }
    }

    /// Every bucket appears in exactly one row, so the row sum is the
    /// section's budget.
    fn section(&self, title: &'static str, rows: Vec<BucketRow>) -> BucketSection {
        let total: f64 = rows.iter().map(|r| r.saved_limit).sum();
        BucketSection {
            title,
            rows,
            total_limit: self.settings.format_money_neutral(&total),
        }
    }
}

async fn render_index(
    state: &AppState,
    ctx: &RequestContext,
    error: Option<String>,
) -> AppResult<Html<String>> {
    let (settings, buckets) =
        tokio::try_join!(state.load_settings(ctx), state.cached_buckets(ctx))?;

    let tree = bucket_tree::build_tree(&buckets);
    let parts = partition::partition(&tree);
    let options = bucket_tree::flatten_for_select(&tree);
    let groups = effective_groups(&options);
    let drafts = sync_drafts(state, ctx, &buckets, &groups);
    debug!(
        buckets = buckets.len(),
        needs = parts.needs.len(),
        wants = parts.wants.len(),
        drafts = drafts.len(),
        "Rendering buckets"
    );

    let builder = RowBuilder {
        settings: &settings,
        options: &options,
        drafts: &drafts,
        groups: &groups,
    };

    let mut sections = Vec::new();
    for (title, entries) in [("Needs", &parts.needs), ("Wants", &parts.wants)] {
        let mut rows = Vec::new();
        for entry in entries {
            builder.push_entry(entry, &mut rows);
        }
        sections.push(builder.section(title, rows));
    }
    let income = partition::income_entries(&tree);
    if !income.is_empty() {
        let mut rows = Vec::new();
        for entry in &income {
            builder.push_entry(entry, &mut rows);
        }
        sections.push(builder.section("Income", rows));
    }

    let template = BucketsTemplate {
        title: "Buckets".into(),
        sections,
        parent_options: options,
        group_options: group_choices(None),
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

/// Re-render the page with the failure shown above the list. The session's
/// edit buffers keep the user's input.
async fn render_failure(state: &AppState, ctx: &RequestContext, err: AppError) -> AppResult<Response> {
    match err {
        AppError::Unauthorized => Err(err),
        AppError::Validation(msg) | AppError::NotFound(msg) => {
            Ok(render_index(state, ctx, Some(msg)).await?.into_response())
        }
        other => {
            tracing::error!("bucket mutation failed: {}", other);
            let msg = "The budget service could not save this change. Nothing was lost; try again.";
            Ok(render_index(state, ctx, Some(msg.into())).await?.into_response())
        }
    }
}

fn validate(bucket: &NewBucket, id: Option<i64>, buckets: &[Bucket]) -> AppResult<()> {
    if bucket.name.is_empty() {
        return Err(AppError::validation("Bucket name is required"));
    }
    if let Some(parent_id) = bucket.parent_id {
        if !buckets.iter().any(|b| b.id == parent_id) {
            return Err(AppError::validation("Parent bucket not found"));
        }
        if let Some(id) = id {
            if bucket_tree::creates_cycle(buckets, id, Some(parent_id)) {
                return Err(AppError::validation(
                    "Cannot set parent: would create a circular reference",
                ));
            }
        }
    }
    Ok(())
}

pub async fn create(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<BucketFormData>,
) -> AppResult<Response> {
    let buckets = state.cached_buckets(&ctx).await?;
    let groups = effective_groups(&bucket_tree::flatten_for_select(&bucket_tree::build_tree(&buckets)));
    let new_bucket = form.into_new_bucket(&groups);

    let result = match validate(&new_bucket, None, &buckets) {
        Ok(()) => api::buckets::create(&state.api, &ctx, &new_bucket).await.map(|_| ()),
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => {
            info!(group = new_bucket.group.as_str(), "Created bucket");
            state.cache.invalidate_endpoint(api::buckets::ENDPOINT);
            Ok(Redirect::to("/buckets").into_response())
        }
        Err(e) => render_failure(&state, &ctx, e).await,
    }
}

/// Record an inline edit without saving it.
pub async fn draft(
    State(state): State<AppState>,
    ctx: RequestContext,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<BucketFormData>,
) -> AppResult<Response> {
    let buckets = state.cached_buckets(&ctx).await?;
    let bucket = buckets
        .iter()
        .find(|b| b.id == id)
        .ok_or_else(|| AppError::not_found("Bucket not found"))?;
    let groups = effective_groups(&bucket_tree::flatten_for_select(&bucket_tree::build_tree(&buckets)));
    let server = server_value(bucket, &groups);
    let edited = form.into_new_bucket(&groups);

    let dirty = state.sessions.with_session(ctx.session_id(), |session| {
        let buffer = session
            .bucket_drafts
            .entry(id)
            .or_insert_with(|| EditBuffer::new(server));
        buffer.edit(edited);
        buffer.is_dirty()
    });
    debug!(bucket_id = id, dirty, "Bucket draft updated");

    if is_htmx(&headers) {
        let badge = if dirty {
            r#"<span class="text-xs text-amber-600">Unsaved changes</span>"#
        } else {
            ""
        };
        return Ok(Html(badge.to_string()).into_response());
    }
    Ok(Redirect::to("/buckets").into_response())
}

pub async fn discard(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i64>,
) -> Redirect {
    state.sessions.with_session(ctx.session_id(), |session| {
        session.bucket_drafts.remove(&id);
    });
    Redirect::to("/buckets")
}

pub async fn update(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i64>,
    Form(form): Form<BucketFormData>,
) -> AppResult<Response> {
    let (settings, buckets) =
        tokio::try_join!(state.load_settings(&ctx), state.cached_buckets(&ctx))?;
    let bucket = buckets
        .iter()
        .find(|b| b.id == id)
        .ok_or_else(|| AppError::not_found("Bucket not found"))?;
    let groups = effective_groups(&bucket_tree::flatten_for_select(&bucket_tree::build_tree(&buckets)));
    let server = server_value(bucket, &groups);

    let mut edited = form.into_new_bucket(&groups);
    if !settings.is_couple() {
        // Single mode never shows limit B; keep whatever the backend has.
        edited.limit_b = bucket.limit_b;
    }

    state.sessions.with_session(ctx.session_id(), |session| {
        session
            .bucket_drafts
            .entry(id)
            .or_insert_with(|| EditBuffer::new(server))
            .edit(edited.clone());
    });

    let result = match validate(&edited, Some(id), &buckets) {
        Ok(()) => api::buckets::update(&state.api, &ctx, id, &edited).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => {
            info!(bucket_id = id, "Updated bucket");
            state.sessions.with_session(ctx.session_id(), |session| {
                session.bucket_drafts.remove(&id);
            });
            state.cache.invalidate_endpoint(api::buckets::ENDPOINT);
            Ok(Redirect::to("/buckets").into_response())
        }
        Err(e) => render_failure(&state, &ctx, e).await,
    }
}

pub async fn delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i64>,
    Form(form): Form<DeleteFormData>,
) -> AppResult<Response> {
    if form.confirm != "yes" {
        return render_failure(
            &state,
            &ctx,
            AppError::validation("Deleting a bucket needs explicit confirmation"),
        )
        .await;
    }
    match api::buckets::delete(&state.api, &ctx, id).await {
        Ok(()) => {
            info!(bucket_id = id, "Deleted bucket");
            state.sessions.with_session(ctx.session_id(), |session| {
                session.bucket_drafts.remove(&id);
            });
            state.cache.invalidate_endpoint(api::buckets::ENDPOINT);
            Ok(Redirect::to("/buckets").into_response())
        }
        Err(e) => render_failure(&state, &ctx, e).await,
    }
}
