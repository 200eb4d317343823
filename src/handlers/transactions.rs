use askama::Template;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::api::{self, RequestContext};
use crate::date_utils::{format_date, Month};
use crate::error::{AppError, AppResult, RenderHtml};
use crate::form_utils::deserialize_optional_i64;
use crate::handlers::{bucket_select, is_htmx, spender_options, SelectOption};
use crate::models::{Member, Settings, Spender, Transaction, TransactionAssignment, TransactionQuery};
use crate::services::bucket_tree;
use crate::services::split::{SplitEditor, SplitLine};
use crate::state::{AppState, JsManifest};
use crate::VERSION;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TransactionFilterParams {
    pub search: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub bucket_id: Option<i64>,
    pub spender: Option<String>,
    /// `YYYY-MM`; absent means all months.
    pub month: Option<String>,
    pub page: Option<i64>,
}

impl TransactionFilterParams {
    pub fn month(&self) -> Option<Month> {
        self.month.as_deref().and_then(Month::parse)
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    fn spender(&self) -> Spender {
        Spender::parse(self.spender.as_deref().unwrap_or(""))
    }

    pub fn to_query(&self, page_size: i64) -> TransactionQuery {
        let spender = self.spender();
        TransactionQuery {
            search: self.search.clone().map(|s| s.trim().to_string()),
            bucket_id: self.bucket_id,
            spender: (spender != Spender::Combined).then(|| spender.as_param().to_string()),
            month: self.month().map(|m| m.as_param()),
            page: self.page(),
            page_size,
        }
    }

    /// Query string for this filter with the month and page replaced.
    pub fn href(&self, month: Option<&Month>, page: i64) -> String {
        let mut parts = Vec::new();
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("search={}", urlencoding::encode(search)));
        }
        if let Some(bucket_id) = self.bucket_id {
            parts.push(format!("bucket_id={}", bucket_id));
        }
        if let Some(spender) = self.spender.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("spender={}", urlencoding::encode(spender)));
        }
        if let Some(month) = month {
            parts.push(format!("month={}", month.as_param()));
        }
        if page > 1 {
            parts.push(format!("page={}", page));
        }
        if parts.is_empty() {
            "/transactions".to_string()
        } else {
            format!("/transactions?{}", parts.join("&"))
        }
    }
}

pub struct TransactionRow {
    pub id: i64,
    pub date: String,
    pub description: String,
    pub amount: String,
    pub account: String,
    pub buckets: Vec<SelectOption>,
    pub spenders: Vec<SelectOption>,
    pub uncategorized: bool,
}

pub struct Pagination {
    pub page: i64,
    pub total_pages: i64,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
}

pub struct MonthNav {
    pub label: String,
    pub prev_href: String,
    pub next_href: String,
    pub all_href: String,
}

pub struct TransactionTable {
    pub rows: Vec<TransactionRow>,
    pub total: i64,
    pub pagination: Pagination,
    pub return_to: String,
}

/// The table alone, for HTMX filter requests. The full page includes the
/// same partial.
#[derive(Template)]
#[template(path = "partials/transaction_table.html")]
pub struct TransactionTableTemplate {
    pub table: TransactionTable,
}

#[derive(Template)]
#[template(path = "pages/transactions.html")]
pub struct TransactionsTemplate {
    pub title: String,
    pub settings: Settings,
    pub manifest: JsManifest,
    pub version: &'static str,
    pub login_enabled: bool,
    pub search: String,
    pub bucket_filter: Vec<SelectOption>,
    pub spender_filter: Vec<SelectOption>,
    pub month: Option<String>,
    pub month_nav: MonthNav,
    pub table: TransactionTable,
}

/// Joint plus one entry per member; Combined is a filter, not an owner.
fn owner_options(members: &[Member], transaction: &Transaction) -> Vec<SelectOption> {
    let owner = transaction.spender_label();
    let mut options = vec![SelectOption {
        value: "Joint".into(),
        label: "Joint".into(),
        selected: owner == "Joint",
    }];
    options.extend(members.iter().map(|m| SelectOption {
        value: m.name.clone(),
        label: m.name.clone(),
        selected: owner == m.name,
    }));
    options
}

fn total_pages(total: i64, page_size: i64) -> i64 {
    let page_size = page_size.max(1);
    ((total + page_size - 1) / page_size).max(1)
}

pub async fn index(
    State(state): State<AppState>,
    ctx: RequestContext,
    headers: HeaderMap,
    Query(filter): Query<TransactionFilterParams>,
) -> AppResult<Response> {
    let settings = state.load_settings(&ctx).await?;
    let query = filter.to_query(settings.page_size);
    debug!(?query, "Listing transactions");

    let (buckets, members, page) = tokio::try_join!(
        state.cached_buckets(&ctx),
        state.cached_members(&ctx),
        api::transactions::list(&state.api, &ctx, &query),
    )?;
    let options = bucket_tree::flatten_for_select(&bucket_tree::build_tree(&buckets));

    let month = filter.month();
    let current_page = filter.page();
    let pages = total_pages(page.total, settings.page_size);
    let rows = page
        .transactions
        .iter()
        .map(|tx| TransactionRow {
            id: tx.id,
            date: format_date(&tx.date),
            description: tx.description.clone(),
            amount: settings.format_money(&tx.amount),
            account: tx.account_name.clone().unwrap_or_default(),
            buckets: bucket_select(&options, tx.bucket_id),
            spenders: owner_options(&members, tx),
            uncategorized: tx.bucket_id.is_none(),
        })
        .collect();

    let table = TransactionTable {
        rows,
        total: page.total,
        pagination: Pagination {
            page: current_page,
            total_pages: pages,
            prev_href: (current_page > 1).then(|| filter.href(month.as_ref(), current_page - 1)),
            next_href: (current_page < pages).then(|| filter.href(month.as_ref(), current_page + 1)),
        },
        return_to: filter.href(month.as_ref(), current_page),
    };

    if is_htmx(&headers) {
        return Ok(TransactionTableTemplate { table }.render_html()?.into_response());
    }

    let shown = month.unwrap_or_else(Month::current);
    let month_nav = MonthNav {
        label: month
            .map(|m| m.label())
            .unwrap_or_else(|| "All months".to_string()),
        prev_href: filter.href(Some(&shown.prev()), 1),
        next_href: filter.href(Some(&shown.next()), 1),
        all_href: filter.href(None, 1),
    };

    let template = TransactionsTemplate {
        title: "Transactions".into(),
        search: filter.search.clone().unwrap_or_default(),
        bucket_filter: bucket_select(&options, filter.bucket_id),
        spender_filter: spender_options(&members, &filter.spender()),
        month: month.map(|m| m.as_param()),
        month_nav,
        table,
        settings,
        manifest: state.manifest.clone(),
        version: VERSION,
        login_enabled: state.config.requires_login(),
    };
    Ok(template.render_html()?.into_response())
}

#[derive(Debug, Deserialize)]
pub struct AssignFormData {
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub bucket_id: Option<i64>,
    #[serde(default)]
    pub spender: String,
    #[serde(default)]
    pub return_to: String,
}

impl AssignFormData {
    fn assignment(&self) -> TransactionAssignment {
        let spender = self.spender.trim();
        TransactionAssignment {
            bucket_id: self.bucket_id,
            spender: match spender {
                "" | "Joint" => None,
                name => Some(name.to_string()),
            },
        }
    }
}

/// Only redirect back into the transaction list.
fn safe_return(return_to: &str) -> &str {
    if return_to.starts_with("/transactions") && !return_to.starts_with("//") {
        return_to
    } else {
        "/transactions"
    }
}

pub async fn assign(
    State(state): State<AppState>,
    ctx: RequestContext,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<AssignFormData>,
) -> AppResult<Response> {
    let assignment = form.assignment();
    api::transactions::assign(&state.api, &ctx, id, &assignment).await?;
    info!(transaction_id = id, bucket_id = ?assignment.bucket_id, "Assigned transaction");

    if is_htmx(&headers) {
        return Ok(Html(r#"<span class="text-xs text-green-600">Saved</span>"#.to_string()).into_response());
    }
    Ok(Redirect::to(safe_return(&form.return_to)).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteFormData {
    #[serde(default)]
    pub return_to: String,
}

pub async fn delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i64>,
    Form(form): Form<DeleteFormData>,
) -> AppResult<Redirect> {
    api::transactions::delete(&state.api, &ctx, id).await?;
    info!(transaction_id = id, "Deleted transaction");
    Ok(Redirect::to(safe_return(&form.return_to)))
}

// Split editor

/// What the split form asks for besides re-rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitAction {
    Refresh,
    Add,
    Remove(usize),
    /// An amount changed; rebalance around this line.
    Amount(usize),
    Submit,
}

impl SplitAction {
    fn parse(s: &str) -> Self {
        let index = |rest: &str| rest.parse::<usize>().ok();
        match s.split_once(':') {
            Some(("remove", rest)) => index(rest).map_or(Self::Refresh, Self::Remove),
            Some(("amount", rest)) => index(rest).map_or(Self::Refresh, Self::Amount),
            _ => match s {
                "add" => Self::Add,
                "submit" => Self::Submit,
                _ => Self::Refresh,
            },
        }
    }
}

/// Read repeated `description`/`amount`/`bucket_id` fields back into lines.
/// Each `description` opens a new line.
pub fn parse_split_form(fields: &[(String, String)]) -> (Vec<SplitLine>, SplitAction) {
    let mut lines: Vec<SplitLine> = Vec::new();
    let mut action = SplitAction::Refresh;
    for (key, value) in fields {
        match key.as_str() {
            "description" => lines.push(SplitLine {
                description: value.clone(),
                ..SplitLine::default()
            }),
            "amount" => {
                if let Some(line) = lines.last_mut() {
                    line.amount = value.clone();
                }
            }
            "bucket_id" => {
                if let Some(line) = lines.last_mut() {
                    line.bucket_id = value.trim().parse().ok();
                }
            }
            "action" => action = SplitAction::parse(value.trim()),
            _ => {}
        }
    }
    (lines, action)
}

pub struct SplitLineDisplay {
    pub index: usize,
    pub description: String,
    pub amount: String,
    pub buckets: Vec<SelectOption>,
}

#[derive(Template)]
#[template(path = "pages/split.html")]
pub struct SplitTemplate {
    pub title: String,
    pub settings: Settings,
    pub manifest: JsManifest,
    pub version: &'static str,
    pub login_enabled: bool,
    pub transaction_id: i64,
    pub description: String,
    pub date: String,
    pub original: String,
    pub lines: Vec<SplitLineDisplay>,
    pub can_remove: bool,
    pub total: String,
    pub remaining: String,
    pub balanced: bool,
    pub error: Option<String>,
}

async fn render_split(
    state: &AppState,
    ctx: &RequestContext,
    transaction: &Transaction,
    editor: &SplitEditor,
    error: Option<String>,
) -> AppResult<Html<String>> {
    let (settings, buckets) =
        tokio::try_join!(state.load_settings(ctx), state.cached_buckets(ctx))?;
    let options = bucket_tree::flatten_for_select(&bucket_tree::build_tree(&buckets));

    let lines = editor
        .lines()
        .iter()
        .enumerate()
        .map(|(index, line)| SplitLineDisplay {
            index,
            description: line.description.clone(),
            amount: line.amount.clone(),
            buckets: bucket_select(&options, line.bucket_id),
        })
        .collect();

    let template = SplitTemplate {
        title: "Split transaction".into(),
        transaction_id: editor.transaction_id(),
        description: transaction.description.clone(),
        date: format_date(&transaction.date),
        original: settings.format_money_neutral(&editor.original_abs()),
        lines,
        can_remove: editor.can_remove(),
        total: settings.format_money_neutral(&editor.total()),
        remaining: settings.format_money_plain(&editor.remaining()),
        balanced: editor.is_balanced(),
        error,
        settings,
        manifest: state.manifest.clone(),
        version: VERSION,
        login_enabled: state.config.requires_login(),
    };
    template.render_html()
}

pub async fn split_form(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i64>,
) -> AppResult<Html<String>> {
    let transaction = api::transactions::get(&state.api, &ctx, id).await?;
    let editor = SplitEditor::initialize(&transaction);
    render_split(&state, &ctx, &transaction, &editor, None).await
}

pub async fn split_action(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i64>,
    Form(fields): Form<Vec<(String, String)>>,
) -> AppResult<Response> {
    let transaction = api::transactions::get(&state.api, &ctx, id).await?;
    let (lines, action) = parse_split_form(&fields);
    let mut editor = SplitEditor::resume(&transaction, lines);
    debug!(transaction_id = id, ?action, lines = editor.lines().len(), "Split action");

    let outcome = match action {
        SplitAction::Refresh => Ok(()),
        SplitAction::Add => {
            editor.add_line();
            Ok(())
        }
        SplitAction::Remove(index) => editor.remove_line(index),
        SplitAction::Amount(index) => {
            let raw = editor
                .lines()
                .get(index)
                .map(|line| line.amount.clone())
                .unwrap_or_default();
            editor.set_amount(index, &raw)
        }
        SplitAction::Submit => match editor.submit() {
            Ok(payload) => {
                match api::transactions::split(&state.api, &ctx, id, &payload).await {
                    Ok(()) => {
                        info!(transaction_id = id, lines = payload.len(), "Split transaction");
                        return Ok(Redirect::to("/transactions").into_response());
                    }
                    Err(AppError::Validation(msg)) => {
                        warn!(transaction_id = id, "Backend rejected split: {}", msg);
                        let html = render_split(&state, &ctx, &transaction, &editor, Some(msg)).await?;
                        return Ok(html.into_response());
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) => Err(e),
        },
    };

    let error = outcome.err().map(|e| e.to_string());
    Ok(render_split(&state, &ctx, &transaction, &editor, error)
        .await?
        .into_response())
}
