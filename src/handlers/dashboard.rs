use askama::Template;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse};
use serde::Deserialize;
use tracing::debug;

use crate::api::RequestContext;
use crate::error::{AppResult, RenderHtml};
use crate::filters::{self, PLACEHOLDER};
use crate::handlers::{spender_options, SelectOption};
use crate::models::{Settings, Spender};
use crate::services::export;
use crate::services::performance::{self, PerformanceRow, PerformanceView};
use crate::state::{AppState, JsManifest};
use crate::VERSION;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    pub spender: Option<String>,
    /// Index into the response's `months`.
    pub month: Option<String>,
}

impl DashboardParams {
    pub fn spender(&self) -> Spender {
        Spender::parse(self.spender.as_deref().unwrap_or(""))
    }

    pub fn month_index(&self) -> Option<usize> {
        self.month.as_deref().and_then(|m| m.trim().parse().ok())
    }
}

pub struct MonthTab {
    pub label: String,
    pub href: String,
    pub selected: bool,
}

/// One spreadsheet row with every number already formatted.
pub struct RowDisplay {
    pub name: String,
    pub indent: usize,
    pub is_child: bool,
    pub months: Vec<String>,
    pub spend: String,
    pub limit: String,
    pub average: String,
    pub variance_budget: String,
    pub variance_average: String,
    pub status_class: &'static str,
    pub status_label: &'static str,
    pub percent_used: String,
    pub meter_width: u8,
    pub over: bool,
}

pub struct TotalDisplay {
    pub label: &'static str,
    pub spend: String,
    pub limit: String,
    pub remaining: String,
    pub over: bool,
}

#[derive(Template)]
#[template(path = "pages/dashboard.html")]
pub struct DashboardTemplate {
    pub title: String,
    pub settings: Settings,
    pub manifest: JsManifest,
    pub version: &'static str,
    pub login_enabled: bool,
    pub spenders: Vec<SelectOption>,
    pub spender: String,
    pub month_tabs: Vec<MonthTab>,
    pub selected_label: String,
    pub rows: Vec<RowDisplay>,
    pub totals: Vec<TotalDisplay>,
    pub over_budget_count: usize,
    pub export_href: String,
}

fn row_display(row: &PerformanceRow, months: usize, settings: &Settings) -> RowDisplay {
    let neutral = |v: Option<f64>| {
        v.map(|v| settings.format_money_neutral(&v))
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    };
    let status_label = match row.status {
        performance::BudgetStatus::Over => "Over budget",
        performance::BudgetStatus::Under => "Under budget",
        performance::BudgetStatus::NoBudget => "",
    };
    RowDisplay {
        name: row.name.clone(),
        indent: row.depth * 16,
        is_child: row.depth > 0,
        months: (0..months)
            .map(|i| neutral(row.spend_by_month.get(i).copied()))
            .collect(),
        spend: neutral(row.spend),
        limit: neutral(row.budget_limit),
        average: neutral(row.average),
        variance_budget: settings.format_variance(&row.variance_vs_budget),
        variance_average: settings.format_variance(&row.variance_vs_average),
        status_class: row.status.css_class(),
        status_label,
        percent_used: row
            .percent_used()
            .map(|p| filters::format_percent(p, &settings.locale))
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
        meter_width: row.meter_width(),
        over: row.status.is_over(),
    }
}

fn query_string(spender: &Spender, month: Option<usize>) -> String {
    let mut query = format!("spender={}", urlencoding::encode(spender.as_param()));
    if let Some(month) = month {
        query.push_str(&format!("&month={}", month));
    }
    query
}

pub(crate) fn totals_display(view: &PerformanceView, settings: &Settings) -> Vec<TotalDisplay> {
    view.totals
        .iter()
        .map(|t| TotalDisplay {
            label: t.group.label(),
            spend: settings.format_money_neutral(&t.spend),
            limit: settings.format_money_neutral(&t.budget_limit),
            remaining: settings.format_money_plain(&t.remaining()),
            over: t.budget_limit > 0.0 && t.remaining() < 0.0,
        })
        .collect()
}

pub async fn index(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(params): Query<DashboardParams>,
) -> AppResult<Html<String>> {
    let spender = params.spender();
    debug!(spender = spender.as_param(), "Loading dashboard");

    let (settings, members, response) = tokio::try_join!(
        state.load_settings(&ctx),
        state.cached_members(&ctx),
        state.cached_performance(&ctx, &spender),
    )?;

    let view = performance::aggregate(&response, params.month_index());
    debug!(
        rows = view.rows.len(),
        selected = ?view.selected_month,
        "Performance aggregated"
    );

    let month_tabs = view
        .months
        .iter()
        .enumerate()
        .map(|(i, label)| MonthTab {
            label: label.clone(),
            href: format!("/?{}", query_string(&spender, Some(i))),
            selected: view.is_selected(&i),
        })
        .collect();
    let rows = view
        .rows
        .iter()
        .map(|row| row_display(row, view.months.len(), &settings))
        .collect();

    let template = DashboardTemplate {
        title: "Budget".into(),
        spenders: spender_options(&members, &spender),
        spender: spender.as_param().to_string(),
        month_tabs,
        selected_label: view.selected_label().to_string(),
        rows,
        totals: totals_display(&view, &settings),
        over_budget_count: view.over_budget_count(),
        export_href: format!(
            "/performance/export?{}",
            query_string(&spender, view.selected_month)
        ),
        settings,
        manifest: state.manifest.clone(),
        version: VERSION,
        login_enabled: state.config.requires_login(),
    };

    template.render_html()
}

pub async fn export(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(params): Query<DashboardParams>,
) -> AppResult<impl IntoResponse> {
    let spender = params.spender();
    let response = state.cached_performance(&ctx, &spender).await?;
    let view = performance::aggregate(&response, params.month_index());
    let body = export::performance_csv(&view)?;

    let filename = format!(
        "performance-{}.csv",
        spender
            .as_param()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase()
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    ))
}
