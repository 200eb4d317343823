pub mod api;
pub mod assistant;
pub mod buckets;
pub mod cashflow;
pub mod dashboard;
pub mod members;
pub mod rules;
pub mod settings;
pub mod transactions;

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;

use crate::models::{BucketOption, Member, Spender};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        // Pages
        .route("/", get(dashboard::index))
        .route("/performance/export", get(dashboard::export))
        .route("/buckets", get(buckets::index))
        .route("/transactions", get(transactions::index))
        .route("/members", get(members::index))
        .route("/rules", get(rules::index))
        .route("/cashflow", get(cashflow::index))
        .route("/assistant", get(assistant::index))
        .route("/settings", get(settings::index))
        // Bucket management
        .route("/buckets/create", post(buckets::create))
        .route("/buckets/:id/draft", post(buckets::draft))
        .route("/buckets/:id/discard", post(buckets::discard))
        .route("/buckets/:id/update", post(buckets::update))
        .route("/buckets/:id/delete", post(buckets::delete))
        // Transactions
        .route("/transactions/:id/assign", post(transactions::assign))
        .route("/transactions/:id/delete", post(transactions::delete))
        .route(
            "/transactions/:id/split",
            get(transactions::split_form).post(transactions::split_action),
        )
        // Household members
        .route("/members/create", post(members::create))
        .route("/members/:id/update", post(members::update))
        .route("/members/:id/delete", post(members::delete))
        // Rules
        .route("/rules/create", post(rules::create))
        .route("/rules/apply", post(rules::apply))
        .route("/rules/test", post(rules::test))
        .route("/rules/:id/delete", post(rules::delete))
        // Assistant
        .route("/assistant/ask", post(assistant::ask))
        .route("/assistant/clear", post(assistant::clear))
        // Settings
        .route("/settings/update", post(settings::update))
        // API (JSON)
        .route("/api/performance", get(api::performance))
        .route("/api/buckets/tree", get(api::bucket_tree))
        .route("/api/buckets/groups", get(api::bucket_groups))
        .route("/api/cashflow", get(api::cashflow))
        // Health check
        .route("/health", get(health))
}

async fn health() -> &'static str {
    "OK"
}

pub(crate) fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

/// Entry of a `<select>`, selection resolved up front.
#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Combined, Joint, then one entry per household member.
pub(crate) fn spender_options(members: &[Member], current: &Spender) -> Vec<SelectOption> {
    let mut options = vec![
        SelectOption {
            value: Spender::Combined.as_param().to_string(),
            label: "Everyone".into(),
            selected: *current == Spender::Combined,
        },
        SelectOption {
            value: Spender::Joint.as_param().to_string(),
            label: "Joint".into(),
            selected: *current == Spender::Joint,
        },
    ];
    options.extend(members.iter().map(|m| SelectOption {
        value: m.name.clone(),
        label: m.name.clone(),
        selected: current.is(&m.name),
    }));
    options
}

/// Hierarchical bucket choices with the current one selected.
pub(crate) fn bucket_select(options: &[BucketOption], selected: Option<i64>) -> Vec<SelectOption> {
    options
        .iter()
        .map(|o| SelectOption {
            value: o.id.to_string(),
            label: o.display_name(),
            selected: selected == Some(o.id),
        })
        .collect()
}
