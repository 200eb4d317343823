//! JSON views over the same aggregations the pages render.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::api::{self, RequestContext};
use crate::error::AppResult;
use crate::handlers::dashboard::DashboardParams;
use crate::models::BucketNode;
use crate::services::partition::{self, GroupPartition};
use crate::services::performance::{self, PerformanceView};
use crate::services::{bucket_tree, sankey};
use crate::state::AppState;

pub async fn performance(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(params): Query<DashboardParams>,
) -> AppResult<Json<PerformanceView>> {
    let response = state.cached_performance(&ctx, &params.spender()).await?;
    Ok(Json(performance::aggregate(&response, params.month_index())))
}

pub async fn bucket_tree(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> AppResult<Json<Vec<BucketNode>>> {
    let buckets = state.cached_buckets(&ctx).await?;
    Ok(Json(bucket_tree::build_tree(&buckets)))
}

pub async fn bucket_groups(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> AppResult<Json<GroupPartition>> {
    let buckets = state.cached_buckets(&ctx).await?;
    let tree = bucket_tree::build_tree(&buckets);
    Ok(Json(partition::partition(&tree)))
}

#[derive(Debug, Default, Deserialize)]
pub struct CashflowParams {
    pub month: Option<String>,
}

pub async fn cashflow(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(params): Query<CashflowParams>,
) -> AppResult<Response> {
    let graph = api::cashflow::fetch(&state.api, &ctx, params.month.as_deref()).await?;
    Ok(match sankey::sanitize(&graph) {
        Some(sanitized) => Json(sanitized).into_response(),
        None => Json(json!({ "status": "no_data" })).into_response(),
    })
}
