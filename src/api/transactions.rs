use reqwest::Method;

use super::{ApiClient, RequestContext};
use crate::error::AppResult;
use crate::models::{SplitLinePayload, Transaction, TransactionAssignment, TransactionPage, TransactionQuery};

pub const ENDPOINT: &str = "/transactions";

pub async fn list(
    api: &ApiClient,
    ctx: &RequestContext,
    query: &TransactionQuery,
) -> AppResult<TransactionPage> {
    api.get(ctx, ENDPOINT, &query.to_params()).await
}

pub async fn get(api: &ApiClient, ctx: &RequestContext, id: i64) -> AppResult<Transaction> {
    api.get(ctx, &format!("{}/{}", ENDPOINT, id), &[]).await
}

pub async fn assign(
    api: &ApiClient,
    ctx: &RequestContext,
    id: i64,
    assignment: &TransactionAssignment,
) -> AppResult<()> {
    api.send_empty(ctx, Method::PUT, &format!("{}/{}", ENDPOINT, id), Some(assignment))
        .await
}

pub async fn delete(api: &ApiClient, ctx: &RequestContext, id: i64) -> AppResult<()> {
    api.delete(ctx, &format!("{}/{}", ENDPOINT, id)).await
}

/// Replace a transaction by its split lines.
pub async fn split(
    api: &ApiClient,
    ctx: &RequestContext,
    id: i64,
    lines: &[SplitLinePayload],
) -> AppResult<()> {
    api.send_empty(ctx, Method::POST, &format!("{}/{}/split", ENDPOINT, id), Some(lines))
        .await
}
