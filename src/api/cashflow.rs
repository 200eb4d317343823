use super::{ApiClient, RequestContext};
use crate::error::AppResult;
use crate::models::SankeyGraph;

pub const ENDPOINT: &str = "/cashflow";

pub async fn fetch(
    api: &ApiClient,
    ctx: &RequestContext,
    month: Option<&str>,
) -> AppResult<SankeyGraph> {
    let params: Vec<(&str, String)> = month
        .filter(|m| !m.is_empty())
        .map(|m| vec![("month", m.to_string())])
        .unwrap_or_default();
    api.get(ctx, ENDPOINT, &params).await
}
