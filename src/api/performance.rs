use super::{ApiClient, RequestContext};
use crate::error::AppResult;
use crate::models::{PerformanceResponse, Spender};

pub const ENDPOINT: &str = "/performance";

pub fn params(spender: &Spender) -> Vec<(&'static str, String)> {
    vec![("spender", spender.as_param().to_string())]
}

pub async fn fetch(
    api: &ApiClient,
    ctx: &RequestContext,
    spender: &Spender,
) -> AppResult<PerformanceResponse> {
    api.get(ctx, ENDPOINT, &params(spender)).await
}
