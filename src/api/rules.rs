use reqwest::Method;

use super::{ApiClient, RequestContext};
use crate::error::AppResult;
use crate::models::{ApplyRulesResult, NewRule, Rule, RuleSuggestion};

pub const ENDPOINT: &str = "/rules";

pub async fn list(api: &ApiClient, ctx: &RequestContext) -> AppResult<Vec<Rule>> {
    api.get(ctx, ENDPOINT, &[]).await
}

/// Validated locally first; an invalid rule never reaches the backend.
pub async fn create(api: &ApiClient, ctx: &RequestContext, rule: &NewRule) -> AppResult<()> {
    rule.validate()?;
    api.send_empty(ctx, Method::POST, ENDPOINT, Some(rule)).await
}

pub async fn delete(api: &ApiClient, ctx: &RequestContext, id: i64) -> AppResult<()> {
    api.delete(ctx, &format!("{}/{}", ENDPOINT, id)).await
}

pub async fn suggestions(api: &ApiClient, ctx: &RequestContext) -> AppResult<Vec<RuleSuggestion>> {
    api.get(ctx, "/rules/suggestions", &[]).await
}

/// Ask the backend to run all rules over uncategorized transactions.
pub async fn apply(api: &ApiClient, ctx: &RequestContext) -> AppResult<ApplyRulesResult> {
    api.send(ctx, Method::POST, "/rules/apply", &serde_json::json!({}))
        .await
}
