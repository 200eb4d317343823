use reqwest::Method;

use super::{ApiClient, RequestContext};
use crate::error::AppResult;
use crate::models::{Member, NewMember};

pub const ENDPOINT: &str = "/members";

pub async fn list(api: &ApiClient, ctx: &RequestContext) -> AppResult<Vec<Member>> {
    api.get(ctx, ENDPOINT, &[]).await
}

pub async fn create(api: &ApiClient, ctx: &RequestContext, member: &NewMember) -> AppResult<()> {
    api.send_empty(ctx, Method::POST, ENDPOINT, Some(member)).await
}

pub async fn update(
    api: &ApiClient,
    ctx: &RequestContext,
    id: i64,
    member: &NewMember,
) -> AppResult<()> {
    api.send_empty(ctx, Method::PUT, &format!("{}/{}", ENDPOINT, id), Some(member))
        .await
}

pub async fn delete(api: &ApiClient, ctx: &RequestContext, id: i64) -> AppResult<()> {
    api.delete(ctx, &format!("{}/{}", ENDPOINT, id)).await
}
