use reqwest::Method;

use super::{ApiClient, RequestContext};
use crate::error::AppResult;
use crate::models::Settings;

pub const ENDPOINT: &str = "/settings";

pub async fn fetch(api: &ApiClient, ctx: &RequestContext) -> AppResult<Settings> {
    api.get(ctx, ENDPOINT, &[]).await
}

pub async fn update(api: &ApiClient, ctx: &RequestContext, settings: &Settings) -> AppResult<()> {
    api.send_empty(ctx, Method::PUT, ENDPOINT, Some(settings)).await
}
