use reqwest::Method;

use super::{ApiClient, RequestContext};
use crate::error::AppResult;
use crate::models::{Bucket, BucketRecord, NewBucket};
use crate::services::bucket_tree;

pub const ENDPOINT: &str = "/buckets";

/// Flat bucket list, the tree builder's input.
pub async fn list(api: &ApiClient, ctx: &RequestContext) -> AppResult<Vec<Bucket>> {
    api.get(ctx, ENDPOINT, &[]).await
}

/// Tree-shaped list, flattened so callers can rebuild it with defaults
/// applied.
pub async fn list_from_tree(api: &ApiClient, ctx: &RequestContext) -> AppResult<Vec<Bucket>> {
    let records: Vec<BucketRecord> = api.get(ctx, "/buckets/tree", &[]).await?;
    Ok(bucket_tree::flatten_records(records))
}

pub async fn create(api: &ApiClient, ctx: &RequestContext, bucket: &NewBucket) -> AppResult<Bucket> {
    api.send(ctx, Method::POST, ENDPOINT, bucket).await
}

pub async fn update(
    api: &ApiClient,
    ctx: &RequestContext,
    id: i64,
    bucket: &NewBucket,
) -> AppResult<()> {
    api.send_empty(ctx, Method::PUT, &format!("{}/{}", ENDPOINT, id), Some(bucket))
        .await
}

pub async fn delete(api: &ApiClient, ctx: &RequestContext, id: i64) -> AppResult<()> {
    api.delete(ctx, &format!("{}/{}", ENDPOINT, id)).await
}
