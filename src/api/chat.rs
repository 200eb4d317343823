use reqwest::Method;

use super::{ApiClient, RequestContext};
use crate::error::{AppError, AppResult};
use crate::models::{ChatMessage, ChatReply, ChatRequest};

pub async fn ask(
    api: &ApiClient,
    ctx: &RequestContext,
    message: &str,
    history: &[ChatMessage],
) -> AppResult<String> {
    let reply: ChatReply = api
        .send(ctx, Method::POST, "/chat", &ChatRequest { message, history })
        .await?;
    if reply.reply.trim().is_empty() {
        return Err(AppError::Api {
            status: 200,
            message: "empty assistant reply".into(),
        });
    }
    Ok(reply.reply)
}
