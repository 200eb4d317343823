use serde::{Deserialize, Serialize};

use super::lenient::lenient_string;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn is_user(&self) -> bool {
        matches!(self, ChatRole::User)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    pub history: &'a [ChatMessage],
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    #[serde(default, deserialize_with = "lenient_string")]
    pub reply: String,
}
