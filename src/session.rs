//! In-memory per-visitor state: backend credentials, bucket edit buffers
//! and assistant chat history. Lost on restart, like the sessions
//! themselves.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::models::{ChatMessage, NewBucket};
use crate::services::edit_buffer::EditBuffer;

/// Session id used by every request in service-token mode.
pub const SHARED_SESSION: &str = "shared";

/// Oldest messages are dropped beyond this many.
pub const CHAT_HISTORY_LIMIT: usize = 20;

#[derive(Debug, Default)]
pub struct Session {
    pub token: Option<String>,
    pub bucket_drafts: HashMap<i64, EditBuffer<NewBucket>>,
    pub chat: Vec<ChatMessage>,
}

impl Session {
    pub fn push_chat(&mut self, message: ChatMessage) {
        self.chat.push(message);
        if self.chat.len() > CHAT_HISTORY_LIMIT {
            let excess = self.chat.len() - CHAT_HISTORY_LIMIT;
            self.chat.drain(..excess);
        }
    }
}

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session holding a backend token; returns the cookie value.
    pub fn create(&self, token: Option<String>) -> String {
        let id = Uuid::new_v4().to_string();
        self.lock().insert(
            id.clone(),
            Session {
                token,
                ..Default::default()
            },
        );
        id
    }

    pub fn remove(&self, id: &str) -> bool {
        self.lock().remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    /// Backend token of an existing session.
    pub fn token(&self, id: &str) -> Option<Option<String>> {
        self.lock().get(id).map(|s| s.token.clone())
    }

    /// Run `f` on a session, creating an empty one if it does not exist
    /// (the shared session in service-token mode is created this way).
    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut sessions = self.lock();
        let session = sessions.entry(id.to_string()).or_default();
        f(session)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
