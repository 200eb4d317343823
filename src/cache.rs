//! Generation-tagged response cache for backend reads.
//!
//! Entries are keyed by endpoint, sorted filter parameters and a digest of
//! the caller's credentials. Each entry remembers the generation it was
//! fetched under; bumping the generation makes every older entry invisible,
//! including values whose fetch was still in flight at the time.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Request};
use axum::middleware::Next;
use axum::response::Response;

use crate::api::RequestContext;
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    endpoint: String,
    params: Vec<(String, String)>,
    credential: u64,
}

impl CacheKey {
    pub fn new(endpoint: &str, params: &[(&str, String)], ctx: &RequestContext) -> Self {
        let mut params: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        params.sort();
        Self {
            endpoint: endpoint.to_string(),
            params,
            credential: ctx.credential_digest(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

type Entry = (u64, Arc<dyn Any + Send + Sync>);

pub struct ResponseCache {
    generation: AtomicU64,
    entries: RwLock<HashMap<CacheKey, Entry>>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn gen(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Drop everything. Fetches that started before this call can still
    /// store their result, but it is tagged with the old generation and
    /// never served.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    /// Drop all entries for one endpoint, for every parameter set and
    /// household.
    pub fn invalidate_endpoint(&self, endpoint: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|key, _| key.endpoint != endpoint);
        }
    }

    pub fn get<T: Clone + Send + Sync + 'static>(&self, key: &CacheKey) -> Option<T> {
        let gen = self.gen();
        let entries = self.entries.read().ok()?;
        match entries.get(key) {
            Some((stored_gen, value)) if *stored_gen == gen => value.downcast_ref::<T>().cloned(),
            _ => None,
        }
    }

    fn set<T: Send + Sync + 'static>(&self, key: CacheKey, gen: u64, value: T) {
        if let Ok(mut entries) = self.entries.write() {
            if let Some((existing, _)) = entries.get(&key) {
                if *existing > gen {
                    return;
                }
            }
            entries.insert(key, (gen, Arc::new(value)));
        }
    }

    /// Serve `key` from the cache or run `fetch` and remember its result.
    /// Errors are never cached.
    pub async fn load<T, F>(&self, key: CacheKey, fetch: F) -> AppResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Future<Output = AppResult<T>>,
    {
        if let Some(cached) = self.get::<T>(&key) {
            tracing::debug!(endpoint = key.endpoint(), "cache hit");
            return Ok(cached);
        }
        let gen = self.gen();
        let value = fetch.await?;
        self.set(key, gen, value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Successful mutations may change any read, so they clear the whole cache.
pub async fn cache_invalidation_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let mutating = matches!(
        *req.method(),
        Method::POST | Method::PUT | Method::DELETE | Method::PATCH
    );
    let resp = next.run(req).await;
    if mutating && (resp.status().is_success() || resp.status().is_redirection()) {
        state.cache.invalidate();
    }
    resp
}
