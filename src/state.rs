use crate::api::{self, ApiClient, RequestContext};
use crate::cache::{CacheKey, ResponseCache};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{Bucket, Member, PerformanceResponse, Settings, Spender};
use crate::session::SessionStore;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub api: ApiClient,
    pub config: Arc<Config>,
    pub manifest: JsManifest,
    pub cache: Arc<ResponseCache>,
    pub sessions: SessionStore,
}

impl AppState {
    /// Household settings; a missing settings document means defaults.
    pub async fn load_settings(&self, ctx: &RequestContext) -> AppResult<Settings> {
        let key = CacheKey::new(api::settings::ENDPOINT, &[], ctx);
        let fetch = async {
            match api::settings::fetch(&self.api, ctx).await {
                Err(AppError::NotFound(_)) => Ok(Settings::default()),
                other => other,
            }
        };
        self.cache.load(key, fetch).await
    }

    /// Flat bucket list. Backends that only serve the nested tree are read
    /// through `/buckets/tree` instead.
    pub async fn cached_buckets(&self, ctx: &RequestContext) -> AppResult<Vec<Bucket>> {
        let key = CacheKey::new(api::buckets::ENDPOINT, &[], ctx);
        let fetch = async {
            match api::buckets::list(&self.api, ctx).await {
                Err(AppError::NotFound(_)) => api::buckets::list_from_tree(&self.api, ctx).await,
                other => other,
            }
        };
        self.cache.load(key, fetch).await
    }

    pub async fn cached_members(&self, ctx: &RequestContext) -> AppResult<Vec<Member>> {
        let key = CacheKey::new(api::members::ENDPOINT, &[], ctx);
        self.cache.load(key, api::members::list(&self.api, ctx)).await
    }

    pub async fn cached_performance(
        &self,
        ctx: &RequestContext,
        spender: &Spender,
    ) -> AppResult<PerformanceResponse> {
        let key = CacheKey::new(
            api::performance::ENDPOINT,
            &api::performance::params(spender),
            ctx,
        );
        self.cache
            .load(key, api::performance::fetch(&self.api, ctx, spender))
            .await
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct JsManifest(HashMap<String, String>);

impl JsManifest {
    pub fn load(static_path: &Path) -> Self {
        let path = static_path.join("js/dist/manifest.json");
        match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => {
                tracing::warn!(
                    "manifest.json not found at {}, using empty manifest",
                    path.display()
                );
                Self::default()
            }
        }
    }

    pub fn get(&self, name: &str) -> String {
        self.0
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let dist = dir.path().join("js/dist");
        fs::create_dir_all(&dist).unwrap();
        fs::write(
            dist.join("manifest.json"),
            r#"{"sankey.js": "sankey-3f2a1c.js"}"#,
        )
        .unwrap();

        let manifest = JsManifest::load(dir.path());
        assert_eq!(manifest.get("sankey.js"), "sankey-3f2a1c.js");
        assert_eq!(manifest.get("app.js"), "app.js");
    }

    #[test]
    fn test_missing_manifest_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = JsManifest::load(dir.path());
        assert_eq!(manifest.get("app.js"), "app.js");
    }
}
