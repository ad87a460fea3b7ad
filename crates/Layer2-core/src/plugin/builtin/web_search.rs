//! Web search plugin (Tavily)
//!
//! `execute(["rust", "async", "traits"])` searches for `"rust async traits"` and
//! returns `{"query", "depth", "answer", "results": [{title, url, content}]}`.
//!
//! Config: `api_key` (falls back to `Tavily.api_key`, then `TAVILY_API_KEY`),
//! `search_depth` (`basic` | `advanced`, default `basic`), `max_results`
//! (default 5), `base_url`.

use super::{base_url, http_client, positive_setting, truncate_chars, DEFAULT_TIMEOUT_SECS};
use crate::plugin::registry::PluginFactory;
use crate::plugin::traits::{Plugin, PluginContext, PluginOutput};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thot_foundation::{Error, Result};
use tracing::{debug, error};

/// 매니페스트의 `plugin` 값
pub const KIND: &str = "web_search";

pub const DEFAULT_BASE_URL: &str = "https://api.tavily.com";
pub const DEFAULT_MAX_RESULTS: usize = 5;
pub const API_KEY_ENV: &str = "TAVILY_API_KEY";

/// 공용 API 키 섹션
const KEY_SECTION: &str = "Tavily";
/// 기본 설정 파일의 자리표시자 접두사
const PLACEHOLDER_PREFIX: &str = "your_";
const SNIPPET_CHARS: usize = 300;
const EXAMPLE: &str = "/plugin <name> rust async traits";

pub fn factory() -> PluginFactory {
    Arc::new(|ctx| Box::new(WebSearchPlugin::new(ctx)) as Box<dyn Plugin>)
}

/// 검색 깊이
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDepth {
    Basic,
    Advanced,
}

impl SearchDepth {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "basic" => Some(Self::Basic),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
        }
    }
}

// ============================================================================
// Tavily wire types
// ============================================================================

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'static str,
    include_answer: bool,
    max_results: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

// ============================================================================
// WebSearchPlugin
// ============================================================================

pub struct WebSearchPlugin {
    ctx: PluginContext,
    client: Client,
    base_url: String,
    depth: SearchDepth,
    max_results: usize,
}

impl WebSearchPlugin {
    pub fn new(ctx: PluginContext) -> Self {
        Self {
            ctx,
            client: http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            base_url: DEFAULT_BASE_URL.to_string(),
            depth: SearchDepth::Basic,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// 플러그인 설정 → `Tavily.api_key` → 환경 변수
    fn api_key(&self) -> Option<String> {
        resolve_api_key([
            self.ctx.get("api_key"),
            self.ctx.store().get(KEY_SECTION, "api_key"),
            std::env::var(API_KEY_ENV).ok(),
        ])
    }

    async fn search(&self, api_key: &str, query: &str) -> std::result::Result<SearchResponse, String> {
        let url = format!("{}/search", self.base_url);
        debug!(url = %url, depth = self.depth.as_str(), "web search");

        let request = SearchRequest {
            api_key,
            query,
            search_depth: self.depth.as_str(),
            include_answer: true,
            max_results: self.max_results,
        };
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Search request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Search API error {}: {}", status.as_u16(), body.trim()));
        }

        response
            .json::<SearchResponse>()
            .await
            .map_err(|e| format!("Invalid search response: {}", e))
    }
}

/// 첫 번째 사용 가능한 키 (빈 값, 자리표시자 제외)
fn resolve_api_key(candidates: impl IntoIterator<Item = Option<String>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty() && !key.starts_with(PLACEHOLDER_PREFIX))
}

#[async_trait]
impl Plugin for WebSearchPlugin {
    fn description(&self) -> &str {
        "Web search with a summarized answer (Tavily)"
    }

    fn usage(&self) -> &str {
        "<query>..."
    }

    fn context(&self) -> &PluginContext {
        &self.ctx
    }

    async fn initialize(&mut self) -> Result<bool> {
        let config = self.ctx.config();

        if let Some(raw) = config.get("search_depth") {
            self.depth = SearchDepth::parse(raw)
                .ok_or_else(|| Error::Validation(format!("Invalid search_depth: {}", raw)))?;
        }
        if let Some(raw) = config.get("max_results") {
            self.max_results = positive_setting("max_results", raw)?;
        }
        self.base_url = base_url(config.get("base_url").cloned(), DEFAULT_BASE_URL);
        Ok(true)
    }

    async fn execute(&self, args: &[String]) -> PluginOutput {
        if args.is_empty() {
            return PluginOutput::error_with_example("Query required", EXAMPLE);
        }
        let Some(api_key) = self.api_key() else {
            return PluginOutput::error(format!(
                "Tavily API key not configured (set api_key, Tavily.api_key or {})",
                API_KEY_ENV
            ));
        };

        let query = args.join(" ");
        match self.search(&api_key, &query).await {
            Ok(response) => {
                let results: Vec<_> = response
                    .results
                    .iter()
                    .map(|hit| {
                        json!({
                            "title": hit.title,
                            "url": hit.url,
                            "content": truncate_chars(&hit.content, SNIPPET_CHARS),
                        })
                    })
                    .collect();
                PluginOutput::success(json!({
                    "query": query,
                    "depth": self.depth.as_str(),
                    "answer": response.answer,
                    "results": results,
                }))
            }
            Err(message) => {
                error!("Web search error: {}", message);
                PluginOutput::error(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thot_foundation::ConfigStore;

    fn plugin(store: ConfigStore) -> WebSearchPlugin {
        WebSearchPlugin::new(PluginContext::new("Web", Arc::new(store)))
    }

    #[test]
    fn test_resolve_api_key_skips_placeholders() {
        let key = resolve_api_key([
            None,
            Some("your_tavily_api_key".into()),
            Some(" tvly-123 ".into()),
        ]);
        assert_eq!(key.as_deref(), Some("tvly-123"));
        assert_eq!(resolve_api_key([Some("".into()), None]), None);
    }

    #[test]
    fn test_plugin_key_wins_over_shared_section() {
        let store = ConfigStore::empty();
        store.set("Tavily", "api_key", "tvly-shared").unwrap();
        store.set("Plugin.Web", "api_key", "tvly-own").unwrap();
        assert_eq!(plugin(store).api_key().as_deref(), Some("tvly-own"));
    }

    #[tokio::test]
    async fn test_config_validation() {
        let store = ConfigStore::empty();
        store
            .set_many("Plugin.Web", [("search_depth", "Advanced"), ("max_results", "3")])
            .unwrap();
        let mut web = plugin(store);
        assert!(web.initialize().await.unwrap());
        assert_eq!(web.depth, SearchDepth::Advanced);
        assert_eq!(web.max_results, 3);
        assert_eq!(web.base_url, DEFAULT_BASE_URL);

        let store = ConfigStore::empty();
        store.set("Plugin.Web", "search_depth", "deep").unwrap();
        assert!(plugin(store).initialize().await.is_err());
    }

    #[tokio::test]
    async fn test_missing_query_is_error_output() {
        let output = plugin(ConfigStore::empty()).execute(&[]).await;
        assert_eq!(output, PluginOutput::error_with_example("Query required", EXAMPLE));
    }
}
