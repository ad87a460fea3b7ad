//! arXiv search plugin
//!
//! `execute(["diffusion", "models"])` queries the arXiv Atom API with
//! `all:diffusion AND all:models` and returns
//! `{"query", "total", "papers": [{id, title, authors, published, summary, url, pdf_url}]}`.
//! Words that already carry a field prefix (`ti:`, `au:`, `cat:` ...) are sent unchanged.
//!
//! Config: `max_results` (falls back to `ArXiv.results_per_page`, default 10),
//! `sort_by` (`relevance` | `lastUpdatedDate` | `submittedDate`), `base_url`.

use super::{base_url, http_client, positive_setting, truncate_chars, DEFAULT_TIMEOUT_SECS};
use crate::plugin::registry::PluginFactory;
use crate::plugin::traits::{Plugin, PluginContext, PluginOutput};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thot_foundation::{Error, Result};
use tracing::{debug, error};

/// 매니페스트의 `plugin` 값
pub const KIND: &str = "arxiv";

pub const DEFAULT_BASE_URL: &str = "https://export.arxiv.org/api";
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// 공용 설정 섹션
const SHARED_SECTION: &str = "ArXiv";
const SORT_KEYS: [&str; 3] = ["relevance", "lastUpdatedDate", "submittedDate"];
const SUMMARY_CHARS: usize = 500;
const EXAMPLE: &str = "/plugin <name> ti:transformer cat:cs.CL";

pub fn factory() -> PluginFactory {
    Arc::new(|ctx| Box::new(ArxivPlugin::new(ctx)) as Box<dyn Plugin>)
}

/// 논문 한 건
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paper {
    /// `2101.00001v1`
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub published: String,
    pub summary: String,
    pub url: String,
    pub pdf_url: String,
}

/// 파싱된 Atom 피드
#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    /// `opensearch:totalResults`
    pub total: Option<u64>,
    pub papers: Vec<Paper>,
}

// ============================================================================
// ArxivPlugin
// ============================================================================

pub struct ArxivPlugin {
    ctx: PluginContext,
    client: Client,
    base_url: String,
    max_results: usize,
    sort_by: &'static str,
}

impl ArxivPlugin {
    pub fn new(ctx: PluginContext) -> Self {
        Self {
            ctx,
            client: http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            sort_by: SORT_KEYS[0],
        }
    }

    async fn search(&self, search_query: &str) -> std::result::Result<Feed, String> {
        let url = format!("{}/query", self.base_url);
        debug!(url = %url, query = %search_query, "arxiv search");

        let max_results = self.max_results.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("search_query", search_query),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", self.sort_by),
                ("sortOrder", "descending"),
            ])
            .send()
            .await
            .map_err(|e| format!("arXiv request failed: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("arXiv response unreadable: {}", e))?;
        if !status.is_success() {
            return Err(format!("arXiv API error {}: {}", status.as_u16(), body.trim()));
        }
        parse_feed(&body)
    }
}

/// 검색어 → arXiv `search_query`
pub fn build_query(words: &[String]) -> String {
    words
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .map(|w| {
            if w.contains(':') {
                w.to_string()
            } else {
                format!("all:{}", w)
            }
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

#[async_trait]
impl Plugin for ArxivPlugin {
    fn description(&self) -> &str {
        "Search arXiv papers"
    }

    fn usage(&self) -> &str {
        "<word|field:value>..."
    }

    fn context(&self) -> &PluginContext {
        &self.ctx
    }

    async fn initialize(&mut self) -> Result<bool> {
        let config = self.ctx.config();

        let max_results = match config.get("max_results") {
            Some(raw) => Some(("max_results", raw.clone())),
            None => self
                .ctx
                .store()
                .get(SHARED_SECTION, "results_per_page")
                .map(|raw| ("results_per_page", raw)),
        };
        if let Some((key, raw)) = max_results {
            self.max_results = positive_setting(key, &raw)?;
        }

        if let Some(raw) = config.get("sort_by") {
            self.sort_by = SORT_KEYS
                .iter()
                .copied()
                .find(|key| key.eq_ignore_ascii_case(raw.trim()))
                .ok_or_else(|| Error::Validation(format!("Invalid sort_by: {}", raw)))?;
        }
        self.base_url = base_url(config.get("base_url").cloned(), DEFAULT_BASE_URL);
        Ok(true)
    }

    async fn execute(&self, args: &[String]) -> PluginOutput {
        let search_query = build_query(args);
        if search_query.is_empty() {
            return PluginOutput::error_with_example("Query required", EXAMPLE);
        }

        match self.search(&search_query).await {
            Ok(feed) => {
                let papers: Vec<_> = feed
                    .papers
                    .into_iter()
                    .map(|paper| Paper {
                        summary: truncate_chars(&paper.summary, SUMMARY_CHARS),
                        ..paper
                    })
                    .collect();
                PluginOutput::success(json!({
                    "query": search_query,
                    "total": feed.total,
                    "papers": papers,
                }))
            }
            Err(message) => {
                error!("arXiv search error: {}", message);
                PluginOutput::error(message)
            }
        }
    }
}

// ============================================================================
// Atom parsing
// ============================================================================

/// Atom 피드 파싱
///
/// An error entry (`<id>` under `/api/errors`) becomes `Err` with its summary.
pub fn parse_feed(xml: &str) -> std::result::Result<Feed, String> {
    if !xml.contains("<feed") {
        return Err("arXiv response is not an Atom feed".to_string());
    }

    let total = first_element(xml, "opensearch:totalResults").and_then(|t| t.trim().parse().ok());
    let mut papers = Vec::new();

    for entry in elements(xml, "entry") {
        let url = first_element(entry, "id").map(clean_text).unwrap_or_default();
        if url.contains("/api/errors") {
            let summary = first_element(entry, "summary").map(clean_text).unwrap_or_default();
            return Err(format!("arXiv API error: {}", summary));
        }

        let id = url
            .rsplit_once("/abs/")
            .map(|(_, id)| id.to_string())
            .unwrap_or_else(|| url.clone());
        let authors = elements(entry, "author")
            .into_iter()
            .filter_map(|author| first_element(author, "name"))
            .map(clean_text)
            .filter(|name| !name.is_empty())
            .collect();

        papers.push(Paper {
            title: first_element(entry, "title").map(clean_text).unwrap_or_default(),
            authors,
            published: first_element(entry, "published").map(clean_text).unwrap_or_default(),
            summary: first_element(entry, "summary").map(clean_text).unwrap_or_default(),
            pdf_url: url.replacen("/abs/", "/pdf/", 1),
            url,
            id,
        });
    }

    Ok(Feed { total, papers })
}

/// `<tag ...>` ~ `</tag>` 내용 목록
fn elements<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let mut found = Vec::new();
    let mut rest = xml;

    while let Some(start) = rest.find(&open) {
        let after = &rest[start + open.len()..];
        // `<title` must not match `<titles`
        if !after.starts_with(|c: char| c == '>' || c == '/' || c.is_whitespace()) {
            rest = after;
            continue;
        }
        let Some(gt) = after.find('>') else {
            break;
        };
        if after[..gt].ends_with('/') {
            found.push("");
            rest = &after[gt + 1..];
            continue;
        }
        let body = &after[gt + 1..];
        let Some(end) = body.find(&close) else {
            break;
        };
        found.push(&body[..end]);
        rest = &body[end + close.len()..];
    }
    found
}

fn first_element<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    elements(xml, tag).into_iter().next()
}

/// 엔티티 디코딩 후 공백 정리
fn clean_text(raw: &str) -> String {
    decode_xml_entities(raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_xml_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
