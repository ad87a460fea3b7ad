//! Built-in plugin kinds

pub mod arxiv;
pub mod calculator;
pub mod web_search;

use reqwest::Client;
use std::time::Duration;
use thot_foundation::{Error, Result};
use tracing::warn;

/// 검색 플러그인 HTTP 타임아웃 (초)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("thot/", env!("CARGO_PKG_VERSION"));

/// HTTP 클라이언트 생성 (실패 시 기본 클라이언트)
pub(crate) fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|e| {
            warn!("Failed to build HTTP client with timeout, using defaults: {}", e);
            Client::new()
        })
}

/// 양의 정수 설정값 파싱
pub(crate) fn positive_setting(key: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| Error::Validation(format!("Invalid {}: {}", key, raw)))
}

/// `base_url` 정규화 (끝의 `/` 제거)
pub(crate) fn base_url(raw: Option<String>, default: &str) -> String {
    raw.map(|url| url.trim().trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// 최대 `max` 글자, 잘리면 `...`
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
