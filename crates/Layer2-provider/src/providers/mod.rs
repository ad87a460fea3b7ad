//! LLM Provider implementations
//!
//! 공통 HTTP 처리 (클라이언트 생성, JSON 요청/응답, 빈 응답 검사)

pub mod anthropic;
pub mod gemini;
pub mod groq;
pub mod openai;

use crate::error::ProviderError;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thot_foundation::Section;
use tracing::warn;

/// HTTP 클라이언트 생성 (실패 시 기본 클라이언트)
pub(crate) fn http_client(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        warn!("Failed to build HTTP client with timeout, using defaults: {}", e);
        Client::new()
    })
}

/// 섹션의 `timeout` (초) 값, 없으면 기본값
pub(crate) fn timeout_from_section(section: Option<&Section>, default_secs: u64) -> Duration {
    let secs = section
        .and_then(|s| s.get("timeout"))
        .and_then(|raw| match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Some(secs),
            _ => {
                warn!("Ignoring invalid timeout value: {}", raw);
                None
            }
        })
        .unwrap_or(default_secs);
    Duration::from_secs(secs)
}

/// 섹션의 `base_url` 값 (비어 있으면 None)
pub(crate) fn base_url_from_section(section: Option<&Section>) -> Option<String> {
    section
        .and_then(|s| s.get("base_url"))
        .map(|url| url.trim().trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty())
}

pub(crate) fn require_key(provider: &str, api_key: &str) -> Result<(), ProviderError> {
    if api_key.trim().is_empty() {
        return Err(ProviderError::NotConfigured(format!(
            "{} API key is not set",
            provider
        )));
    }
    Ok(())
}

/// Send a JSON body and decode a JSON reply
///
/// Non-2xx statuses go through `on_error` so each backend can read its own
/// error envelope.
pub(crate) async fn send_json<B, R>(
    request: RequestBuilder,
    body: &B,
    on_error: fn(StatusCode, &str) -> ProviderError,
) -> Result<R, ProviderError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| ProviderError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(on_error(status, &body));
    }

    response
        .json()
        .await
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

/// 공백뿐인 응답은 EmptyResponse
pub(crate) fn non_empty(text: String) -> Result<String, ProviderError> {
    if text.trim().is_empty() {
        Err(ProviderError::EmptyResponse)
    } else {
        Ok(text)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! One-shot HTTP responder for adapter tests

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve exactly one request; the handle yields the raw request text.
    pub async fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];

            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if request_complete(&buf) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&buf).into_owned()
        });

        (url, handle)
    }

    fn request_complete(buf: &[u8]) -> bool {
        let text = String::from_utf8_lossy(buf);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        buf.len() >= header_end + 4 + length
    }

    /// JSON body of a captured request
    pub fn body_json(raw: &str) -> serde_json::Value {
        let body = raw.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or("");
        serde_json::from_str(body).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert!(matches!(non_empty("  \n".into()), Err(ProviderError::EmptyResponse)));
        assert_eq!(non_empty("ok".into()).unwrap(), "ok");
    }

    #[test]
    fn test_section_overrides() {
        let mut section = Section::new();
        section.insert("timeout".into(), "15".into());
        section.insert("base_url".into(), "http://localhost:8080/".into());

        assert_eq!(timeout_from_section(Some(&section), 300), Duration::from_secs(15));
        assert_eq!(timeout_from_section(None, 300), Duration::from_secs(300));
        assert_eq!(
            base_url_from_section(Some(&section)).as_deref(),
            Some("http://localhost:8080")
        );
    }
}
