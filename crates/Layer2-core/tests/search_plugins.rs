//! Search plugins against a local HTTP responder

use std::path::Path;
use std::sync::Arc;
use thot_core::{PluginOutput, PluginRegistry};
use thot_foundation::ConfigStore;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve exactly one request; the handle yields the raw request text.
async fn serve_once(content_type: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
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
            "HTTP/1.1 200 OK\r\ncontent-type: {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            content_type,
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

async fn discover(dir: &Path, store: Arc<ConfigStore>) -> PluginRegistry {
    let registry = PluginRegistry::new(store, dir).with_builtins();
    registry.discover_all().await;
    registry
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn data_of(output: PluginOutput) -> serde_json::Value {
    match output {
        PluginOutput::Success { data } => data,
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn web_search_posts_tavily_request() {
    let (url, request) = serve_once(
        "application/json",
        r#"{"answer":"Use async-trait.","results":[{"title":"Async traits","url":"https://example.com/a","content":"Rust async fn in traits"}]}"#,
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("web.json"),
        format!(
            r#"{{"plugin":"web_search","name":"Web","config":{{"base_url":"{}/","max_results":2}}}}"#,
            url
        ),
    )
    .unwrap();
    let store = Arc::new(ConfigStore::empty());
    store.set("Tavily", "api_key", "tvly-test").unwrap();

    let registry = discover(dir.path(), store).await;
    let output = registry.execute("Web", &args(&["rust", "async", "traits"])).await.unwrap();
    let data = data_of(output);

    assert_eq!(data["query"], "rust async traits");
    assert_eq!(data["answer"], "Use async-trait.");
    assert_eq!(data["results"][0]["url"], "https://example.com/a");

    let raw = request.await.unwrap();
    assert!(raw.starts_with("POST /search "));
    let body = raw.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or("");
    let body: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(body["api_key"], "tvly-test");
    assert_eq!(body["query"], "rust async traits");
    assert_eq!(body["search_depth"], "basic");
    assert_eq!(body["include_answer"], true);
    assert_eq!(body["max_results"], 2);
}

#[tokio::test]
async fn arxiv_queries_atom_api() {
    let (url, request) = serve_once(
        "application/atom+xml",
        r#"<feed xmlns="http://www.w3.org/2005/Atom">
<opensearch:totalResults>1</opensearch:totalResults>
<entry><id>http://arxiv.org/abs/1706.03762v7</id><published>2017-06-12T17:57:34Z</published>
<title>Attention Is All
 You Need</title><summary>The dominant sequence transduction models.</summary>
<author><name>Ashish Vaswani</name></author></entry>
</feed>"#,
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("arxiv.json"),
        format!(r#"{{"plugin":"arxiv","name":"Papers","config":{{"base_url":"{}"}}}}"#, url),
    )
    .unwrap();
    let store = Arc::new(ConfigStore::empty());
    store.set("ArXiv", "results_per_page", "4").unwrap();

    let registry = discover(dir.path(), store).await;
    let output = registry.execute("Papers", &args(&["attention", "ti:transformer"])).await.unwrap();
    let data = data_of(output);

    assert_eq!(data["total"], 1);
    assert_eq!(data["papers"][0]["id"], "1706.03762v7");
    assert_eq!(data["papers"][0]["title"], "Attention Is All You Need");
    assert_eq!(data["papers"][0]["authors"][0], "Ashish Vaswani");

    let raw = request.await.unwrap();
    let request_line = raw.lines().next().unwrap_or("");
    assert!(request_line.starts_with("GET /query?"));
    assert!(request_line.contains("max_results=4"));
    assert!(request_line.contains("search_query=all%3Aattention+AND+ti%3Atransformer"));
}

#[tokio::test]
async fn web_search_without_key_is_error_output() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("web.json"),
        r#"{"plugin":"web_search","name":"Web","config":{"api_key":"your_tavily_api_key","base_url":"http://127.0.0.1:9"}}"#,
    )
    .unwrap();
    if std::env::var("TAVILY_API_KEY").is_ok() {
        return;
    }

    let registry = discover(dir.path(), Arc::new(ConfigStore::empty())).await;
    let output = registry.execute("Web", &args(&["anything"])).await.unwrap();
    assert!(matches!(output, PluginOutput::Error { message, .. } if message.contains("API key")));
}
