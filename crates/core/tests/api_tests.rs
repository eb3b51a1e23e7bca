//! Library API integration tests
//!
//! Every test runs against an in-memory [`HttpClient`], so nothing touches the
//! network.
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rstest::rstest;
use tidymark_core::*;
use url::Url;

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

fn fixture(name: &str) -> String {
    std::fs::read_to_string(get_fixture_path(name)).unwrap()
}

/// Serves canned responses by URL and records every request.
#[derive(Default)]
struct StubClient {
    responses: HashMap<String, FetchResponse>,
    hang: Vec<String>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl StubClient {
    fn new() -> Self {
        Self::default()
    }

    fn respond(mut self, url: &str, status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        let response = FetchResponse {
            status,
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body: body.into(),
        };
        self.responses.insert(url.to_string(), response);
        self
    }

    fn html(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.respond(url, 200, "text/html; charset=utf-8", body)
    }

    fn json(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.respond(url, 200, "application/json", body)
    }

    /// Requests to `url` never complete.
    fn hang(mut self, url: &str) -> Self {
        self.hang.push(url.to_string());
        self
    }

    fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn requested_urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

#[async_trait]
impl HttpClient for StubClient {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        self.requests.lock().unwrap().push(request.clone());

        if self.hang.contains(&request.url) {
            std::future::pending::<()>().await;
        }

        Ok(self
            .responses
            .get(&request.url)
            .cloned()
            .unwrap_or(FetchResponse { status: 404, headers: Vec::new(), body: b"not found".to_vec() }))
    }
}

/// Converter that counts calls and delegates to htmd.
#[derive(Default)]
struct SpyConverter {
    calls: AtomicUsize,
}

impl MarkdownConverter for SpyConverter {
    fn convert(&self, html: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        HtmdConverter::new().convert(html)
    }
}

fn extractor(client: &Arc<StubClient>) -> Extractor {
    Extractor::builder().client(client.clone()).build().unwrap()
}

#[tokio::test]
async fn test_generic_article_front_matter_and_body() {
    let client = Arc::new(StubClient::new().html("https://blog.example.com/posts/async", fixture("article.html")));
    let output = extractor(&client)
        .extract(ExtractInput::new("https://blog.example.com/posts/async"))
        .await
        .unwrap();

    assert!(
        output.starts_with("title: Understanding Async Rust\nog:\n  title: Async Rust\n---\n\n"),
        "{}",
        output
    );
    assert!(!output.contains("twitter:"));

    assert!(output.contains("# Understanding Async Rust"));
    assert!(output.contains("## A first example"));
    assert!(output.contains("```rust\n#[tokio::main]\nasync fn main() {"));
    assert!(output.contains("![Task lifecycle](https://blog.example.com/images/lifecycle.png)"));
    assert!(output.contains("[executor deep dive](https://blog.example.com/posts/executors)"));
    assert!(output.contains("| Runtime | Scheduler |\n| --- | --- |\n| tokio | work stealing |"));

    assert!(!output.contains("window.analytics"));
    assert!(!output.contains("line-height"));
    assert!(!output.contains("Copyright 2024"));
}

#[tokio::test]
async fn test_primary_request_uses_browser_headers() {
    let client = Arc::new(StubClient::new().html("https://blog.example.com/posts/async", fixture("article.html")));
    extractor(&client)
        .extract(ExtractInput::new("https://blog.example.com/posts/async"))
        .await
        .unwrap();

    let requests = client.requests();
    assert_eq!(requests.len(), 1);

    let header = |name: &str| {
        requests[0]
            .headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    };
    assert_eq!(requests[0].method, Method::Get);
    assert_eq!(header("Referer").as_deref(), Some("https://blog.example.com/"));
    assert_eq!(header("Host").as_deref(), Some("blog.example.com"));
    assert!(header("User-Agent").is_some_and(|ua| ua.starts_with("Mozilla/5.0")));
    assert!(header("Accept").is_some_and(|accept| accept.contains("text/html")));
}

#[tokio::test]
async fn test_docker_hub_scenario() {
    let client = Arc::new(
        StubClient::new()
            .html("https://hub.docker.com/r/oven/bun", "<html><body><div id=\"root\"></div></body></html>")
            .json("https://hub.docker.com/v2/repositories/oven/bun/", fixture("docker_hub_bun.json")),
    );
    let spy = Arc::new(SpyConverter::default());
    let extractor = Extractor::builder().client(client.clone()).converter(spy.clone()).build().unwrap();

    let output = extractor.extract(ExtractInput::new("https://hub.docker.com/r/oven/bun")).await.unwrap();

    let (front_matter, body) = output.split_once(FRONT_MATTER_SEPARATOR).unwrap();
    assert_eq!(
        front_matter,
        "title: oven/bun\n\
         description: Bun is a fast JavaScript all-in-one toolkit · 120 stars · 50000000 pulls\n\
         author: oven\n\
         canonical: https://hub.docker.com/r/oven/bun"
    );

    let repository: serde_json::Value = serde_json::from_str(&fixture("docker_hub_bun.json")).unwrap();
    assert_eq!(body, repository["full_description"].as_str().unwrap());
    assert!(body.starts_with("# Bun"));
    assert!(!body.contains("&lt;"));

    assert_eq!(spy.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        client.requested_urls(),
        vec!["https://hub.docker.com/r/oven/bun", "https://hub.docker.com/v2/repositories/oven/bun/"]
    );
}

#[tokio::test]
async fn test_converter_runs_once_for_html() {
    let client = Arc::new(StubClient::new().html("https://blog.example.com/posts/async", fixture("article.html")));
    let spy = Arc::new(SpyConverter::default());
    let extractor = Extractor::builder().client(client.clone()).converter(spy.clone()).build().unwrap();

    extractor.extract(ExtractInput::new("https://blog.example.com/posts/async")).await.unwrap();
    assert_eq!(spy.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_docker_hub_api_failure_is_fatal() {
    let client = Arc::new(
        StubClient::new()
            .html("https://hub.docker.com/_/nginx", "<html></html>")
            .respond("https://hub.docker.com/v2/repositories/library/nginx/", 503, "text/plain", "busy"),
    );

    let err = extractor(&client)
        .extract(ExtractInput::new("https://hub.docker.com/_/nginx"))
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::HttpStatus { status: 503, ref url } if url.ends_with("/library/nginx/")));
    assert!(err.is_fetch_error());
}

#[tokio::test]
async fn test_raw_mode_returns_strategy_content() {
    let html = fixture("article.html");
    let client = Arc::new(StubClient::new().html("https://docs.internal.example/page", html.clone()));
    let extractor = Extractor::builder()
        .client(client.clone())
        .exclude(ExcludeList::from_patterns([r"^https://docs\.internal\.example/"]).unwrap())
        .build()
        .unwrap();

    let output = extractor
        .extract(ExtractInput::new("https://docs.internal.example/page").raw(true))
        .await
        .unwrap();

    assert_eq!(output, html);
}

#[tokio::test]
async fn test_raw_mode_has_no_front_matter() {
    let client = Arc::new(StubClient::new().html("https://blog.example.com/posts/async", fixture("article.html")));
    let output = extractor(&client)
        .extract(ExtractInput::new("https://blog.example.com/posts/async").raw(true))
        .await
        .unwrap();

    assert!(!output.is_empty());
    assert!(!output.contains(FRONT_MATTER_SEPARATOR));
    assert!(output.contains("<h1>Understanding Async Rust</h1>"));
    assert!(output.contains(r#"<code class="language-rust">"#));
}

#[tokio::test]
async fn test_passthrough_markdown_mode_has_empty_metadata() {
    let client = Arc::new(StubClient::new().html("https://docs.internal.example/page", "<p>Kept</p>"));
    let extractor = Extractor::builder()
        .client(client.clone())
        .exclude(ExcludeList::from_patterns([r"docs\.internal\.example"]).unwrap())
        .build()
        .unwrap();

    let output = extractor.extract(ExtractInput::new("https://docs.internal.example/page")).await.unwrap();
    assert_eq!(output, "\n---\n\nKept");
}

#[tokio::test]
async fn test_wechat_article() {
    let client = Arc::new(StubClient::new().html("https://mp.weixin.qq.com/s/AbCdEf", fixture("wechat.html")));
    let extractor = extractor(&client);

    let raw = extractor
        .extract(ExtractInput::new("https://mp.weixin.qq.com/s/AbCdEf").raw(true))
        .await
        .unwrap();
    let doc = Document::parse(&raw).unwrap();

    let codes = doc.select("pre code").unwrap();
    assert_eq!(codes.len(), 1);
    assert_eq!(codes[0].attr("class"), Some("language-javascript"));
    assert_eq!(codes[0].text(), "line1\nline2\nline3");

    let image = doc.select_first("img").unwrap().unwrap();
    assert_eq!(image.attr("src"), Some("https://mmbiz.qpic.cn/closure.png"));

    let output = extractor.extract(ExtractInput::new("https://mp.weixin.qq.com/s/AbCdEf")).await.unwrap();
    assert!(output.starts_with(
        "title: 深入理解 JavaScript 闭包\n\
         og:\n  title: 深入理解 JavaScript 闭包\n  description: 闭包是函数与其词法环境的组合\n  image: https://mmbiz.qpic.cn/cover.jpeg\n---\n\n"
    ));
    assert!(output.contains("```javascript\nline1\nline2\nline3\n```"));
    assert!(output.contains("![closure](https://mmbiz.qpic.cn/closure.png)"));
    assert!(output.contains("闭包是指有权访问另一个函数作用域中变量的函数。"));
}

#[tokio::test]
async fn test_wechat_without_container_fails() {
    let client = Arc::new(StubClient::new().html("https://mp.weixin.qq.com/s/gone", "<html><body>deleted</body></html>"));
    let err = extractor(&client)
        .extract(ExtractInput::new("https://mp.weixin.qq.com/s/gone"))
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::ContentNotFound { ref strategy, .. } if strategy == "wechat"));
}

#[tokio::test]
async fn test_infoq_article() {
    let page = "https://www.infoq.cn/article/Xk3pQ9aZ";
    let content_url = "https://static001.infoq.cn/resource/Xk3pQ9aZ.json";
    let client = Arc::new(
        StubClient::new()
            .html(page, fixture("infoq.html"))
            .json(
                "https://www.infoq.cn/public/v1/article/getDetail",
                format!(r#"{{"code":0,"data":{{"uuid":"Xk3pQ9aZ","content_url":"{}"}}}}"#, content_url),
            )
            .json(content_url, fixture("infoq_content.json")),
    );

    let output = extractor(&client).extract(ExtractInput::new(page)).await.unwrap();

    assert!(output.starts_with(
        "title: Rust 在大型服务中的实践_InfoQ精选文章\n\
         description: 一家公司把核心服务迁移到 Rust 的经验总结\n\
         keywords: Rust,后端,性能\n\
         canonical: https://www.infoq.cn/article/Xk3pQ9aZ\n---\n\n"
    ));
    assert!(output.contains("## 背景"));
    assert!(output.contains("[Tokio](https://tokio.rs)"));
    assert!(output.contains("**延迟下降**"));
    assert!(output.contains("```rust\nlet listener = TcpListener::bind(addr).await?;\n```"));
    assert!(output.contains("![架构图](https://static001.infoq.cn/resource/image/arch.png)"));

    let requests = client.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].method, Method::Post);
    let body: serde_json::Value = serde_json::from_slice(requests[1].body.as_deref().unwrap()).unwrap();
    assert_eq!(body, serde_json::json!({ "uuid": "Xk3pQ9aZ" }));
    assert_eq!(requests[2].url, content_url);
}

#[tokio::test]
async fn test_infoq_html_content() {
    let page = "https://www.infoq.cn/article/plain1";
    let content_url = "https://static001.infoq.cn/resource/plain1.html";
    let client = Arc::new(
        StubClient::new()
            .html(page, fixture("infoq.html"))
            .json(
                "https://www.infoq.cn/public/v1/article/getDetail",
                format!(r#"{{"data":{{"content_url":"{}"}}}}"#, content_url),
            )
            .html(content_url, "<html><body><h3>Already HTML</h3></body></html>"),
    );

    let output = extractor(&client)
        .extract(ExtractInput::new(page).raw(true))
        .await
        .unwrap();
    assert_eq!(output, "<html><body><h3>Already HTML</h3></body></html>");
}

#[tokio::test]
async fn test_infoq_without_hash_fails_before_secondary_fetch() {
    let page = "https://www.infoq.cn/topic/rust";
    let client = Arc::new(StubClient::new().html(page, fixture("infoq.html")));

    let err = extractor(&client).extract(ExtractInput::new(page)).await.unwrap_err();

    assert!(matches!(err, ExtractError::ContentNotFound { ref strategy, .. } if strategy == "infoq"));
    assert_eq!(client.requested_urls(), vec![page]);
}

#[tokio::test]
async fn test_bogus_charset_degrades() {
    let body = "<html><head><title>Café</title></head><body><p>ok</p></body></html>";
    let client = Arc::new(StubClient::new().respond(
        "https://docs.internal.example/x",
        200,
        "text/html; charset=bogus-charset",
        body,
    ));
    let extractor = Extractor::builder()
        .client(client.clone())
        .exclude(ExcludeList::from_patterns(["docs\\.internal"]).unwrap())
        .build()
        .unwrap();

    let output = extractor
        .extract(ExtractInput::new("https://docs.internal.example/x").raw(true))
        .await
        .unwrap();
    assert_eq!(output, body);
}

#[tokio::test]
async fn test_declared_charset_is_used() {
    let html = "<html><head><title>中文标题</title></head><body><p>正文</p></body></html>";
    let (bytes, _, _) = encoding_rs::GBK.encode(html);
    let client = Arc::new(StubClient::new().respond(
        "https://docs.internal.example/gbk",
        200,
        "text/html; Charset=\"GBK\"; foo=bar",
        bytes.into_owned(),
    ));
    let extractor = Extractor::builder()
        .client(client.clone())
        .exclude(ExcludeList::from_patterns(["docs\\.internal"]).unwrap())
        .build()
        .unwrap();

    let output = extractor
        .extract(ExtractInput::new("https://docs.internal.example/gbk").raw(true))
        .await
        .unwrap();
    assert_eq!(output, html);
}

#[rstest]
#[case("")]
#[case("not a url")]
#[case("/relative/path")]
#[case("ftp://example.com/file")]
#[case("mailto:someone@example.com")]
#[tokio::test]
async fn test_invalid_url_rejected_before_fetch(#[case] input: &str) {
    let client = Arc::new(StubClient::new());
    let err = extractor(&client).extract(ExtractInput::new(input)).await.unwrap_err();

    assert!(matches!(err, ExtractError::InvalidUrl(_)), "{:?}", err);
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn test_non_success_status_is_fetch_error() {
    let client = Arc::new(StubClient::new());
    let err = extractor(&client)
        .extract(ExtractInput::new("https://blog.example.com/missing"))
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::HttpStatus { status: 404, .. }));
}

#[tokio::test]
async fn test_unreadable_page_fails() {
    let client = Arc::new(StubClient::new().html("https://blog.example.com/empty", "<html><body><p>Hi</p></body></html>"));
    let err = extractor(&client)
        .extract(ExtractInput::new("https://blog.example.com/empty"))
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::ContentNotFound { ref strategy, .. } if strategy == "readability"));
}

#[tokio::test]
async fn test_cancellation() {
    let client = Arc::new(StubClient::new().hang("https://slow.example.com/"));
    let extractor = extractor(&client);

    let err = extractor
        .extract_with_cancel(ExtractInput::new("https://slow.example.com/"), async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::Cancelled));
    assert_eq!(client.requested_urls(), vec!["https://slow.example.com/"]);
}

#[tokio::test]
async fn test_cancel_signal_that_never_fires() {
    let client = Arc::new(StubClient::new().html("https://blog.example.com/posts/async", fixture("article.html")));
    let output = extractor(&client)
        .extract_with_cancel(ExtractInput::new("https://blog.example.com/posts/async"), std::future::pending())
        .await
        .unwrap();

    assert!(output.contains("# Understanding Async Rust"));
}

#[tokio::test]
async fn test_extract_html_offline() {
    let client = Arc::new(StubClient::new());
    let output = extractor(&client)
        .extract_html("https://blog.example.com/posts/async", &fixture("article.html"), false)
        .await
        .unwrap();

    assert!(output.contains("# Understanding Async Rust"));
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn test_concurrent_extractions_are_independent() {
    let client = Arc::new(
        StubClient::new()
            .html("https://blog.example.com/posts/async", fixture("article.html"))
            .html("https://mp.weixin.qq.com/s/AbCdEf", fixture("wechat.html")),
    );
    let extractor = extractor(&client);

    let (article, wechat) = tokio::join!(
        extractor.extract(ExtractInput::new("https://blog.example.com/posts/async")),
        extractor.extract(ExtractInput::new("https://mp.weixin.qq.com/s/AbCdEf")),
    );

    assert!(article.unwrap().contains("Understanding Async Rust"));
    assert!(wechat.unwrap().contains("line1\nline2\nline3"));
}

struct Named {
    name: &'static str,
    prefix: &'static str,
    calls: AtomicUsize,
}

impl Named {
    fn new(name: &'static str, prefix: &'static str) -> Arc<Self> {
        Arc::new(Self { name, prefix, calls: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl CleaningStrategy for Named {
    fn name(&self) -> &'static str {
        self.name
    }

    fn matches(&self, url: &Url) -> bool {
        url.as_str().starts_with(self.prefix)
    }

    async fn clean(&self, _ctx: CleanContext<'_>) -> Result<CleanResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CleanResult::html(format!("<p>{}</p>", self.name), MetaData::default()))
    }
}

#[tokio::test]
async fn test_registry_order_decides() {
    let a = Named::new("a", "https://example.com/special");
    let b = Named::new("b", "https://");
    let registry = StrategyRegistry::new(Arc::new(ReadabilityCleaner::default()))
        .register(a.clone())
        .register(b.clone());

    let client = Arc::new(StubClient::new().html("https://example.com/special", "<html></html>"));
    let extractor = Extractor::builder().client(client.clone()).registry(registry).build().unwrap();

    let output = extractor
        .extract(ExtractInput::new("https://example.com/special").raw(true))
        .await
        .unwrap();

    assert_eq!(output, "<p>a</p>");
    assert_eq!(a.calls.load(Ordering::SeqCst), 1);
    assert_eq!(b.calls.load(Ordering::SeqCst), 0);
}

#[rstest]
#[case("https://mp.weixin.qq.com/s/abc", "wechat")]
#[case("https://www.infoq.cn/article/abc", "infoq")]
#[case("https://infoq.cn/article/abc", "infoq")]
#[case("https://hub.docker.com/r/oven/bun", "dockerhub")]
#[case("https://hub.docker.com/_/postgres", "dockerhub")]
#[case("https://hub.docker.com/search?q=postgres", "readability")]
#[case("https://www.npmjs.com/package/left-pad", "readability")]
#[case("https://example.com/weixin/mp.weixin.qq.com", "readability")]
#[case("https://blocked.example.org/any", "passthrough")]
fn test_default_strategy_selection(#[case] input: &str, #[case] expected: &str) {
    let registry = StrategyRegistry::with_defaults(
        ExcludeList::from_patterns([r"^https?://blocked\.example\.org/"]).unwrap(),
        default_plugins(),
        ReadabilityConfig::default(),
    );

    assert_eq!(registry.select(&Url::parse(input).unwrap()).name(), expected);
}

#[test]
fn test_metadata_yaml_is_stable() {
    let html = fixture("wechat.html");
    let doc = Document::parse(&html).unwrap();
    let meta = doc.extract_metadata();

    assert_eq!(meta.to_yaml(), meta.to_yaml());
    assert_eq!(MetaData::default().to_yaml(), "");
}
