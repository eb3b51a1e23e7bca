//! HTTP collaborator boundary.
//!
//! The pipeline talks to the network only through [`HttpClient`], which maps a
//! [`FetchRequest`] to a [`FetchResponse`] (status, headers, raw body bytes).
//! [`ReqwestClient`] is the production implementation; tests substitute an
//! in-memory client. Nothing here retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::{ExtractError, Result};

/// Default desktop browser User-Agent sent with every request.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 30, user_agent: DEFAULT_USER_AGENT.to_string() }
    }
}

/// HTTP method supported by the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A request handed to an [`HttpClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl FetchRequest {
    /// Creates a GET request with no headers.
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: Method::Get, url: url.into(), headers: Vec::new(), body: None }
    }

    /// Creates a POST request carrying `body` as JSON.
    pub fn post_json(url: impl Into<String>, body: &serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(body.to_string().into_bytes()),
        }
    }

    /// Adds a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds every header in `headers`.
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }
}

/// A response returned by an [`HttpClient`].
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Looks up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Gets the `Content-Type` header.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body to text using the declared charset.
    pub fn text(&self) -> String {
        crate::encoding::decode_body(&self.body, self.content_type())
    }

    /// Deserializes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidResponse`] naming `url` when the payload
    /// does not match `T`.
    pub fn json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ExtractError::InvalidResponse { url: url.to_string(), reason: e.to_string() })
    }
}

/// The network collaborator used for primary and secondary fetches.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Performs the request and returns whatever the server answered,
    /// including non-2xx statuses.
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse>;
}

/// Performs `request` and fails with [`ExtractError::HttpStatus`] on a non-2xx answer.
pub async fn fetch_ok(client: &dyn HttpClient, request: FetchRequest) -> Result<FetchResponse> {
    let url = request.url.clone();
    let response = client.fetch(request).await?;
    if !response.is_success() {
        return Err(ExtractError::HttpStatus { status: response.status, url });
    }
    Ok(response)
}

/// Parses and validates an absolute http(s) URL.
///
/// # Errors
///
/// Returns [`ExtractError::InvalidUrl`] for empty, relative or non-http URLs.
pub fn parse_url(url: &str) -> Result<Url> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ExtractError::InvalidUrl("URL is empty".to_string()));
    }

    let parsed = Url::parse(url).map_err(|e| ExtractError::InvalidUrl(format!("{}: {}", url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ExtractError::InvalidUrl(format!(
            "{}: URL must use http:// or https:// and name a host",
            url
        )));
    }

    Ok(parsed)
}

/// The fixed browser-like header set sent with the primary page request.
///
/// `Referer` and `Host` are derived from `url`.
pub fn browser_headers(url: &Url, user_agent: &str) -> Vec<(String, String)> {
    let mut headers = vec![
        ("User-Agent".to_string(), user_agent.to_string()),
        (
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8".to_string(),
        ),
        ("Accept-Language".to_string(), "en-US,en;q=0.9,zh-CN;q=0.8,zh;q=0.7".to_string()),
        ("Cache-Control".to_string(), "no-cache".to_string()),
        ("Pragma".to_string(), "no-cache".to_string()),
        ("Upgrade-Insecure-Requests".to_string(), "1".to_string()),
    ];

    headers.push(("Referer".to_string(), format!("{}/", url.origin().ascii_serialization())));

    if let Some(host) = url.host_str() {
        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        headers.push(("Host".to_string(), host));
    }

    headers
}

/// [`HttpClient`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
    config: FetchConfig,
}

impl ReqwestClient {
    /// Builds a client honouring the configured timeout.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(ExtractError::Http)?;

        Ok(Self { client, config })
    }

    /// Gets the fetch configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        let url = parse_url(&request.url)?;

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };

        if !request.headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("user-agent")) {
            builder = builder.header("User-Agent", &self.config.user_agent);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let timeout = self.config.timeout;
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() { ExtractError::Timeout { timeout } } else { ExtractError::Http(e) }
        };

        let response = builder.send().await.map_err(map_err)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        let body = response.bytes().await.map_err(map_err)?.to_vec();

        Ok(FetchResponse { status, headers, body })
    }
}
