//! HTTP dispatch of rendered quests

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Url};
use serde::Serialize;

use super::error::QuestError;

/// A quest with every template resolved, ready to send
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedRequest {
    pub method: String,
    pub url: String,
    pub data: Option<BTreeMap<String, String>>,
    pub headers: Option<BTreeMap<String, String>>,
}

impl RenderedRequest {
    /// Check that the rendered parts form a sendable request.
    ///
    /// Runs before any network activity so that a bad method, URL or header
    /// never reaches the dispatcher.
    pub fn validate(&self) -> Result<(), QuestError> {
        self.http_method()?;
        self.parsed_url()?;
        self.header_map()?;
        Ok(())
    }

    fn http_method(&self) -> Result<Method, QuestError> {
        Method::from_bytes(self.method.as_bytes()).map_err(|_| QuestError::InvalidMethod {
            method: self.method.clone(),
        })
    }

    fn parsed_url(&self) -> Result<Url, QuestError> {
        let url = Url::parse(&self.url)
            .map_err(|e| QuestError::malformed("url", format!("`{}`: {e}", self.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(QuestError::malformed(
                "url",
                format!("unsupported scheme `{}`", url.scheme()),
            ));
        }
        Ok(url)
    }

    fn header_map(&self) -> Result<HeaderMap, QuestError> {
        let mut map = HeaderMap::new();
        for (name, value) in self.headers.iter().flatten() {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| QuestError::malformed("headers", format!("invalid name `{name}`")))?;
            // Non-ASCII text is sent as raw bytes (obs-text)
            let header_value = HeaderValue::from_bytes(value.as_bytes()).map_err(|_| {
                QuestError::malformed("headers", format!("invalid value for `{name}`"))
            })?;
            map.append(header_name, header_value);
        }
        Ok(map)
    }
}

impl std::fmt::Display for RenderedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Raw result of a dispatched request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    /// Headers in the order received
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// First header with this name, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs the network side of a quest call
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Send the request and return whatever the server answered.
    ///
    /// Error statuses are not failures; only a request that cannot be
    /// completed yields [`QuestError::Transport`].
    async fn dispatch(&self, request: &RenderedRequest) -> Result<Response, QuestError>;
}

/// Dispatcher backed by a shared `reqwest` client
#[derive(Clone)]
pub struct HttpDispatcher {
    client: Client,
}

impl HttpDispatcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a dispatcher whose client sends the given user agent
    pub fn with_user_agent(user_agent: &str) -> Result<Self, QuestError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| QuestError::Transport {
                url: String::new(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self::new(client))
    }
}

impl Default for HttpDispatcher {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(&self, request: &RenderedRequest) -> Result<Response, QuestError> {
        let method = request.http_method()?;
        let url = request.parsed_url()?;
        let headers = request.header_map()?;

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(data) = &request.data {
            builder = builder.form(data);
        }

        let transport = |e: reqwest::Error| QuestError::Transport {
            url: request.url.clone(),
            message: e.to_string(),
        };

        let response = builder.send().await.map_err(transport)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await.map_err(transport)?.to_vec();

        tracing::debug!(url = %request.url, status, "Received response");

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
