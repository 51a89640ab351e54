//! Client handle: HTTP client, base URL, credential and chat endpoint.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use url::Url;

use crate::chat::{ChatApi, DEFAULT_WS_URL};
use crate::error::{Error, Result};
use crate::llm::LlmApi;
use crate::server::ServerApi;
use crate::settings::SettingsApi;

/// Default HTTP address of a local server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:1865";

/// Header carrying the static API key.
const ACCESS_TOKEN: &str = "access_token";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connected-on-demand client. Cheap to clone; every service accessor hands
/// out a clone of the same handle.
#[derive(Clone)]
pub struct CatClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    ws_url: Url,
    timeout: Duration,
}

impl CatClient {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Client for a server on localhost with default ports.
    pub fn localhost() -> Result<Self> {
        Self::builder().build()
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn ws_url(&self) -> &Url {
        &self.inner.ws_url
    }

    pub fn settings(&self) -> SettingsApi {
        SettingsApi::new(self.clone())
    }

    pub fn llm(&self) -> LlmApi {
        LlmApi::new(self.clone())
    }

    pub fn server(&self) -> ServerApi {
        ServerApi::new(self.clone())
    }

    pub fn chat(&self) -> ChatApi {
        ChatApi::new(self.clone())
    }

    /// Endpoint under the base URL. Each segment is percent-encoded on its
    /// own, so an ID holding `/`, `?` or `#` stays a single segment.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.inner.base_url.clone();
        if segments.is_empty() {
            return Ok(url);
        }
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("{} cannot be a base", self.inner.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) async fn get<T>(&self, segments: &[&str]) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.request::<T, ()>(Method::GET, segments, &[], None).await
    }

    pub(crate) async fn get_with_query<T>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.request::<T, ()>(Method::GET, segments, query, None).await
    }

    pub(crate) async fn post<T, B>(&self, segments: &[&str], body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        self.request(Method::POST, segments, &[], Some(body)).await
    }

    pub(crate) async fn put<T, B>(&self, segments: &[&str], body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        self.request(Method::PUT, segments, &[], Some(body)).await
    }

    pub(crate) async fn delete<T>(&self, segments: &[&str]) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.request::<T, ()>(Method::DELETE, segments, &[], None).await
    }

    async fn request<T, B>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = self.url(segments)?;
        tracing::debug!(%method, %url, "request");

        let mut request = self
            .inner
            .http
            .request(method, url)
            .timeout(self.inner.timeout);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let raw = response.bytes().await?;

        if status.as_u16() > 399 {
            return Err(Error::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
                raw: String::from_utf8_lossy(&raw).into_owned(),
            });
        }

        Ok(serde_json::from_slice(&raw)?)
    }
}

/// Builder for creating a [`CatClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    ws_url: Option<String>,
    api_key: Option<String>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            ws_url: None,
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// HTTP base URL. Defaults to [`DEFAULT_BASE_URL`].
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Chat endpoint. Defaults to [`DEFAULT_WS_URL`].
    pub fn ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = Some(url.into());
        self
    }

    /// Key sent as the `Access_token` header on every HTTP request.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<CatClient> {
        let mut base_url = Url::parse(self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let ws_url = Url::parse(self.ws_url.as_deref().unwrap_or(DEFAULT_WS_URL))?;
        if !matches!(ws_url.scheme(), "ws" | "wss") {
            return Err(Error::Config(format!(
                "chat URL must use ws or wss, got {}",
                ws_url.scheme()
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(key)
                .map_err(|_| Error::Config("invalid API key".to_string()))?;
            headers.insert(HeaderName::from_static(ACCESS_TOKEN), value);
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("ccat-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()?;

        Ok(CatClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                ws_url,
                timeout: self.timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
