use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::{CollectionHandle, ConnectionInfo, PeekResult, Result, StoreError, VectorStore};
use crate::config::Settings;

/// Builds the value of the `Authorization` header for HTTP basic auth.
pub fn basic_auth_header(username: &str, password: &str) -> String {
    let credentials = format!("{}:{}", username, password);
    format!("Basic {}", STANDARD.encode(credentials))
}

#[derive(Deserialize)]
struct Heartbeat {
    #[serde(rename = "nanosecond heartbeat")]
    nanos: u64,
}

/// Client for Chroma's v2 REST API over plain HTTP.
#[derive(Debug, Clone)]
pub struct ChromaClient {
    http: reqwest::Client,
    base_url: Url,
    tenant: String,
    database: String,
}

impl ChromaClient {
    pub fn new(info: &ConnectionInfo, settings: &Settings) -> Result<ChromaClient> {
        // Plain HTTP, always
        let base_url = Url::parse(&format!("http://{}:{}/", info.host, info.port))
            .map_err(|e| StoreError::InvalidConfig(format!("invalid host or port: {}", e)))?;

        // Credentials go on every request, kept out of debug output
        let mut auth = HeaderValue::from_str(&basic_auth_header(&info.username, &info.password))
            .map_err(|e| StoreError::InvalidConfig(format!("invalid credentials: {}", e)))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        // Build the client
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.request_timeout())
            .build()?;

        Ok(ChromaClient {
            http,
            base_url,
            tenant: settings.tenant.clone(),
            database: settings.database.clone(),
        })
    }

    /// Checks that the service is up. Returns the server clock in nanoseconds.
    pub async fn heartbeat(&self) -> Result<u64> {
        let url = self.url(&["api", "v2", "heartbeat"])?;
        let beat: Heartbeat = self.send(self.request(Method::GET, url)).await?;
        Ok(beat.nanos)
    }

    pub async fn version(&self) -> Result<String> {
        let url = self.url(&["api", "v2", "version"])?;
        self.send(self.request(Method::GET, url)).await
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidConfig("base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn collections_url(&self, tail: &[&str]) -> Result<Url> {
        let mut segments = vec![
            "api",
            "v2",
            "tenants",
            self.tenant.as_str(),
            "databases",
            self.database.as_str(),
            "collections",
        ];
        segments.extend_from_slice(tail);
        self.url(&segments)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(method = method.as_str(), path = url.path(), "chroma request");
        self.http.request(method, url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "chroma response");

        if !status.is_success() {
            return Err(StoreError::from_status(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl VectorStore for ChromaClient {
    async fn list_collections(&self) -> Result<Vec<String>> {
        let url = self.collections_url(&[])?;
        let collections: Vec<CollectionHandle> =
            self.send(self.request(Method::GET, url)).await?;
        Ok(collections.into_iter().map(|c| c.name).collect())
    }

    async fn get_collection(&self, name: &str) -> Result<CollectionHandle> {
        let url = self.collections_url(&[name])?;
        self.send(self.request(Method::GET, url)).await
    }

    async fn peek(&self, collection: &CollectionHandle, limit: usize) -> Result<PeekResult> {
        let url = self.collections_url(&[collection.id.as_str(), "get"])?;
        let body = json!({
            "limit": limit,
            "include": ["documents", "metadatas"],
        });
        self.send(self.request(Method::POST, url).json(&body)).await
    }

    async fn count(&self, collection: &CollectionHandle) -> Result<u64> {
        let url = self.collections_url(&[collection.id.as_str(), "count"])?;
        self.send(self.request(Method::GET, url)).await
    }
}
