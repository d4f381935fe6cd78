//! HTTP client for the hosted Google APIs, with timeout and credentials.

use crate::auth::CredentialProvider;
use crate::error::{GroundwiseError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default timeout for API requests (2 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Create an HTTP client with the given request timeout.
///
/// Every external call shares this client so a hung service cannot block forever.
pub fn create_http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Authorized JSON client rooted at one API base URL.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    credentials: Arc<dyn CredentialProvider>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl ApiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base = Url::parse(&normalized)
            .map_err(|e| GroundwiseError::Config(format!("invalid base URL {}: {}", base_url, e)))?;

        Ok(Self {
            http,
            base,
            credentials,
        })
    }

    /// Resolve a resource path (e.g. `corpora/abc/documents`) against the base URL.
    pub fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| GroundwiseError::InvalidInput(format!("invalid path {}: {}", path, e)))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(path)?;
        debug!("GET {}", url);
        let request = self.http.get(url).query(query);
        self.send(request).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(path)?;
        debug!("POST {}", url);
        let request = self.http.post(url).json(body);
        self.send(request).await
    }

    pub async fn delete(&self, path: &str, query: &[(&str, String)]) -> Result<()> {
        let url = self.url(path)?;
        debug!("DELETE {}", url);
        let request = self.http.delete(url).query(query);
        self.send::<serde_json::Value>(request).await?;
        Ok(())
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let credential = self.credentials.credential().await?;
        let response = credential.apply(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }

        Ok(response.json().await?)
    }
}

/// Map an error response body to [`GroundwiseError::Api`].
fn api_error(status: u16, body: &str) -> GroundwiseError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(kind) => format!("{}: {}", kind, envelope.error.message),
            None => envelope.error.message,
        },
        Err(_) => body.chars().take(500).collect(),
    };
    GroundwiseError::Api { status, message }
}
