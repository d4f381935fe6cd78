//! OAuth access tokens and the shared token-endpoint exchange.

use super::{Credential, CredentialProvider};
use crate::error::{GroundwiseError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

pub(crate) const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are refreshed.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// A bearer token with its expiry.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > now
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// POST a form to a token endpoint and parse the access token.
pub(crate) async fn exchange(
    http: &reqwest::Client,
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<AccessToken> {
    let response = http.post(token_uri).form(form).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GroundwiseError::Credentials(format!(
            "token endpoint returned {}: {}",
            status, body
        )));
    }

    let parsed: TokenResponse = response.json().await?;
    debug!("Obtained access token valid for {}s", parsed.expires_in);

    Ok(AccessToken {
        token: parsed.access_token,
        expires_at: Utc::now() + Duration::seconds(parsed.expires_in),
    })
}

/// Single cached token guarded for concurrent refreshes.
#[derive(Default)]
pub(crate) struct TokenCache {
    current: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    /// Return the cached token or fetch a new one with `refresh`.
    pub(crate) async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<AccessToken>>,
    {
        let mut current = self.current.lock().await;
        if let Some(token) = current.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.token.clone());
            }
        }

        let token = refresh().await?;
        let value = token.token.clone();
        *current = Some(token);
        Ok(value)
    }
}

/// Credentials written by `gcloud auth application-default login`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUserFile {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

/// Refresh-token credentials for an end user.
pub struct AuthorizedUserCredentials {
    file: AuthorizedUserFile,
    http: reqwest::Client,
    cache: TokenCache,
}

impl AuthorizedUserCredentials {
    pub fn new(file: AuthorizedUserFile, http: reqwest::Client) -> Self {
        Self {
            file,
            http,
            cache: TokenCache::default(),
        }
    }

    fn refresh_form(&self) -> [(&str, &str); 4] {
        [
            ("grant_type", "refresh_token"),
            ("client_id", &self.file.client_id),
            ("client_secret", &self.file.client_secret),
            ("refresh_token", &self.file.refresh_token),
        ]
    }

    async fn fetch_token(&self) -> Result<AccessToken> {
        let form = self.refresh_form();
        exchange(&self.http, GOOGLE_TOKEN_URI, &form).await
    }
}

#[async_trait]
impl CredentialProvider for AuthorizedUserCredentials {
    fn name(&self) -> &str {
        "authorized-user"
    }

    async fn credential(&self) -> Result<Credential> {
        let token = self.cache.get_or_refresh(|| self.fetch_token()).await?;
        Ok(Credential::AccessToken(token))
    }
}
