//! Credential resolution for the hosted Google services.
//!
//! A [`CredentialProvider`] yields something that can authorize a request. The
//! default chain tries ambient credentials first and the configured
//! service-account key file second.

mod ambient;
mod service_account;
mod token;

pub use ambient::AmbientCredentials;
pub use service_account::{ServiceAccountCredentials, ServiceAccountKey};
pub use token::{AccessToken, AuthorizedUserCredentials};

use crate::config::Settings;
use crate::error::{GroundwiseError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Scopes needed for corpus management, answer generation and video search.
pub const DEFAULT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/generative-language.retriever",
    "https://www.googleapis.com/auth/youtube.force-ssl",
];

/// Something that can be attached to an outgoing request.
#[derive(Clone, PartialEq)]
pub enum Credential {
    /// Sent as the `x-goog-api-key` header.
    ApiKey(String),
    /// Sent as a bearer token.
    AccessToken(String),
}

impl Credential {
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Credential::ApiKey(key) => request.header("x-goog-api-key", key),
            Credential::AccessToken(token) => request.bearer_auth(token),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::ApiKey(_) => write!(f, "ApiKey(***)"),
            Credential::AccessToken(_) => write!(f, "AccessToken(***)"),
        }
    }
}

/// A strategy for obtaining request credentials.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Short name used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Resolve a credential, refreshing cached tokens when needed.
    async fn credential(&self) -> Result<Credential>;
}

/// Tries each provider in order and returns the first credential that resolves.
pub struct ChainedCredentials {
    providers: Vec<Arc<dyn CredentialProvider>>,
}

impl ChainedCredentials {
    pub fn new(providers: Vec<Arc<dyn CredentialProvider>>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl CredentialProvider for ChainedCredentials {
    fn name(&self) -> &str {
        "chain"
    }

    async fn credential(&self) -> Result<Credential> {
        let mut failures = Vec::new();

        for provider in &self.providers {
            match provider.credential().await {
                Ok(credential) => {
                    debug!("Using {} credentials", provider.name());
                    return Ok(credential);
                }
                Err(e) => {
                    debug!("{} credentials unavailable: {}", provider.name(), e);
                    failures.push(format!("{}: {}", provider.name(), e));
                }
            }
        }

        Err(GroundwiseError::Credentials(if failures.is_empty() {
            "no credential providers configured".to_string()
        } else {
            failures.join("; ")
        }))
    }
}

/// Build the ambient-then-service-account chain from settings.
pub fn default_provider(settings: &Settings, http: reqwest::Client) -> Arc<dyn CredentialProvider> {
    let scopes = settings.credentials.scopes.clone();

    let ambient = AmbientCredentials::from_env(http.clone(), scopes.clone());
    let service_account =
        ServiceAccountCredentials::from_file(settings.service_account_path(), http, scopes);

    Arc::new(ChainedCredentials::new(vec![
        Arc::new(ambient),
        Arc::new(service_account),
    ]))
}
