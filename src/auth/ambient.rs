//! Ambient (environment-provided) credentials.

use super::service_account::{ServiceAccountCredentials, ServiceAccountKey};
use super::token::{AuthorizedUserCredentials, AuthorizedUserFile};
use super::{Credential, CredentialProvider};
use crate::error::{GroundwiseError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
pub const APPLICATION_CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

enum AmbientSource {
    Static(Credential),
    Provider(Box<dyn CredentialProvider>),
}

/// Credentials discovered from the environment, in this order:
/// an explicit access token, the `GOOGLE_APPLICATION_CREDENTIALS` file, the gcloud
/// application-default file, then an API key.
pub struct AmbientCredentials {
    source: Option<AmbientSource>,
}

impl AmbientCredentials {
    pub fn from_env(http: reqwest::Client, scopes: Vec<String>) -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        let well_known = dirs::config_dir()
            .map(|dir| dir.join("gcloud").join("application_default_credentials.json"));

        Self::detect(
            var(ACCESS_TOKEN_ENV),
            var(APPLICATION_CREDENTIALS_ENV).map(PathBuf::from),
            well_known,
            var(API_KEY_ENV),
            http,
            scopes,
        )
    }

    fn detect(
        access_token: Option<String>,
        credentials_file: Option<PathBuf>,
        well_known_file: Option<PathBuf>,
        api_key: Option<String>,
        http: reqwest::Client,
        scopes: Vec<String>,
    ) -> Self {
        if let Some(token) = access_token {
            debug!("Ambient credentials: {}", ACCESS_TOKEN_ENV);
            return Self::with(AmbientSource::Static(Credential::AccessToken(token)));
        }

        let files = credentials_file
            .into_iter()
            .chain(well_known_file.filter(|p| p.exists()));
        for path in files {
            match load_credentials_file(&path, http.clone(), scopes.clone()) {
                Ok(provider) => {
                    debug!("Ambient credentials: {}", path.display());
                    return Self::with(AmbientSource::Provider(provider));
                }
                Err(e) => warn!("Ignoring credentials file {}: {}", path.display(), e),
            }
        }

        if let Some(key) = api_key {
            debug!("Ambient credentials: {}", API_KEY_ENV);
            return Self::with(AmbientSource::Static(Credential::ApiKey(key)));
        }

        Self { source: None }
    }

    fn with(source: AmbientSource) -> Self {
        Self {
            source: Some(source),
        }
    }

    pub fn is_available(&self) -> bool {
        self.source.is_some()
    }
}

fn load_credentials_file(
    path: &Path,
    http: reqwest::Client,
    scopes: Vec<String>,
) -> Result<Box<dyn CredentialProvider>> {
    let content = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;

    match value["type"].as_str() {
        Some("service_account") => {
            let key = ServiceAccountKey::from_json(&content)?;
            Ok(Box::new(ServiceAccountCredentials::from_key(key, http, scopes)))
        }
        Some("authorized_user") => {
            let file: AuthorizedUserFile = serde_json::from_value(value)?;
            Ok(Box::new(AuthorizedUserCredentials::new(file, http)))
        }
        other => Err(GroundwiseError::Credentials(format!(
            "unsupported credentials type: {}",
            other.unwrap_or("missing")
        ))),
    }
}

#[async_trait]
impl CredentialProvider for AmbientCredentials {
    fn name(&self) -> &str {
        "ambient"
    }

    async fn credential(&self) -> Result<Credential> {
        match &self.source {
            Some(AmbientSource::Static(credential)) => Ok(credential.clone()),
            Some(AmbientSource::Provider(provider)) => provider.credential().await,
            None => Err(GroundwiseError::Credentials(
                "no ambient credentials found in the environment".to_string(),
            )),
        }
    }
}
