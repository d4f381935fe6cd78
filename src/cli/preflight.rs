//! Pre-flight checks before expensive operations.
//!
//! Validates that credentials and input directories are available
//! before starting operations that would otherwise fail midway.

use crate::auth::AmbientCredentials;
use crate::config::Settings;
use crate::error::{GroundwiseError, Result};
use std::path::Path;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingestion needs credentials and a readable input directory.
    Ingest,
    /// Asking questions needs credentials.
    Ask,
    /// Searching needs credentials.
    Search,
    /// Serving needs credentials.
    Serve,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings, input_dir: Option<&Path>) -> Result<()> {
    check_credentials(settings)?;
    if let Operation::Ingest = operation {
        let dir = input_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| settings.ingest_dir());
        check_input_dir(&dir)?;
    }
    Ok(())
}

/// Some credential source must be present: ambient or the key file.
fn check_credentials(settings: &Settings) -> Result<()> {
    let ambient = AmbientCredentials::from_env(reqwest::Client::new(), Vec::new());
    let key_file = settings.service_account_path();

    if ambient.is_available() || key_file.exists() {
        Ok(())
    } else {
        Err(GroundwiseError::Credentials(format!(
            "no credentials found. Set GOOGLE_APPLICATION_CREDENTIALS, run \
             'gcloud auth application-default login', or place a service-account key at {}",
            key_file.display()
        )))
    }
}

fn check_input_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(GroundwiseError::InvalidInput(format!(
            "input directory {} does not exist",
            dir.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_input_dir(dir.path()).is_ok());
        assert!(matches!(
            check_input_dir(&dir.path().join("absent")),
            Err(GroundwiseError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_key_file_satisfies_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("service_account_key.json");
        std::fs::write(&key, "{}").unwrap();

        let mut settings = Settings::default();
        settings.credentials.service_account_file = key.display().to_string();
        assert!(check(Operation::Ask, &settings, None).is_ok());
        assert!(check(Operation::Ingest, &settings, Some(dir.path())).is_ok());
    }
}
