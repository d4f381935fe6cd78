//! Doctor command - verify credentials and configuration.

use crate::auth::{self, AmbientCredentials, Credential, ServiceAccountKey};
use crate::corpus::Corpus;
use crate::error::{GroundwiseError, Result};
use crate::orchestrator::Orchestrator;
use crate::cli::Output;
use crate::config::Settings;
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Groundwise Doctor");
    println!();
    println!("Checking credentials and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("Credentials").bold());
    let credential_checks = vec![
        check_ambient(settings),
        check_service_account_file(settings),
        check_credential_resolution(settings).await,
    ];
    for check in &credential_checks {
        check.print();
    }
    checks.extend(credential_checks);

    println!();

    println!("{}", style("Directories").bold());
    let dir_checks = check_directories(settings);
    for check in &dir_checks {
        check.print();
    }
    checks.extend(dir_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_checks = vec![check_config_file(), check_corpus(settings).await];
    for check in &config_checks {
        check.print();
    }
    checks.extend(config_checks);

    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Groundwise.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Groundwise is ready to use.");
    }

    Ok(())
}

fn check_ambient(settings: &Settings) -> CheckResult {
    let ambient =
        AmbientCredentials::from_env(reqwest::Client::new(), settings.credentials.scopes.clone());
    if ambient.is_available() {
        CheckResult::ok("Ambient credentials", "found")
    } else {
        CheckResult::warning(
            "Ambient credentials",
            "none found",
            "Run 'gcloud auth application-default login' or set GOOGLE_APPLICATION_CREDENTIALS",
        )
    }
}

fn check_service_account_file(settings: &Settings) -> CheckResult {
    let path = settings.service_account_path();
    if !path.exists() {
        return CheckResult::warning(
            "Service-account key",
            &format!("{} (not found)", path.display()),
            "Only needed when no ambient credentials are available",
        );
    }

    match ServiceAccountKey::from_file(&path) {
        Ok(key) => CheckResult::ok(
            "Service-account key",
            &format!("{} ({})", path.display(), key.client_email),
        ),
        Err(e) => CheckResult::error(
            "Service-account key",
            &format!("{}: {}", path.display(), e),
            "Download a new JSON key from the Google Cloud console",
        ),
    }
}

/// Resolve a credential through the same chain the pipelines use.
async fn check_credential_resolution(settings: &Settings) -> CheckResult {
    let http = match crate::api::create_http_client(settings.request_timeout()) {
        Ok(http) => http,
        Err(e) => return CheckResult::error("Credential chain", &e.to_string(), "Check TLS setup"),
    };

    match auth::default_provider(settings, http).credential().await {
        Ok(Credential::AccessToken(_)) => CheckResult::ok("Credential chain", "access token obtained"),
        Ok(Credential::ApiKey(_)) => CheckResult::warning(
            "Credential chain",
            "using API key",
            "Corpus management needs OAuth credentials; API keys only cover generation",
        ),
        Err(e) => CheckResult::error(
            "Credential chain",
            &e.to_string(),
            "Configure ambient credentials or credentials.service_account_file",
        ),
    }
}

/// Check data directories.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let data_dir = settings.data_dir();
    if data_dir.exists() {
        results.push(CheckResult::ok("Data directory", &format!("{}", data_dir.display())));
    } else {
        results.push(CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        ));
    }

    let ingest_dir = settings.ingest_dir();
    if ingest_dir.is_dir() {
        let pdfs = count_pdfs(&ingest_dir);
        results.push(CheckResult::ok(
            "PDF directory",
            &format!("{} ({} PDF files)", ingest_dir.display(), pdfs),
        ));
    } else {
        results.push(CheckResult::warning(
            "PDF directory",
            &format!("{} (not found)", ingest_dir.display()),
            "Set ingest.data_dir or pass a directory to 'groundwise ingest'",
        ));
    }

    results
}

fn count_pdfs(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| {
                    e.path()
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
                })
                .count()
        })
        .unwrap_or(0)
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: groundwise init (or groundwise config edit)",
        )
    }
}

/// Verify the configured corpus exists in the service.
async fn check_corpus(settings: &Settings) -> CheckResult {
    let lookup = match Orchestrator::new(settings.clone()) {
        Ok(orchestrator) => orchestrator.find_existing_corpus().await,
        Err(e) => Err(e),
    };
    corpus_check(settings, lookup)
}

fn corpus_check(settings: &Settings, lookup: Result<Option<Corpus>>) -> CheckResult {
    let wanted = match &settings.corpus.resource_name {
        Some(name) => name.clone(),
        None => format!("'{}'", settings.corpus.display_name),
    };

    match lookup {
        Ok(Some(corpus)) => CheckResult::ok(
            "Corpus",
            &format!("{} ({})", corpus.name, corpus.display_name),
        ),
        Ok(None) => CheckResult::error(
            "Corpus",
            &format!("{} not found", wanted),
            "Run 'groundwise ingest' to create and fill it, or fix corpus.resource_name",
        ),
        Err(e @ GroundwiseError::Credentials(_)) => CheckResult::warning(
            "Corpus",
            &format!("could not look up {}: {}", wanted, e),
            "Fix credentials first",
        ),
        Err(e) => CheckResult::error(
            "Corpus",
            &format!("lookup of {} failed: {}", wanted, e),
            "Check network access and the corpus API permissions",
        ),
    }
}
