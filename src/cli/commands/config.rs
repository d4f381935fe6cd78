//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings, path: Option<&str>) -> Result<()> {
    let config_path = path
        .map(Settings::expand_path)
        .unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            let rendered =
                toml::to_string_pretty(&settings).context("Failed to serialize settings")?;
            println!("# {}", source_label(&config_path));
            println!("{}", rendered);
        }

        ConfigAction::Edit => edit(&settings, &config_path)?,

        ConfigAction::Path => {
            for (label, value) in resolved_paths(&settings, &config_path) {
                Output::kv(label, &value);
            }
        }
    }

    Ok(())
}

/// Open the config in `$EDITOR`, then check that it still parses.
fn edit(settings: &Settings, config_path: &Path) -> Result<()> {
    if !config_path.exists() {
        settings.save_to(&config_path.to_path_buf())?;
        Output::info(&format!("Wrote defaults to {}", config_path.display()));
    }

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = std::process::Command::new(&editor)
        .arg(config_path)
        .status()
        .with_context(|| format!("Failed to launch {}", editor))?;

    if !status.success() {
        Output::warning(&format!("{} exited with {}", editor, status));
        return Ok(());
    }

    match Settings::load_from(Some(&config_path.to_path_buf())) {
        Ok(reloaded) => {
            Output::success("Configuration is valid.");
            Output::kv("Corpus", &corpus_label(&reloaded));
        }
        Err(e) => {
            Output::error(&format!("{} no longer parses: {}", config_path.display(), e));
            Output::info("Fix it with 'groundwise config edit'; defaults are used until then.");
        }
    }

    Ok(())
}

fn source_label(config_path: &Path) -> String {
    if config_path.exists() {
        format!("loaded from {}", config_path.display())
    } else {
        format!("defaults ({} does not exist)", config_path.display())
    }
}

fn corpus_label(settings: &Settings) -> String {
    match &settings.corpus.resource_name {
        Some(name) => name.clone(),
        None => format!("display name '{}'", settings.corpus.display_name),
    }
}

/// Every location the pipelines read or write, after `~` and data-dir resolution.
fn resolved_paths(settings: &Settings, config_path: &Path) -> Vec<(&'static str, String)> {
    let display = |p: PathBuf| p.display().to_string();
    vec![
        ("Config file", config_path.display().to_string()),
        ("Data directory", display(settings.data_dir())),
        ("PDF directory", display(settings.ingest_dir())),
        ("Chunk side file", display(settings.side_file_path())),
        ("Service-account key", display(settings.service_account_path())),
        ("Corpus", corpus_label(settings)),
    ]
}
