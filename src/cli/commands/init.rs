//! Init command - interactive first-run setup.

use crate::auth::AmbientCredentials;
use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::io::{self, Write};

/// Run the init command for first-time setup.
pub fn run_init(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Groundwise Setup");
    println!();
    println!("Welcome to Groundwise! Let's make sure everything is configured correctly.\n");

    // Step 1: Credentials
    println!("{}", style("Step 1: Checking credentials").bold().cyan());
    println!();

    let ambient =
        AmbientCredentials::from_env(reqwest::Client::new(), settings.credentials.scopes.clone());
    let key_file = settings.service_account_path();

    if ambient.is_available() {
        Output::success("Ambient Google credentials found!");
    } else if key_file.exists() {
        Output::success(&format!("Service-account key found: {}", key_file.display()));
    } else {
        Output::warning("No Google credentials found.");
        println!();
        println!("  Groundwise needs OAuth credentials for the corpus and answer APIs.");
        println!("  Either log in with application-default credentials:");
        println!("  {}", style("gcloud auth application-default login").green());
        println!("  or download a service-account key and save it as:");
        println!("  {}", style(key_file.display()).green());
        println!();

        if !prompt_continue("Continue without credentials?")? {
            println!();
            Output::info("Setup cancelled. Configure credentials and run 'groundwise init' again.");
            return Ok(());
        }
    }

    println!();

    // Step 2: Directories
    println!("{}", style("Step 2: Setting up directories").bold().cyan());
    println!();

    for (label, dir) in [
        ("data", settings.data_dir()),
        ("PDF input", settings.ingest_dir()),
    ] {
        if dir.exists() {
            Output::info(&format!("{} directory exists: {}", label, dir.display()));
        } else {
            std::fs::create_dir_all(&dir)?;
            Output::success(&format!("Created {} directory: {}", label, dir.display()));
        }
    }

    println!();

    // Step 3: Config file
    println!("{}", style("Step 3: Configuration file").bold().cyan());
    println!();

    let config_path = Settings::default_config_path();
    if config_path.exists() {
        Output::info(&format!("Config file exists: {}", config_path.display()));
    } else if prompt_continue("Create default configuration file?")? {
        settings.save_to(&config_path)?;
        Output::success(&format!("Created config file: {}", config_path.display()));
        println!();
        println!("  Edit your config with: {}", style("groundwise config edit").green());
    } else {
        Output::info("Skipped config file creation. Using defaults.");
    }

    println!();

    // Summary
    println!("{}", style("Setup Complete!").bold().green());
    println!();
    println!("Next steps:");
    println!("  {} Check system status", style("groundwise doctor").cyan());
    println!(
        "  {} Index the PDFs in {}",
        style("groundwise ingest").cyan(),
        settings.ingest_dir().display()
    );
    println!("  {} Ask a question", style("groundwise ask \"<question>\"").cyan());
    println!();
    println!("For more help: {}", style("groundwise --help").cyan());

    Ok(())
}

/// Prompt user for yes/no confirmation.
fn prompt_continue(message: &str) -> io::Result<bool> {
    print!("{} {} ", style("?").cyan(), message);
    print!("{} ", style("[y/N]").dim());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(is_yes(&input))
}

fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}
