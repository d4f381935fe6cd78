//! Ask command implementation.

use crate::answer::ImageInput;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    image: Option<String>,
    json: bool,
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask, &settings, None) {
        Output::error(&format!("{}", e));
        Output::info("Run 'groundwise doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let image = image
        .map(|path| ImageInput::from_file(&Settings::expand_path(&path)))
        .transpose()?;

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Looking up corpus...");
    let engine = match orchestrator.query_engine().await {
        Ok(engine) => engine,
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };

    spinner.set_message("Generating answer...");
    let result = engine.answer(question, image.as_ref()).await;
    spinner.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        Output::query_result(&result);
    }

    if let Some(error) = result.error {
        return Err(anyhow::anyhow!(error));
    }

    Ok(())
}
