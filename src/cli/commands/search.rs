//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, limit: usize, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search, &settings, None) {
        Output::error(&format!("{}", e));
        Output::info("Run 'groundwise doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Searching...");
    let results = orchestrator.search(query, limit).await;
    spinner.finish_and_clear();

    match results {
        Ok(chunks) if chunks.is_empty() => {
            Output::warning("No passages found matching your query.");
        }
        Ok(chunks) => {
            Output::success(&format!("Found {} passages", chunks.len()));
            for (i, relevant) in chunks.iter().enumerate() {
                Output::search_result(
                    i + 1,
                    relevant.relevance,
                    &relevant.chunk.name,
                    &relevant.chunk.text,
                );
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
