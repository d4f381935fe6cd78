//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{DocumentOutcome, Orchestrator};
use anyhow::Result;
use std::path::Path;

/// Run the ingest command.
pub async fn run_ingest(
    dir: Option<String>,
    fail_fast: bool,
    jobs: Option<usize>,
    mut settings: Settings,
) -> Result<()> {
    let dir = dir
        .map(|d| Settings::expand_path(&d))
        .unwrap_or_else(|| settings.ingest_dir());

    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ingest, &settings, Some(&dir)) {
        Output::error(&format!("{}", e));
        Output::info("Run 'groundwise doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if fail_fast {
        settings.ingest.fail_fast = true;
    }
    if let Some(jobs) = jobs {
        settings.ingest.max_concurrent_documents = jobs;
    }

    let orchestrator = Orchestrator::new(settings)?;

    let files = orchestrator.scan_directory(&dir)?;
    if files.is_empty() {
        Output::warning(&format!("No PDF files found in {}", dir.display()));
        return Ok(());
    }
    Output::info(&format!(
        "Found {} PDF files in {}",
        files.len(),
        dir.display()
    ));

    let pb = Output::progress_bar(files.len() as u64, "Indexing documents");
    let on_document = |outcome: &DocumentOutcome| {
        match outcome {
            DocumentOutcome::Ingested(document) => pb.println(format!(
                "  {} ({} chunks)",
                file_name(&document.path),
                document.chunks.len()
            )),
            DocumentOutcome::Skipped { path, reason } => {
                pb.println(format!("  {} skipped: {}", file_name(path), reason))
            }
        }
        pb.inc(1);
    };

    let report = match orchestrator.ingest_directory(&dir, &on_document).await {
        Ok(report) => {
            pb.finish_and_clear();
            report
        }
        Err(e) => {
            pb.abandon();
            Output::error(&format!("Ingestion failed: {}", e));
            return Err(e.into());
        }
    };

    Output::success(&format!(
        "Indexed {} documents ({} chunks) into {}",
        report.documents.len(),
        report.chunk_count(),
        report.corpus.name
    ));
    if !report.skipped.is_empty() {
        Output::warning(&format!("{} documents skipped:", report.skipped.len()));
        for skipped in &report.skipped {
            Output::list_item(&format!("{}: {}", skipped.path.display(), skipped.reason));
        }
    }
    if let Some(side_file) = &report.side_file {
        Output::kv("Chunks written to", &side_file.display().to_string());
    }

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
