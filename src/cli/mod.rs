//! CLI module for Groundwise.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Groundwise - grounded question answering over your PDFs
///
/// Indexes PDF documents into a hosted semantic-retrieval corpus and answers
/// questions from it, falling back to a general model when the corpus is not enough.
#[derive(Parser, Debug)]
#[command(name = "groundwise")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Set up directories and a default configuration file
    Init,

    /// Check credentials and configuration
    Doctor,

    /// Extract, chunk and index every PDF in a directory
    Ingest {
        /// Directory to scan (defaults to ingest.data_dir)
        dir: Option<String>,

        /// Abort on the first unreadable PDF instead of skipping it
        #[arg(long)]
        fail_fast: bool,

        /// Number of documents processed at once
        #[arg(short = 'j', long)]
        jobs: Option<usize>,
    },

    /// Ask a question against the corpus
    Ask {
        /// The question to ask
        question: String,

        /// Image to send along with the question
        #[arg(short, long)]
        image: Option<String>,

        /// Print the raw JSON result only
        #[arg(long)]
        json: bool,
    },

    /// Retrieve the most relevant passages without generating an answer
    Search {
        /// Search query
        query: String,

        /// Number of passages to return
        #[arg(short = 'n', long, default_value = "5")]
        limit: usize,
    },

    /// Start HTTP API server for integration with other systems
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ingest_flags() {
        let cli = Cli::parse_from(["groundwise", "-vv", "ingest", "docs", "--fail-fast", "-j", "4"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Ingest {
                dir,
                fail_fast,
                jobs,
            } => {
                assert_eq!(dir.as_deref(), Some("docs"));
                assert!(fail_fast);
                assert_eq!(jobs, Some(4));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_ask_with_image() {
        let cli = Cli::parse_from([
            "groundwise",
            "ask",
            "What plant is this?",
            "--image",
            "leaf.jpg",
            "--config",
            "alt.toml",
        ]);
        assert_eq!(cli.config.as_deref(), Some("alt.toml"));
        match cli.command {
            Commands::Ask {
                question,
                image,
                json,
            } => {
                assert_eq!(question, "What plant is this?");
                assert_eq!(image.as_deref(), Some("leaf.jpg"));
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_search_limit() {
        let cli = Cli::parse_from(["groundwise", "search", "battery recycling"]);
        match cli.command {
            Commands::Search { query, limit } => {
                assert_eq!(query, "battery recycling");
                assert_eq!(limit, 5);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::parse_from(["groundwise", "search", "q", "-n", "12"]);
        assert!(matches!(cli.command, Commands::Search { limit: 12, .. }));
    }
}
