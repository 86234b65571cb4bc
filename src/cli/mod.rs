//! CLI module for Werkbank.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Werkbank - Machine Tool Support Knowledge Base
///
/// Ingests technical documentation into a vector index and answers customer
/// support questions with retrieval-augmented generation.
#[derive(Parser, Debug)]
#[command(name = "werkbank")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
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
    /// Extract, chunk, embed, and index a document
    Ingest {
        /// Path to a .pdf, .txt, or .md file
        file: PathBuf,

        /// Document title (defaults to the file stem)
        #[arg(short, long)]
        title: Option<String>,

        /// Document type (manual, faq, troubleshooting, training)
        #[arg(short, long, default_value = "manual")]
        doc_type: String,

        /// Machine type for filtered retrieval (e.g. lathe, mill)
        #[arg(short, long)]
        machine_type: Option<String>,
    },

    /// Ask a support question against the indexed documentation
    Ask {
        /// The question to ask
        query: String,

        /// Restrict retrieval to a machine type
        #[arg(short, long)]
        machine_type: Option<String>,

        /// Maximum number of context chunks to include
        #[arg(short = 'c', long, default_value = "3")]
        context_limit: usize,
    },

    /// Check which backends are configured
    Health,

    /// Start the HTTP API server
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
    /// Show the effective configuration
    Show,

    /// Print the configuration file path
    Path,
}
