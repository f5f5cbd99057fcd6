//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};

/// Finoly - Record and query expenses in plain language
#[derive(Parser)]
#[command(name = "finoly")]
#[command(about = "Natural-language expense assistant", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value = "5001")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
    },

    /// Run one prompt through the interpreter and print the result as JSON
    Interpret {
        /// Free-text prompt, e.g. "I spent 50 dollars on food today"
        prompt: String,
    },

    /// Resolve a named time period to its date range
    Period {
        /// Period phrase, e.g. "last month"
        phrase: String,

        /// Resolve relative to this date (YYYY-MM-DD) instead of today
        #[arg(long)]
        at: Option<String>,
    },

    /// Manage the prompt library
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List prompts with versions and override status
    List,
    /// Show the content of one prompt
    Show {
        /// Prompt ID (e.g. extract_filters)
        id: String,
    },
    /// Print the override directory
    Path,
}
