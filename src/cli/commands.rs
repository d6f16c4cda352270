use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Mode;

/// `iris-refine` - bounded response refinement for assistant replies.
#[derive(Parser, Debug)]
#[command(name = "iris-refine")]
#[command(version)]
#[command(about = "Score, filter and refine assistant responses within a fixed budget.", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.iris-refine/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decide whether a query is worth refining
    Engage {
        /// User query
        #[arg(short, long)]
        query: String,
    },

    /// Score a response against a query
    Score {
        /// User query
        #[arg(short, long)]
        query: String,

        /// Candidate response
        #[arg(short, long)]
        response: String,
    },

    /// Run the policy filter over a piece of text
    Filter {
        /// User query
        #[arg(short, long)]
        query: String,

        /// Text to filter
        #[arg(short, long)]
        text: String,

        /// Reply locale (default: policy.default_locale)
        #[arg(short, long)]
        locale: Option<String>,
    },

    /// Refine a draft response
    Enhance {
        /// User query
        #[arg(short, long)]
        query: String,

        /// Draft response
        #[arg(short, long)]
        response: String,

        /// Refinement depth (fast, normal, deep; default: config default_mode)
        #[arg(short, long)]
        mode: Option<Mode>,

        /// JSON array of candidate revisions, served in order
        #[arg(long)]
        candidates: Option<PathBuf>,

        /// Reply locale (default: policy.default_locale)
        #[arg(short, long)]
        locale: Option<String>,
    },

    /// Print the resolved configuration as TOML
    Config,

    /// Show engine status: config path, catalog and mode budgets
    Status,
}
