//! Command-line interface.

pub(crate) mod ask;
pub(crate) mod common;
pub(crate) mod guide;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "guidedesk", version, about = "Browse a markdown guide and ask questions about it")]
pub(crate) struct Cli {
    /// Config file (default: ~/.guidedesk/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Ask a single question
    Ask {
        /// The question
        question: Vec<String>,
        /// Guide directory used to gather context
        #[arg(long)]
        guide: Option<PathBuf>,
        /// Send the question without guide context
        #[arg(long)]
        no_context: bool,
    },
    /// Interactive question loop sharing one answer cache
    Chat {
        /// Guide directory used to gather context
        #[arg(long)]
        guide: Option<PathBuf>,
    },
    /// Search section titles, descriptions and categories
    Search {
        /// Search terms
        terms: Vec<String>,
        #[arg(long)]
        guide: Option<PathBuf>,
    },
    /// List the guide's sections in hierarchical order
    Sections {
        #[arg(long)]
        guide: Option<PathBuf>,
    },
}
