//! guidedesk CLI entry point.

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Cli, Commands};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();
    init_tracing(args.log_json);

    let config = cli::common::load_config(args.config.as_deref())?;

    match args.command {
        Commands::Ask {
            question,
            guide,
            no_context,
        } => cli::ask::cmd_ask(&config, question, guide, no_context).await,
        Commands::Chat { guide } => cli::ask::cmd_chat(&config, guide).await,
        Commands::Search { terms, guide } => cli::guide::cmd_search(&config, terms, guide),
        Commands::Sections { guide } => cli::guide::cmd_sections(&config, guide),
    }
}
