//! Question commands: one-shot `ask` and the interactive `chat` loop.

use std::path::PathBuf;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::warn;

use guidedesk::dispatcher::ContextExcerpt;
use guidedesk::guide::gather_context;
use guidedesk::{CacheStats, Config, DispatchResult, Dispatcher, GuideIndex, Origin};

use super::common::{build_dispatcher, guide_root};

/// Handle `guidedesk ask`.
pub(crate) async fn cmd_ask(
    config: &Config,
    question: Vec<String>,
    guide: Option<PathBuf>,
    no_context: bool,
) -> Result<()> {
    let question = question.join(" ");
    if question.trim().is_empty() {
        anyhow::bail!("Nothing to ask. Usage: guidedesk ask <QUESTION>");
    }

    let dispatcher = build_dispatcher(config)?;
    let index = if no_context {
        None
    } else {
        optional_guide(guide, config)
    };

    let result = answer(&dispatcher, index.as_ref(), config, &question).await;
    println!("{}", result.text());
    Ok(())
}

/// Handle `guidedesk chat`.
pub(crate) async fn cmd_chat(config: &Config, guide: Option<PathBuf>) -> Result<()> {
    let dispatcher = build_dispatcher(config)?;
    let index = optional_guide(guide, config);

    if !dispatcher.is_configured() {
        println!("No API key configured; answers will come from local fallbacks.");
    }
    if let Some(index) = &index {
        println!("Loaded {} guide sections.", index.len());
    }
    println!("Type a question, /stats, /clear or /quit.");

    let mut editor = DefaultEditor::new().context("Failed to start line editor")?;
    loop {
        let line = match editor.readline("guidedesk> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("Failed to read input"),
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(input);

        match input {
            "/quit" | "/exit" => break,
            "/stats" => print_stats(&dispatcher.cache_stats().await),
            "/clear" => {
                dispatcher.clear_cache().await;
                println!("Answer cache cleared.");
            }
            question => {
                let result = answer(&dispatcher, index.as_ref(), config, question).await;
                println!("{}", result.text());
                if matches!(
                    result,
                    DispatchResult::Answered {
                        origin: Origin::Cache,
                        ..
                    }
                ) {
                    println!("(cached)");
                }
                println!();
            }
        }
    }
    Ok(())
}

async fn answer(
    dispatcher: &Dispatcher,
    index: Option<&GuideIndex>,
    config: &Config,
    question: &str,
) -> DispatchResult {
    let context: Vec<ContextExcerpt> = match index {
        Some(index) if dispatcher.is_configured() => {
            gather_context(index, question, config.guide.context_limit).await
        }
        _ => Vec::new(),
    };
    let context = (!context.is_empty()).then_some(context.as_slice());
    dispatcher.dispatch(question, context).await
}

/// Guide is optional for questions: no configured root, or one that fails to
/// load, means no context.
fn optional_guide(flag: Option<PathBuf>, config: &Config) -> Option<GuideIndex> {
    let root = guide_root(flag, config)?;
    match GuideIndex::load(&root) {
        Ok(index) => Some(index),
        Err(e) => {
            warn!(root = %root.display(), error = %e, "Guide unavailable, answering without context");
            None
        }
    }
}

fn print_stats(stats: &CacheStats) {
    if stats.size == 0 {
        println!("Answer cache is empty.");
        return;
    }
    println!("{:<48} {:>10} {:>6}", "Question", "Age", "Hits");
    println!("{}", "-".repeat(66));
    for entry in &stats.entries {
        println!(
            "{:<48} {:>9}s {:>6}",
            ellipsize(&entry.key, 48),
            entry.age.as_secs(),
            entry.hits
        );
    }
    println!("{} entries, {} hits", stats.size, stats.total_hits);
}

fn ellipsize(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{kept}...")
}
