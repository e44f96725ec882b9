//! Guide browsing commands.

use std::path::PathBuf;

use anyhow::Result;

use guidedesk::Config;

use super::common::load_guide;

/// Handle `guidedesk search`.
pub(crate) fn cmd_search(config: &Config, terms: Vec<String>, guide: Option<PathBuf>) -> Result<()> {
    let index = load_guide(guide, config)?;
    let query = terms.join(" ");
    let hits = index.search(&query, &config.guide);

    if hits.is_empty() {
        println!("No sections match \"{}\".", query.trim());
        return Ok(());
    }

    println!("{:<32} {:<40} {}", "Id", "Title", "Category");
    println!("{}", "-".repeat(90));
    for section in hits {
        println!(
            "{:<32} {:<40} {}",
            section.id, section.title, section.category
        );
    }
    Ok(())
}

/// Handle `guidedesk sections`.
pub(crate) fn cmd_sections(config: &Config, guide: Option<PathBuf>) -> Result<()> {
    let index = load_guide(guide, config)?;
    if index.is_empty() {
        println!("No sections found under {}.", index.root().display());
        return Ok(());
    }

    let mut current_category: Option<&str> = None;
    for section in index.sections() {
        if current_category != Some(section.category.as_str()) {
            let indent = "  ".repeat(section.level);
            println!("{}{}", indent, section.category);
            current_category = Some(section.category.as_str());
        }
        let indent = "  ".repeat(section.level + 1);
        println!("{}- {} ({})", indent, section.title, section.id);
    }
    println!();
    println!("{} sections", index.len());
    Ok(())
}
