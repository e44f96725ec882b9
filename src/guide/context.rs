//! Context gathering for assistant questions.
//!
//! Ranks guide sections by how many query words appear in their markdown or
//! title and returns the best few as [`ContextExcerpt`]s for the dispatcher.

use tracing::{debug, warn};

use crate::dispatcher::ContextExcerpt;

use super::{GuideIndex, Section};

/// Words of this length or shorter are ignored when matching.
const MIN_WORD_CHARS: usize = 2;

struct Ranked<'a> {
    section: &'a Section,
    content: String,
    relevance: usize,
}

/// Query words longer than [`MIN_WORD_CHARS`], lowercased.
fn query_words(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > MIN_WORD_CHARS)
        .map(String::from)
        .collect()
}

/// Gather up to `limit` sections relevant to `query`.
///
/// Relevance is the number of query words found in a section's content or
/// title. Sections with no match are dropped; ties keep index order.
/// Unreadable markdown files are skipped with a warning.
pub async fn gather_context(index: &GuideIndex, query: &str, limit: usize) -> Vec<ContextExcerpt> {
    let words = query_words(query);
    if words.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut ranked = Vec::new();
    for section in index.sections() {
        let content = match tokio::fs::read_to_string(&section.file).await {
            Ok(content) => content,
            Err(e) => {
                warn!(section = %section.id, error = %e, "Failed to read section for context");
                continue;
            }
        };
        let content_lower = content.to_lowercase();
        let title_lower = section.title.to_lowercase();
        let relevance = words
            .iter()
            .filter(|w| content_lower.contains(w.as_str()) || title_lower.contains(w.as_str()))
            .count();
        if relevance > 0 {
            ranked.push(Ranked {
                section,
                content,
                relevance,
            });
        }
    }

    ranked.sort_by(|a, b| b.relevance.cmp(&a.relevance));
    ranked.truncate(limit);
    debug!(
        query = %query,
        matched = ranked.len(),
        "Gathered guide context"
    );

    ranked
        .into_iter()
        .map(|r| ContextExcerpt::new(r.section.title.clone(), r.content))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guide::tests::hierarchy_guide;

    fn write(dir: &std::path::Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_query_words_drop_short_words() {
        assert_eq!(
            query_words("What is the MRCM of a body?"),
            vec!["what", "the", "mrcm", "body?"]
        );
    }

    #[tokio::test]
    async fn test_ranked_by_word_matches() {
        let tmp = hierarchy_guide();
        write(tmp.path(), "mrcm.md", "The MRCM defines attribute ranges.");
        write(tmp.path(), "body.md", "Body structure attribute rules and MRCM ranges.");
        write(tmp.path(), "fsn.md", "Naming rules.");
        let index = GuideIndex::load(tmp.path()).unwrap();

        let ctx = gather_context(&index, "mrcm attribute body", 3).await;
        let titles: Vec<&str> = ctx.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Body Structure", "Machine Readable Concept Model"]);
        assert_eq!(ctx[0].excerpt, "Body structure attribute rules and MRCM ranges.");
    }

    #[tokio::test]
    async fn test_title_match_counts() {
        let tmp = hierarchy_guide();
        write(tmp.path(), "mrcm.md", "nothing relevant");
        write(tmp.path(), "body.md", "nothing relevant");
        write(tmp.path(), "fsn.md", "nothing relevant");
        let index = GuideIndex::load(tmp.path()).unwrap();

        let ctx = gather_context(&index, "specified", 3).await;
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx[0].title, "Fully Specified Names");
    }

    #[tokio::test]
    async fn test_limit_and_missing_files() {
        let tmp = hierarchy_guide();
        write(tmp.path(), "mrcm.md", "rules");
        write(tmp.path(), "fsn.md", "rules");
        // body.md deliberately missing
        let index = GuideIndex::load(tmp.path()).unwrap();

        let ctx = gather_context(&index, "rules", 1).await;
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx[0].title, "Machine Readable Concept Model");
    }

    #[tokio::test]
    async fn test_short_query_gathers_nothing() {
        let tmp = hierarchy_guide();
        write(tmp.path(), "mrcm.md", "an is of");
        let index = GuideIndex::load(tmp.path()).unwrap();
        assert!(gather_context(&index, "an is", 3).await.is_empty());
    }
}
