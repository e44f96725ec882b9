//! Guide index: the flattened section list of a markdown documentation guide.
//!
//! A guide directory holds `hierarchy.json` (nested categories) or, failing
//! that, a flat `file-list.json`, plus the markdown files they reference.

pub mod context;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::config::GuideConfig;
use crate::error::{GuideError, Result};

pub use context::gather_context;

const HIERARCHY_FILE: &str = "hierarchy.json";
const FILE_LIST_FILE: &str = "file-list.json";
const UNCATEGORIZED: &str = "Uncategorized";

/// One navigable guide section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Markdown file, resolved against the guide root.
    pub file: PathBuf,
    pub category: String,
    pub category_id: String,
    pub category_path: Option<String>,
    /// Nesting depth of the owning category (0 = top level).
    pub level: usize,
    pub parent_category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileRef {
    id: String,
    title: String,
    file: String,
}

#[derive(Debug, Deserialize)]
struct CategoryNode {
    id: String,
    title: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    files: Vec<FileRef>,
    #[serde(default)]
    subcategories: Vec<CategoryNode>,
}

/// Sections in hierarchical (depth-first) order.
#[derive(Debug, Clone, Default)]
pub struct GuideIndex {
    root: PathBuf,
    sections: Vec<Section>,
}

impl GuideIndex {
    /// Load the index under `root`.
    ///
    /// Tries `hierarchy.json` first and falls back to `file-list.json` when it
    /// is missing or malformed. Neither file present, or a malformed file
    /// list, yields an empty index. Only IO failures are errors.
    pub fn load(root: &Path) -> Result<Self> {
        match Self::load_hierarchy(root) {
            Ok(Some(index)) => {
                info!(sections = index.len(), "Loaded guide from hierarchy");
                return Ok(index);
            }
            Ok(None) => {
                warn!(root = %root.display(), "No hierarchy found, falling back to file list");
            }
            Err(e) => {
                warn!(error = %e, "Hierarchy unreadable, falling back to file list");
            }
        }
        match Self::load_file_list(root) {
            Ok(Some(index)) => {
                info!(sections = index.len(), "Loaded guide from file list");
                return Ok(index);
            }
            Ok(None) => {
                warn!(root = %root.display(), "No guide sections found");
            }
            Err(GuideError::Guide(e)) => {
                warn!(error = %e, "File list malformed, continuing without sections");
            }
            Err(e) => return Err(e),
        }
        Ok(Self {
            root: root.to_path_buf(),
            sections: Vec::new(),
        })
    }

    fn load_hierarchy(root: &Path) -> Result<Option<Self>> {
        let Some(data) = read_optional(&root.join(HIERARCHY_FILE))? else {
            return Ok(None);
        };
        let nodes: Vec<CategoryNode> = serde_json::from_str(&data)
            .map_err(|e| GuideError::Guide(format!("{}: {}", HIERARCHY_FILE, e)))?;

        let mut index = Self {
            root: root.to_path_buf(),
            sections: Vec::new(),
        };
        let mut seen = HashSet::new();
        index.flatten(&nodes, None, 0, &mut seen);
        Ok(Some(index))
    }

    fn flatten(
        &mut self,
        nodes: &[CategoryNode],
        parent: Option<&str>,
        level: usize,
        seen: &mut HashSet<String>,
    ) {
        for node in nodes {
            for file in &node.files {
                if !seen.insert(file.id.clone()) {
                    continue;
                }
                self.sections.push(Section {
                    id: file.id.clone(),
                    title: file.title.clone(),
                    description: String::new(),
                    file: self.root.join(&file.file),
                    category: node.title.clone(),
                    category_id: node.id.clone(),
                    category_path: node.path.clone(),
                    level,
                    parent_category: parent.map(String::from),
                });
            }
            self.flatten(&node.subcategories, Some(node.title.as_str()), level + 1, seen);
        }
    }

    fn load_file_list(root: &Path) -> Result<Option<Self>> {
        let Some(data) = read_optional(&root.join(FILE_LIST_FILE))? else {
            return Ok(None);
        };
        let files: Vec<FileRef> = serde_json::from_str(&data)
            .map_err(|e| GuideError::Guide(format!("{}: {}", FILE_LIST_FILE, e)))?;

        let mut seen = HashSet::new();
        let sections = files
            .into_iter()
            .filter(|f| seen.insert(f.id.clone()))
            .map(|f| Section {
                file: root.join(&f.file),
                id: f.id,
                title: f.title,
                description: String::new(),
                category: UNCATEGORIZED.to_string(),
                category_id: UNCATEGORIZED.to_lowercase(),
                category_path: None,
                level: 0,
                parent_category: None,
            })
            .collect();
        Ok(Some(Self {
            root: root.to_path_buf(),
            sections,
        }))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Look up a section by id.
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Sections whose title, description or category contains `query`
    /// (case-insensitive), in index order.
    ///
    /// Queries shorter than `search_min_chars` after trimming return nothing.
    pub fn search(&self, query: &str, config: &GuideConfig) -> Vec<&Section> {
        let needle = query.trim().to_lowercase();
        if needle.chars().count() < config.search_min_chars {
            return Vec::new();
        }
        self.sections
            .iter()
            .filter(|s| {
                s.title.to_lowercase().contains(&needle)
                    || s.description.to_lowercase().contains(&needle)
                    || s.category.to_lowercase().contains(&needle)
            })
            .take(config.max_search_results)
            .collect()
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
