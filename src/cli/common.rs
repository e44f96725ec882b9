//! Shared setup for command handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use guidedesk::{Config, Dispatcher, GeminiProvider, GuideIndex};

/// Load config from `path` (or the default location) and apply env overrides.
pub(crate) fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => {
            let mut config = Config::load_from_path(p)
                .with_context(|| format!("Failed to load config from {}", p.display()))?;
            config.apply_env_overrides();
            Ok(config)
        }
        None => Config::load().context("Failed to load config"),
    }
}

/// Build the one dispatcher shared by a whole command run.
pub(crate) fn build_dispatcher(config: &Config) -> Result<Arc<Dispatcher>> {
    let provider = GeminiProvider::from_config(&config.provider)
        .context("Failed to initialize completion provider")?;
    Ok(Arc::new(Dispatcher::from_config(config, Arc::new(provider))))
}

/// Guide directory from the flag, then config.
pub(crate) fn guide_root(flag: Option<PathBuf>, config: &Config) -> Option<PathBuf> {
    flag.or_else(|| config.guide.root.clone())
}

/// Load the guide index, requiring a known root.
pub(crate) fn load_guide(flag: Option<PathBuf>, config: &Config) -> Result<GuideIndex> {
    let root = guide_root(flag, config).ok_or_else(|| {
        anyhow::anyhow!(
            "No guide directory configured.\n\
             Pass --guide DIR, set GUIDEDESK_GUIDE_DIR, or add guide.root to {}",
            Config::path().display()
        )
    })?;
    GuideIndex::load(&root).with_context(|| format!("Failed to load guide at {}", root.display()))
}
