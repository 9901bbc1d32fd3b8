//! `staging-bot` — a staging session for scratch builds of container images
//! on the Open Build Service.
//!
//! ```text
//! repository root
//!   ├── recipes/<package>/...   ← build recipes, one directory per package
//!   ├── .worktrees/<branch>/    ← worktree created by setup(), removed by teardown()
//!   └── test-build.yaml         ← session persisted by teardown(), read by --load
//!
//! OBS: home:<user>:BCI:Staging:<os suffix>:<branch>
//!        └── one package per recipe directory, scm-synced from <branch>
//! ```

mod bot;
pub(crate) mod process;

pub use bot::{StagingBot, DEFAULT_COMMIT_MESSAGE, RECIPE_DIR, WORKTREE_DIR};

use std::path::{Path, PathBuf};

use staging_core::{Result, SessionConfig, SessionFactory};

/// Builds [`StagingBot`] handles for the repository at `root`.
#[derive(Debug, Clone)]
pub struct BotFactory {
    root: PathBuf,
}

impl BotFactory {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Factory rooted at the process working directory.
    pub fn current_dir() -> Result<Self> {
        Ok(Self::new(&std::env::current_dir()?))
    }
}

impl SessionFactory for BotFactory {
    type Handle = StagingBot;

    async fn from_session_file(&self) -> Result<StagingBot> {
        StagingBot::from_session_file(&self.root).await
    }

    fn from_review_comment(&self, text: &str, osc_username: Option<String>) -> Result<StagingBot> {
        StagingBot::from_review_comment(&self.root, text, osc_username)
    }

    fn from_parameters(&self, config: SessionConfig) -> Result<StagingBot> {
        Ok(StagingBot::from_parameters(&self.root, config))
    }
}
