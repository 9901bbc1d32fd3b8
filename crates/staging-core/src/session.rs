use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StagingError};
use crate::io::atomic_write;
use crate::types::{OsVersion, SessionConfig};

/// File name of the persisted session, relative to the repository root.
pub const SESSION_FILE_NAME: &str = "test-build.yaml";

// ─── SessionFile ──────────────────────────────────────────────────────────

/// Settings of a staging session, persisted on teardown so that a later run
/// can pick up the same branch and OBS project with `--load`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFile {
    pub os_version: OsVersion,
    pub branch_name: String,
    pub osc_username: String,
    pub project_name: String,
}

impl SessionFile {
    pub fn path(root: &Path) -> PathBuf {
        root.join(SESSION_FILE_NAME)
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path(root);
        if !path.exists() {
            return Err(StagingError::SessionFileMissing(path));
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        atomic_write(&Self::path(root), data.as_bytes())
    }

    /// Delete the persisted session. A missing file is not an error.
    pub fn remove(root: &Path) -> Result<()> {
        match std::fs::remove_file(Self::path(root)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.os_version)
            .with_branch(self.branch_name.clone())
            .with_username(Some(self.osc_username.clone()))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
