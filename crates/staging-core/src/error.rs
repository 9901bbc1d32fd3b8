use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("invalid OS version '{0}': expected one of 5, 6, 7, 16.0, Tumbleweed")]
    InvalidOsVersion(String),

    #[error("no session file found at {0}: run without --load first")]
    SessionFileMissing(PathBuf),

    #[error("could not parse review comment: {0}")]
    CommentParse(String),

    #[error("could not parse build results: {0}")]
    ResultParse(String),

    #[error("required tool '{0}' not found on PATH")]
    ToolNotFound(String),

    #[error("`{command}` failed with exit code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("no OSC username configured and `osc whois` returned nothing usable")]
    UnknownUser,

    #[error("session has no worktree: setup() has not run")]
    NoWorktree,

    #[error("build did not finish within {0} seconds")]
    Timeout(u64),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, StagingError>;
