//! Recover session parameters from the review comment the bot posts when it
//! creates a staging project:
//!
//! ```text
//! Created a staging project on OBS for 6: [home:geeko:BCI:Staging:SLE-15-SP6:sle15-sp6-AbCdE](https://build.opensuse.org/project/show/...)
//! Changes pushed to branch [`sle15-sp6-AbCdE`](https://github.com/...)
//! ```

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Result, StagingError};
use crate::types::{OsVersion, SessionConfig};

static PROJECT_RE: OnceLock<Regex> = OnceLock::new();
static BRANCH_RE: OnceLock<Regex> = OnceLock::new();

fn project_re() -> &'static Regex {
    PROJECT_RE.get_or_init(|| {
        Regex::new(r"Created a staging project on OBS for (?P<os>[^:\s]+): \[(?P<project>[^\]]+)\]")
            .unwrap()
    })
}

fn branch_re() -> &'static Regex {
    BRANCH_RE.get_or_init(|| Regex::new(r"Changes pushed to branch \[`(?P<branch>[^`]+)`\]").unwrap())
}

/// Parse a review comment body into a [`SessionConfig`] acting as `osc_username`.
pub fn parse_review_comment(text: &str, osc_username: Option<String>) -> Result<SessionConfig> {
    let project = project_re().captures(text).ok_or_else(|| {
        StagingError::CommentParse("no 'Created a staging project on OBS for' line".into())
    })?;
    let branch = branch_re()
        .captures(text)
        .ok_or_else(|| StagingError::CommentParse("no 'Changes pushed to branch' line".into()))?;

    let os_version: OsVersion = project["os"].parse()?;
    let branch_name = branch["branch"].trim();
    if branch_name.is_empty() {
        return Err(StagingError::CommentParse("empty branch name".into()));
    }

    Ok(SessionConfig::new(os_version)
        .with_branch(branch_name)
        .with_username(osc_username))
}
