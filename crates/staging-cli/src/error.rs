use staging_core::StagingError;
use thiserror::Error;

use crate::action::ActionId;

// ---------------------------------------------------------------------------
// ConfigError — raised before setup, never followed by a teardown
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("conflicting configuration sources: --load and --from-stdin are mutually exclusive")]
    ConflictingSources,

    #[error("no OS version has been set: pass --os-version or set OS_VERSION")]
    MissingOsVersion,

    #[error(transparent)]
    InvalidOsVersion(StagingError),

    #[error("failed to read the review comment from stdin")]
    Stdin(#[source] std::io::Error),

    #[error("failed to acquire the session configuration")]
    Acquire(#[source] StagingError),
}

// ---------------------------------------------------------------------------
// RunError — typed failures of one invocation
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to start the async runtime")]
    Runtime(#[source] std::io::Error),

    #[error("setup failed")]
    Setup(#[source] StagingError),

    #[error("action '{action}' failed")]
    Action {
        action: ActionId,
        #[source]
        source: StagingError,
    },

    #[error("Build failed! {failed} package build(s) failed")]
    BuildFailed { failed: usize },

    /// The action succeeded but teardown did not. `output` is what the action
    /// rendered, still owed to stdout.
    #[error("teardown failed")]
    Teardown {
        output: Option<String>,
        #[source]
        source: StagingError,
    },

    /// The action failed and so did the teardown that followed it. The action
    /// failure is the primary error.
    #[error("{}; teardown also failed: {}", chain(.primary), chain(.teardown))]
    WithTeardown {
        primary: Box<RunError>,
        teardown: StagingError,
    },
}

impl RunError {
    /// Configuration problems exit like argument errors; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Config(_) => 2,
            _ => 1,
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, RunError::Config(_))
    }

    /// Output the action rendered before the invocation failed, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            RunError::Teardown { output, .. } => output.as_deref(),
            _ => None,
        }
    }
}

/// Render an error with its full source chain on one line.
fn chain<E: std::error::Error + ?Sized>(err: &E) -> String {
    let mut out = err.to_string();
    let mut cur = err.source();
    while let Some(e) = cur {
        out.push_str(": ");
        out.push_str(&e.to_string());
        cur = e.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_exit_with_two() {
        let err = RunError::from(ConfigError::ConflictingSources);
        assert_eq!(err.exit_code(), 2);
        assert!(err.is_config());
        assert!(err.to_string().contains("conflicting configuration sources"));
    }

    #[test]
    fn action_errors_exit_with_one() {
        let err = RunError::Action {
            action: ActionId::Wait,
            source: StagingError::Timeout(5),
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "action 'wait' failed");
    }

    #[test]
    fn teardown_error_keeps_rendered_output() {
        let err = RunError::Teardown {
            output: Some("abc123".into()),
            source: StagingError::NoWorktree,
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.output(), Some("abc123"));
        assert_eq!(RunError::BuildFailed { failed: 1 }.output(), None);
    }

    #[test]
    fn with_teardown_reports_action_first() {
        let err = RunError::WithTeardown {
            primary: Box::new(RunError::Action {
                action: ActionId::Rebuild,
                source: StagingError::Timeout(5),
            }),
            teardown: StagingError::NoWorktree,
        };
        assert_eq!(
            err.to_string(),
            "action 'rebuild' failed: build did not finish within 5 seconds; \
             teardown also failed: session has no worktree: setup() has not run"
        );
    }
}
