//! Setup → action → teardown, with teardown guaranteed once setup succeeded.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use staging_core::{SessionFactory, SessionHandle};
use tokio::io::AsyncRead;
use tokio::runtime::Runtime;

use crate::action::{self, Action};
use crate::config::{self, ConfigSource};
use crate::error::RunError;
use crate::render;

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Owns the single-threaded runtime one invocation runs on.
///
/// [`Lifecycle::run`] consumes it, so the runtime is dropped only after
/// teardown has completed.
pub struct Lifecycle {
    runtime: Runtime,
}

impl Lifecycle {
    pub fn new() -> Result<Self, RunError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(RunError::Runtime)?;
        Ok(Self { runtime })
    }

    /// Acquire a handle from `source`, then supervise `action` on it.
    pub fn run<F, R>(
        self,
        factory: &F,
        source: ConfigSource,
        stdin: R,
        action: &Action,
    ) -> Result<Option<String>, RunError>
    where
        F: SessionFactory,
        R: AsyncRead + Unpin,
    {
        self.runtime.block_on(async {
            let mut handle = config::acquire(factory, source, stdin).await?;
            supervise(&mut handle, action).await
        })
    }
}

// ---------------------------------------------------------------------------
// supervise
// ---------------------------------------------------------------------------

/// Run `action` between `setup` and `teardown` and render its output.
///
/// A failed setup returns immediately without teardown. Otherwise teardown
/// runs exactly once, also when the action fails or panics; a panic resumes
/// after teardown. A teardown failure after a successful action carries the
/// rendered output along. When both the action and teardown fail the action
/// error is primary and the teardown error is attached to it.
pub async fn supervise<H: SessionHandle>(
    handle: &mut H,
    action: &Action,
) -> Result<Option<String>, RunError> {
    handle.setup().await.map_err(RunError::Setup)?;
    tracing::debug!("setup complete");

    let outcome = AssertUnwindSafe(async {
        action::dispatch(handle, action)
            .await
            .map(|out| render::render(&out))
    })
    .catch_unwind()
    .await;

    let teardown = handle.teardown().await;
    tracing::debug!(ok = teardown.is_ok(), "teardown complete");

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(panic) => {
            if let Err(e) = teardown {
                tracing::error!(error = %e, "teardown failed while unwinding");
            }
            std::panic::resume_unwind(panic)
        }
    };

    match (outcome, teardown) {
        (Ok(rendered), Ok(())) => Ok(rendered),
        (Ok(output), Err(source)) => Err(RunError::Teardown { output, source }),
        (Err(e), Ok(())) => Err(e),
        (Err(primary), Err(teardown)) => Err(RunError::WithTeardown {
            primary: Box::new(primary),
            teardown,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{BUILD_SUCCEEDED, NO_CHANGES};
    use crate::testing::{results, Built, Call, FakeFactory, FakeHandle};
    use staging_core::{OsVersion, SessionConfig};

    fn explicit() -> ConfigSource {
        ConfigSource::Explicit(SessionConfig::new(OsVersion::Sp6))
    }

    fn run(handle: FakeHandle, action: Action) -> Result<Option<String>, RunError> {
        let factory = FakeFactory::new(handle);
        Lifecycle::new()
            .unwrap()
            .run(&factory, explicit(), &b""[..], &action)
    }

    #[test]
    fn setup_precedes_action_precedes_teardown() {
        let handle = FakeHandle::default();
        run(handle.clone(), Action::Rebuild).unwrap();
        assert_eq!(
            handle.calls(),
            vec![Call::Setup, Call::ForceRebuild, Call::Teardown]
        );
    }

    #[test]
    fn teardown_runs_once_when_action_fails() {
        let handle = FakeHandle::default().failing_action();
        let err = run(handle.clone(), Action::CreateProject).unwrap_err();
        assert!(matches!(err, RunError::Action { .. }));
        assert_eq!(handle.count(&Call::Teardown), 1);
        assert_eq!(handle.calls().last(), Some(&Call::Teardown));
    }

    #[test]
    fn failed_setup_skips_action_and_teardown() {
        let handle = FakeHandle::default().failing_setup();
        let err = run(handle.clone(), Action::Rebuild).unwrap_err();
        assert!(matches!(err, RunError::Setup(_)));
        assert_eq!(handle.calls(), vec![Call::Setup]);
    }

    #[test]
    fn teardown_failure_after_success_is_reported() {
        let handle = FakeHandle::default().failing_teardown();
        let err = run(handle.clone(), Action::Rebuild).unwrap_err();
        assert!(matches!(err, RunError::Teardown { output: None, .. }));
    }

    #[test]
    fn commit_id_survives_teardown_failure() {
        let handle = FakeHandle::default()
            .with_commit(Some("abc123"))
            .failing_teardown();
        let err = run(
            handle.clone(),
            Action::ScratchBuild {
                commit_message: "fix".into(),
            },
        )
        .unwrap_err();
        assert_eq!(err.output(), Some("abc123"));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(handle.count(&Call::Teardown), 1);
    }

    #[test]
    fn action_failure_is_primary_over_teardown_failure() {
        let handle = FakeHandle::default().failing_action().failing_teardown();
        let err = run(handle.clone(), Action::Rebuild).unwrap_err();
        match err {
            RunError::WithTeardown { primary, .. } => {
                assert!(matches!(*primary, RunError::Action { .. }))
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(handle.count(&Call::Teardown), 1);
    }

    #[test]
    fn panicking_action_still_tears_down() {
        let handle = FakeHandle::default().panicking_action();
        let observed = handle.clone();
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = run(handle, Action::Rebuild);
        }));
        assert!(result.is_err());
        assert_eq!(observed.count(&Call::Teardown), 1);
    }

    #[test]
    fn teardown_runs_for_every_action() {
        let actions = [
            Action::Rebuild,
            Action::CreateProject,
            Action::QueryBuildResult,
            Action::CommitState {
                commit_message: String::new(),
            },
            Action::ScratchBuild {
                commit_message: String::new(),
            },
            Action::Cleanup {
                branches: true,
                obs_project: true,
            },
            Action::Wait { timeout_sec: None },
            Action::GetBuildQuality,
        ];
        for action in actions {
            for failing in [false, true] {
                let mut handle = FakeHandle::default().with_results(results(false));
                if failing {
                    handle = handle.failing_action();
                }
                let _ = run(handle.clone(), action.clone());
                assert_eq!(handle.count(&Call::Setup), 1);
                assert_eq!(handle.count(&Call::Teardown), 1);
                assert_eq!(handle.calls().len(), 3, "{:?}", handle.calls());
            }
        }
    }

    #[test]
    fn conflicting_sources_never_build_a_handle() {
        let factory = FakeFactory::default();
        let args = crate::config::ConfigArgs {
            load: true,
            from_stdin: true,
            ..Default::default()
        };
        let err = ConfigSource::resolve(args).map_err(RunError::from).unwrap_err();
        assert!(err.is_config());
        assert!(factory.built().is_empty());
        assert!(factory.handle.calls().is_empty());
    }

    #[test]
    fn acquisition_failure_never_sets_up() {
        let factory = FakeFactory::default();
        let err = Lifecycle::new()
            .unwrap()
            .run(
                &factory,
                ConfigSource::Stdin { osc_username: None },
                &b"no comment here"[..],
                &Action::Rebuild,
            )
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(factory.handle.calls().is_empty());
    }

    #[test]
    fn load_mode_runs_through_session_file() {
        let factory = FakeFactory::default();
        Lifecycle::new()
            .unwrap()
            .run(&factory, ConfigSource::Load, &b""[..], &Action::Rebuild)
            .unwrap();
        assert_eq!(factory.built(), vec![Built::SessionFile]);
        assert_eq!(factory.handle.count(&Call::Teardown), 1);
    }

    #[test]
    fn build_quality_success_prints_literal() {
        let handle = FakeHandle::default().with_results(results(false));
        let out = run(handle, Action::GetBuildQuality).unwrap();
        assert_eq!(out.as_deref(), Some(BUILD_SUCCEEDED));
    }

    #[test]
    fn build_quality_failure_prints_nothing() {
        let handle = FakeHandle::default().with_results(results(true));
        let err = run(handle.clone(), Action::GetBuildQuality).unwrap_err();
        assert!(matches!(err, RunError::BuildFailed { .. }));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(handle.count(&Call::Teardown), 1);
    }

    #[test]
    fn scratch_build_without_changes() {
        let handle = FakeHandle::default();
        let out = run(
            handle.clone(),
            Action::ScratchBuild {
                commit_message: "fix".into(),
            },
        )
        .unwrap();
        assert_eq!(out.as_deref(), Some(NO_CHANGES));
        assert_eq!(handle.count(&Call::ScratchBuild("fix".into())), 1);
    }

    #[test]
    fn scratch_build_with_commit() {
        let handle = FakeHandle::default().with_commit(Some("abc123"));
        let out = run(
            handle,
            Action::ScratchBuild {
                commit_message: "fix".into(),
            },
        )
        .unwrap();
        assert_eq!(out.as_deref(), Some("abc123"));
    }

    #[test]
    fn wait_prints_markdown_verbatim() {
        let set = results(true);
        let handle = FakeHandle::default().with_results(set.clone());
        let out = run(handle, Action::Wait { timeout_sec: Some(10) }).unwrap();
        assert_eq!(out, Some(staging_core::render_as_markdown(&set)));
    }

    #[test]
    fn unit_actions_print_nothing() {
        let out = run(FakeHandle::default(), Action::Rebuild).unwrap();
        assert_eq!(out, None);
    }
}
