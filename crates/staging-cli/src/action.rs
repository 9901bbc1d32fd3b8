//! The fixed set of actions and the handle operation each one invokes.

use staging_core::{is_build_failed, BuildResultSet, SessionHandle, StagingError};
use std::fmt;

use crate::error::RunError;

// ---------------------------------------------------------------------------
// ActionId
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionId {
    Rebuild,
    CreateProject,
    QueryBuildResult,
    CommitState,
    ScratchBuild,
    Cleanup,
    Wait,
    GetBuildQuality,
}

impl ActionId {
    pub const ALL: [ActionId; 8] = [
        ActionId::Rebuild,
        ActionId::CreateProject,
        ActionId::QueryBuildResult,
        ActionId::CommitState,
        ActionId::ScratchBuild,
        ActionId::Cleanup,
        ActionId::Wait,
        ActionId::GetBuildQuality,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionId::Rebuild => "rebuild",
            ActionId::CreateProject => "create_project",
            ActionId::QueryBuildResult => "query_build_result",
            ActionId::CommitState => "commit_state",
            ActionId::ScratchBuild => "scratch_build",
            ActionId::Cleanup => "cleanup",
            ActionId::Wait => "wait",
            ActionId::GetBuildQuality => "get_build_quality",
        }
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Action — an ActionId together with its parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Rebuild,
    CreateProject,
    QueryBuildResult,
    CommitState { commit_message: String },
    ScratchBuild { commit_message: String },
    Cleanup { branches: bool, obs_project: bool },
    Wait { timeout_sec: Option<u64> },
    GetBuildQuality,
}

impl Action {
    pub fn id(&self) -> ActionId {
        match self {
            Action::Rebuild => ActionId::Rebuild,
            Action::CreateProject => ActionId::CreateProject,
            Action::QueryBuildResult => ActionId::QueryBuildResult,
            Action::CommitState { .. } => ActionId::CommitState,
            Action::ScratchBuild { .. } => ActionId::ScratchBuild,
            Action::Cleanup { .. } => ActionId::Cleanup,
            Action::Wait { .. } => ActionId::Wait,
            Action::GetBuildQuality => ActionId::GetBuildQuality,
        }
    }
}

/// What an action produced, before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutput {
    Nothing,
    Results(BuildResultSet),
    Commit(Option<String>),
    BuildSucceeded,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Invoke the single handle operation `action` maps to.
pub async fn dispatch<H: SessionHandle>(
    handle: &mut H,
    action: &Action,
) -> Result<ActionOutput, RunError> {
    let id = action.id();
    tracing::info!(action = %id, "running action");
    let failed = |source: StagingError| RunError::Action { action: id, source };

    match action {
        Action::Rebuild => handle.force_rebuild().await.map_err(failed)?,
        Action::CreateProject => handle.write_pkg_configs().await.map_err(failed)?,
        Action::QueryBuildResult => return query_build_result(handle).await.map_err(failed),
        Action::CommitState { commit_message } => {
            let commit = handle
                .write_all_build_recipes_to_branch(commit_message)
                .await
                .map_err(failed)?;
            tracing::debug!(commit = ?commit, "committed build recipes");
        }
        Action::ScratchBuild { commit_message } => {
            return scratch_build(handle, commit_message).await.map_err(failed)
        }
        Action::Cleanup {
            branches,
            obs_project,
        } => handle
            .remote_cleanup(*branches, *obs_project)
            .await
            .map_err(failed)?,
        Action::Wait { timeout_sec } => return wait(handle, *timeout_sec).await.map_err(failed),
        Action::GetBuildQuality => return get_build_quality(handle).await,
    }
    Ok(ActionOutput::Nothing)
}

pub async fn query_build_result<H: SessionHandle>(
    handle: &mut H,
) -> Result<ActionOutput, StagingError> {
    Ok(ActionOutput::Results(handle.fetch_build_results().await?))
}

pub async fn scratch_build<H: SessionHandle>(
    handle: &mut H,
    commit_message: &str,
) -> Result<ActionOutput, StagingError> {
    Ok(ActionOutput::Commit(
        handle.scratch_build(commit_message).await?,
    ))
}

pub async fn wait<H: SessionHandle>(
    handle: &mut H,
    timeout_sec: Option<u64>,
) -> Result<ActionOutput, StagingError> {
    Ok(ActionOutput::Results(
        handle.wait_for_build_to_finish(timeout_sec).await?,
    ))
}

/// Wait without a timeout, then fail the invocation if any package failed.
pub async fn get_build_quality<H: SessionHandle>(
    handle: &mut H,
) -> Result<ActionOutput, RunError> {
    let results = handle
        .wait_for_build_to_finish(None)
        .await
        .map_err(|source| RunError::Action {
            action: ActionId::GetBuildQuality,
            source,
        })?;

    if is_build_failed(&results) {
        let mut failed = 0;
        for (repo, pkg) in results.packages().filter(|(_, p)| p.code.is_failure()) {
            tracing::error!(
                package = %pkg.name,
                repository = %repo.repository,
                arch = %repo.arch,
                code = %pkg.code,
                "build failed"
            );
            failed += 1;
        }
        return Err(RunError::BuildFailed { failed });
    }
    Ok(ActionOutput::BuildSucceeded)
}
