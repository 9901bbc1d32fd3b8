//! In-memory session handle and factory recording every call.

use std::cell::RefCell;
use std::rc::Rc;

use staging_core::build_result::parse_osc_results;
use staging_core::comment::parse_review_comment;
use staging_core::{BuildResultSet, Result, SessionConfig, SessionFactory, SessionHandle, StagingError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Setup,
    Teardown,
    ForceRebuild,
    WritePkgConfigs,
    FetchBuildResults,
    WriteRecipes(String),
    ScratchBuild(String),
    RemoteCleanup { branches: bool, obs_project: bool },
    Wait(Option<u64>),
}

pub fn results(failed: bool) -> BuildResultSet {
    let mut text = String::from("images|x86_64|bci-base|published|False|succeeded|\n");
    if failed {
        text.push_str("images|x86_64|bci-python|published|False|failed|exit code 1\n");
    }
    parse_osc_results("home:geeko:BCI:Staging:SLE-15-SP6:test", &text).unwrap()
}

fn remote_error() -> StagingError {
    StagingError::CommandFailed {
        command: "osc".into(),
        code: 1,
        stderr: "remote error".into(),
    }
}

// ─── FakeHandle ───────────────────────────────────────────────────────────

/// Clones share the call log, so a test can keep one and hand the other out.
#[derive(Debug, Clone, Default)]
pub struct FakeHandle {
    log: Rc<RefCell<Vec<Call>>>,
    results: BuildResultSet,
    commit: Option<String>,
    fail_setup: bool,
    fail_action: bool,
    fail_teardown: bool,
    panic_action: bool,
}

impl FakeHandle {
    pub fn with_results(mut self, results: BuildResultSet) -> Self {
        self.results = results;
        self
    }

    pub fn with_commit(mut self, commit: Option<&str>) -> Self {
        self.commit = commit.map(str::to_string);
        self
    }

    pub fn failing_setup(mut self) -> Self {
        self.fail_setup = true;
        self
    }

    pub fn failing_action(mut self) -> Self {
        self.fail_action = true;
        self
    }

    pub fn failing_teardown(mut self) -> Self {
        self.fail_teardown = true;
        self
    }

    pub fn panicking_action(mut self) -> Self {
        self.panic_action = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.log.borrow().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }

    fn action<T>(&self, call: Call, value: T) -> Result<T> {
        self.record(call);
        if self.panic_action {
            panic!("handle exploded");
        }
        if self.fail_action {
            return Err(remote_error());
        }
        Ok(value)
    }
}

impl SessionHandle for FakeHandle {
    async fn setup(&mut self) -> Result<()> {
        self.record(Call::Setup);
        if self.fail_setup {
            return Err(StagingError::ToolNotFound("osc".into()));
        }
        Ok(())
    }

    async fn teardown(&mut self) -> Result<()> {
        self.record(Call::Teardown);
        if self.fail_teardown {
            return Err(StagingError::NoWorktree);
        }
        Ok(())
    }

    async fn force_rebuild(&mut self) -> Result<()> {
        self.action(Call::ForceRebuild, ())
    }

    async fn write_pkg_configs(&mut self) -> Result<()> {
        self.action(Call::WritePkgConfigs, ())
    }

    async fn fetch_build_results(&mut self) -> Result<BuildResultSet> {
        self.action(Call::FetchBuildResults, self.results.clone())
    }

    async fn write_all_build_recipes_to_branch(
        &mut self,
        commit_message: &str,
    ) -> Result<Option<String>> {
        self.action(Call::WriteRecipes(commit_message.into()), self.commit.clone())
    }

    async fn scratch_build(&mut self, commit_message: &str) -> Result<Option<String>> {
        self.action(Call::ScratchBuild(commit_message.into()), self.commit.clone())
    }

    async fn remote_cleanup(&mut self, branches: bool, obs_project: bool) -> Result<()> {
        self.action(
            Call::RemoteCleanup {
                branches,
                obs_project,
            },
            (),
        )
    }

    async fn wait_for_build_to_finish(
        &mut self,
        timeout_sec: Option<u64>,
    ) -> Result<BuildResultSet> {
        self.action(Call::Wait(timeout_sec), self.results.clone())
    }
}

// ─── FakeFactory ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Built {
    SessionFile,
    ReviewComment(SessionConfig),
    Parameters(SessionConfig),
}

#[derive(Debug, Default)]
pub struct FakeFactory {
    pub handle: FakeHandle,
    built: RefCell<Vec<Built>>,
}

impl FakeFactory {
    pub fn new(handle: FakeHandle) -> Self {
        Self {
            handle,
            built: RefCell::default(),
        }
    }

    pub fn built(&self) -> Vec<Built> {
        self.built.borrow().clone()
    }
}

impl SessionFactory for FakeFactory {
    type Handle = FakeHandle;

    async fn from_session_file(&self) -> Result<FakeHandle> {
        self.built.borrow_mut().push(Built::SessionFile);
        Ok(self.handle.clone())
    }

    fn from_review_comment(&self, text: &str, osc_username: Option<String>) -> Result<FakeHandle> {
        let config = parse_review_comment(text, osc_username)?;
        self.built.borrow_mut().push(Built::ReviewComment(config));
        Ok(self.handle.clone())
    }

    fn from_parameters(&self, config: SessionConfig) -> Result<FakeHandle> {
        self.built.borrow_mut().push(Built::Parameters(config));
        Ok(self.handle.clone())
    }
}
