//! The seam between the command front end and a staging session.
//!
//! The front end only ever talks to a session through [`SessionHandle`] and
//! obtains one through a [`SessionFactory`]. The production implementation
//! lives in the `staging-bot` crate.

use crate::build_result::BuildResultSet;
use crate::error::Result;
use crate::types::SessionConfig;

/// One working branch paired with one staging project on OBS.
///
/// Futures returned by these methods are driven on a single-threaded
/// runtime, so they are not required to be `Send`.
#[allow(async_fn_in_trait)]
pub trait SessionHandle {
    /// Acquire local and remote resources. Must finish before any action.
    async fn setup(&mut self) -> Result<()>;

    /// Release what `setup` acquired and persist the session.
    async fn teardown(&mut self) -> Result<()>;

    async fn force_rebuild(&mut self) -> Result<()>;

    /// Create or update the staging project and its package configurations.
    async fn write_pkg_configs(&mut self) -> Result<()>;

    async fn fetch_build_results(&mut self) -> Result<BuildResultSet>;

    /// Commit all build recipes to the branch; `None` if nothing changed.
    async fn write_all_build_recipes_to_branch(
        &mut self,
        commit_message: &str,
    ) -> Result<Option<String>>;

    /// Commit, create the project and rebuild; `None` if nothing changed.
    async fn scratch_build(&mut self, commit_message: &str) -> Result<Option<String>>;

    async fn remote_cleanup(&mut self, branches: bool, obs_project: bool) -> Result<()>;

    /// Poll until the project settles. `timeout_sec` is advisory; the
    /// implementation decides how expiry is reported.
    async fn wait_for_build_to_finish(&mut self, timeout_sec: Option<u64>)
        -> Result<BuildResultSet>;
}

/// The three ways of obtaining a [`SessionHandle`].
#[allow(async_fn_in_trait)]
pub trait SessionFactory {
    type Handle: SessionHandle;

    /// Reload the session persisted by a previous run.
    async fn from_session_file(&self) -> Result<Self::Handle>;

    /// Recover a session from free text such as a review comment body.
    fn from_review_comment(&self, text: &str, osc_username: Option<String>)
        -> Result<Self::Handle>;

    fn from_parameters(&self, config: SessionConfig) -> Result<Self::Handle>;
}
