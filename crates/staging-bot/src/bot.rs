use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;

use staging_core::build_result::{parse_osc_results, OSC_RESULTS_FORMAT};
use staging_core::comment::parse_review_comment;
use staging_core::io::copy_tree;
use staging_core::session::SessionFile;
use staging_core::{
    BuildResultSet, OsVersion, Result, SessionConfig, SessionHandle, StagingError,
};

use crate::process::Invocation;

/// Directory below the repository root holding one subdirectory per package.
pub const RECIPE_DIR: &str = "recipes";

/// Directory below the repository root where branch worktrees are created.
pub const WORKTREE_DIR: &str = ".worktrees";

pub const DEFAULT_COMMIT_MESSAGE: &str = "Test build";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Consecutive polls without a single package after which a project is taken
/// to have nothing to build.
const EMPTY_POLL_LIMIT: u32 = 3;

// ---------------------------------------------------------------------------
// StagingBot
// ---------------------------------------------------------------------------

/// A staging session backed by a git worktree and a home project on OBS,
/// driven through the `git` and `osc` command line tools.
#[derive(Debug)]
pub struct StagingBot {
    os_version: OsVersion,
    branch_name: String,
    osc_username: Option<String>,
    root: PathBuf,
    worktree: Option<PathBuf>,
    poll_interval: Duration,
    /// Set once `remote_cleanup` deleted both the branch and the OBS project.
    cleaned_up: bool,
}

impl StagingBot {
    /// Create a session for `config` in the repository at `root`.
    ///
    /// An empty branch name is replaced by `<branch_prefix>-<5 random chars>`.
    pub fn from_parameters(root: &Path, config: SessionConfig) -> Self {
        let branch_name = if config.branch_name.trim().is_empty() {
            generate_branch_name(config.os_version)
        } else {
            config.branch_name.trim().to_string()
        };
        Self {
            os_version: config.os_version,
            branch_name,
            osc_username: config.osc_username,
            root: root.to_path_buf(),
            worktree: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cleaned_up: false,
        }
    }

    pub fn from_review_comment(
        root: &Path,
        text: &str,
        osc_username: Option<String>,
    ) -> Result<Self> {
        let config = parse_review_comment(text, osc_username)?;
        Ok(Self::from_parameters(root, config))
    }

    pub async fn from_session_file(root: &Path) -> Result<Self> {
        let owned = root.to_path_buf();
        let file = tokio::task::spawn_blocking(move || SessionFile::load(&owned))
            .await
            .map_err(|e| StagingError::Io(std::io::Error::other(e)))??;
        tracing::info!(branch = %file.branch_name, project = %file.project_name, "loaded session");
        Ok(Self::from_parameters(root, file.session_config()))
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn os_version(&self) -> OsVersion {
        self.os_version
    }

    pub fn branch_name(&self) -> &str {
        &self.branch_name
    }

    pub fn project_name(&self) -> Result<String> {
        let user = self.osc_username.as_deref().ok_or(StagingError::UnknownUser)?;
        Ok(format!(
            "home:{user}:BCI:Staging:{}:{}",
            self.os_version.project_suffix(),
            self.branch_name
        ))
    }

    fn worktree(&self) -> Result<&Path> {
        self.worktree.as_deref().ok_or(StagingError::NoWorktree)
    }

    fn git(&self, cwd: &Path) -> Invocation {
        Invocation::new("git", cwd)
    }

    fn osc(&self) -> Invocation {
        Invocation::new("osc", &self.root)
    }

    async fn resolve_username(&self) -> Result<String> {
        let out = self.osc().arg("whois").run().await?;
        parse_whois(&out).ok_or(StagingError::UnknownUser)
    }

    async fn add_worktree(&self, path: &Path) -> Result<()> {
        let remote_exists = self
            .git(&self.root)
            .args(["ls-remote", "--exit-code", "--heads", "origin", self.branch_name.as_str()])
            .status()
            .await?
            == 0;

        let start = if remote_exists {
            self.git(&self.root)
                .args(["fetch", "origin", self.branch_name.as_str()])
                .run()
                .await?;
            "FETCH_HEAD"
        } else {
            "HEAD"
        };

        self.git(&self.root)
            .args(["worktree", "add", "-B", self.branch_name.as_str()])
            .arg(path.to_string_lossy())
            .arg(start)
            .run()
            .await?;
        Ok(())
    }

    async fn remove_worktree(&self, path: &Path) -> Result<()> {
        self.git(&self.root)
            .args(["worktree", "remove", "--force"])
            .arg(path.to_string_lossy())
            .run()
            .await?;
        Ok(())
    }

    /// Package names: the subdirectories of the recipe directory in the worktree.
    fn packages(&self) -> Result<Vec<String>> {
        let dir = self.worktree()?.join(RECIPE_DIR);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Write the session file, or delete it when nothing it names exists anymore.
    fn persist_session(&self) -> Result<()> {
        if self.cleaned_up {
            tracing::debug!("branch and project removed, dropping session file");
            return SessionFile::remove(&self.root);
        }
        let file = SessionFile {
            os_version: self.os_version,
            branch_name: self.branch_name.clone(),
            osc_username: self.osc_username.clone().unwrap_or_default(),
            project_name: self.project_name()?,
        };
        file.save(&self.root)?;
        tracing::debug!(path = %SessionFile::path(&self.root).display(), "session saved");
        Ok(())
    }

    async fn poll_until_finished(&mut self) -> Result<BuildResultSet> {
        let mut empty = EmptyPolls::default();
        loop {
            let results = self.fetch_build_results().await?;
            if results.is_finished() {
                return Ok(results);
            }
            if empty.observe(&results) {
                tracing::warn!(
                    project = %results.project,
                    polls = EMPTY_POLL_LIMIT,
                    "project reports no packages, nothing to wait for"
                );
                return Ok(results);
            }
            tracing::debug!(
                project = %results.project,
                interval_sec = self.poll_interval.as_secs(),
                "build still running"
            );
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

impl SessionHandle for StagingBot {
    async fn setup(&mut self) -> Result<()> {
        for tool in ["git", "osc"] {
            which::which(tool).map_err(|_| StagingError::ToolNotFound(tool.to_string()))?;
        }

        if self.osc_username.is_none() {
            let user = self.resolve_username().await?;
            tracing::info!(user = %user, "resolved OSC username");
            self.osc_username = Some(user);
        }

        let path = self.root.join(WORKTREE_DIR).join(&self.branch_name);
        if !path.exists() {
            self.add_worktree(&path).await?;
        }
        tracing::info!(branch = %self.branch_name, worktree = %path.display(), "session ready");
        self.worktree = Some(path);
        Ok(())
    }

    async fn teardown(&mut self) -> Result<()> {
        let persisted = self.persist_session();
        if let Err(e) = &persisted {
            tracing::error!(error = %e, "failed to persist session");
        }

        let removed = match self.worktree.take() {
            Some(path) => self.remove_worktree(&path).await,
            None => Ok(()),
        };
        persisted.and(removed)
    }

    async fn force_rebuild(&mut self) -> Result<()> {
        let project = self.project_name()?;
        tracing::info!(project = %project, "triggering rebuild");
        self.osc().args(["rebuild", project.as_str()]).run().await?;
        Ok(())
    }

    async fn write_pkg_configs(&mut self) -> Result<()> {
        let project = self.project_name()?;
        let user = self.osc_username.clone().ok_or(StagingError::UnknownUser)?;

        self.osc()
            .args(["meta", "prj", "-F", "-", project.as_str()])
            .stdin(project_meta(&project, &user, self.os_version, &self.branch_name))
            .run()
            .await?;

        let remote = self
            .git(&self.root)
            .args(["remote", "get-url", "origin"])
            .run()
            .await?;
        let url = https_remote_url(remote.trim());

        for pkg in self.packages()? {
            tracing::debug!(project = %project, package = %pkg, "writing package meta");
            self.osc()
                .args(["meta", "pkg", "-F", "-", project.as_str(), pkg.as_str()])
                .stdin(package_meta(&project, &pkg, &url, &self.branch_name))
                .run()
                .await?;
        }
        Ok(())
    }

    async fn fetch_build_results(&mut self) -> Result<BuildResultSet> {
        let project = self.project_name()?;
        let out = self
            .osc()
            .args(["results", "--csv", "--format", OSC_RESULTS_FORMAT, project.as_str()])
            .run()
            .await?;
        parse_osc_results(&project, &out)
    }

    async fn write_all_build_recipes_to_branch(
        &mut self,
        commit_message: &str,
    ) -> Result<Option<String>> {
        let worktree = self.worktree()?.to_path_buf();

        let source = self.root.join(RECIPE_DIR);
        if source.is_dir() {
            let n = copy_tree(&source, &worktree.join(RECIPE_DIR))?;
            tracing::debug!(files = n, "copied build recipes");
        } else {
            tracing::warn!(dir = %source.display(), "no recipe directory");
        }

        self.git(&worktree).args(["add", "-A"]).run().await?;
        let dirty = self
            .git(&worktree)
            .args(["diff", "--cached", "--quiet"])
            .status()
            .await?
            != 0;
        if !dirty {
            tracing::info!(branch = %self.branch_name, "nothing to commit");
            return Ok(None);
        }

        let message = if commit_message.trim().is_empty() {
            DEFAULT_COMMIT_MESSAGE
        } else {
            commit_message
        };
        self.git(&worktree)
            .args(["commit", "-m", message])
            .run()
            .await?;
        let commit = self
            .git(&worktree)
            .args(["rev-parse", "HEAD"])
            .run()
            .await?
            .trim()
            .to_string();
        self.git(&worktree)
            .args(["push", "--force", "origin"])
            .arg(format!("HEAD:refs/heads/{}", self.branch_name))
            .run()
            .await?;

        tracing::info!(commit = %commit, branch = %self.branch_name, "pushed build recipes");
        Ok(Some(commit))
    }

    async fn scratch_build(&mut self, commit_message: &str) -> Result<Option<String>> {
        let Some(commit) = self.write_all_build_recipes_to_branch(commit_message).await? else {
            return Ok(None);
        };
        self.write_pkg_configs().await?;
        self.force_rebuild().await?;
        Ok(Some(commit))
    }

    async fn remote_cleanup(&mut self, branches: bool, obs_project: bool) -> Result<()> {
        if branches {
            let code = self
                .git(&self.root)
                .args(["push", "origin", "--delete", self.branch_name.as_str()])
                .status()
                .await?;
            if code != 0 {
                tracing::warn!(branch = %self.branch_name, "remote branch not deleted");
            }
            if let Some(path) = self.worktree.take() {
                self.remove_worktree(&path).await?;
            }
            self.git(&self.root)
                .args(["branch", "-D", self.branch_name.as_str()])
                .run()
                .await?;
        }

        if obs_project {
            let project = self.project_name()?;
            self.osc()
                .args(["rdelete", "-r", "-f", "-m", "cleanup of scratch build", project.as_str()])
                .run()
                .await?;
            tracing::info!(project = %project, "deleted staging project");
        }
        self.cleaned_up = branches && obs_project;
        Ok(())
    }

    async fn wait_for_build_to_finish(
        &mut self,
        timeout_sec: Option<u64>,
    ) -> Result<BuildResultSet> {
        match timeout_sec {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), self.poll_until_finished())
                .await
                .map_err(|_| StagingError::Timeout(secs))?,
            None => self.poll_until_finished().await,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Counts consecutive result sets without any package.
#[derive(Debug, Default)]
struct EmptyPolls {
    seen: u32,
}

impl EmptyPolls {
    /// Record one poll; true once `EMPTY_POLL_LIMIT` empty polls came in a row.
    fn observe(&mut self, results: &BuildResultSet) -> bool {
        if results.is_empty() {
            self.seen += 1;
        } else {
            self.seen = 0;
        }
        self.seen >= EMPTY_POLL_LIMIT
    }
}

fn generate_branch_name(os_version: OsVersion) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(5)
        .map(char::from)
        .collect();
    format!("{}-{suffix}", os_version.branch_prefix())
}

/// `osc whois` prints `geeko: "Geeko Chameleon" <geeko@example.com>`.
fn parse_whois(out: &str) -> Option<String> {
    let user = out.lines().next()?.split(':').next()?.trim();
    (!user.is_empty()).then(|| user.to_string())
}

/// Rewrite `git@host:owner/repo.git` remotes to https for OBS scm sync.
fn https_remote_url(remote: &str) -> String {
    match remote.strip_prefix("git@") {
        Some(rest) => match rest.split_once(':') {
            Some((host, path)) => format!("https://{host}/{path}"),
            None => remote.to_string(),
        },
        None => remote.to_string(),
    }
}

fn architectures(os_version: OsVersion) -> &'static [&'static str] {
    if os_version.is_sle15() {
        &["x86_64", "aarch64", "ppc64le", "s390x"]
    } else {
        &["x86_64", "aarch64"]
    }
}

fn project_meta(project: &str, user: &str, os_version: OsVersion, branch: &str) -> String {
    let arches: String = architectures(os_version)
        .iter()
        .map(|a| format!("      <arch>{a}</arch>\n"))
        .collect();
    format!(
        r#"<project name="{project}">
  <title>Staging project for {os_version} (branch {branch})</title>
  <description>Scratch build of the container images from branch {branch}</description>
  <person userid="{user}" role="maintainer"/>
  <build><enable/></build>
  <publish><disable/></publish>
  <repository name="images">
    <path project="{base}" repository="images"/>
{arches}  </repository>
</project>
"#,
        base = os_version.base_project(),
    )
}

fn package_meta(project: &str, package: &str, remote_url: &str, branch: &str) -> String {
    format!(
        r#"<package name="{package}" project="{project}">
  <title>{package}</title>
  <description/>
  <scmsync>{remote_url}?subdir={RECIPE_DIR}/{package}#{branch}</scmsync>
</package>
"#
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
