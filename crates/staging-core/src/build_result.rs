//! Build results of a staging project on OBS.
//!
//! Results are obtained from `osc results` in csv mode with the column layout
//! given by [`OSC_RESULTS_FORMAT`], one line per package per repository and
//! architecture.

use crate::error::{Result, StagingError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `--format` argument passed to `osc results --csv`.
pub const OSC_RESULTS_FORMAT: &str =
    "%(repository)s|%(arch)s|%(package)s|%(state)s|%(dirty)s|%(code)s|%(details)s";

// ---------------------------------------------------------------------------
// PackageCode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageCode {
    Succeeded,
    Failed,
    Unresolvable,
    Broken,
    Blocked,
    Scheduled,
    Dispatching,
    Building,
    Signing,
    Finished,
    Disabled,
    Excluded,
    Locked,
    Deleting,
    Unknown(String),
}

impl PackageCode {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "succeeded" => PackageCode::Succeeded,
            "failed" => PackageCode::Failed,
            "unresolvable" => PackageCode::Unresolvable,
            "broken" => PackageCode::Broken,
            "blocked" => PackageCode::Blocked,
            "scheduled" => PackageCode::Scheduled,
            "dispatching" => PackageCode::Dispatching,
            "building" => PackageCode::Building,
            "signing" => PackageCode::Signing,
            "finished" => PackageCode::Finished,
            "disabled" => PackageCode::Disabled,
            "excluded" => PackageCode::Excluded,
            "locked" => PackageCode::Locked,
            "deleting" => PackageCode::Deleting,
            other => PackageCode::Unknown(other.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            PackageCode::Failed | PackageCode::Unresolvable | PackageCode::Broken
        )
    }

    /// The scheduler will not touch the package again without a new trigger.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            PackageCode::Succeeded
                | PackageCode::Failed
                | PackageCode::Unresolvable
                | PackageCode::Broken
                | PackageCode::Disabled
                | PackageCode::Excluded
                | PackageCode::Locked
        )
    }
}

impl fmt::Display for PackageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PackageCode::Succeeded => "succeeded",
            PackageCode::Failed => "failed",
            PackageCode::Unresolvable => "unresolvable",
            PackageCode::Broken => "broken",
            PackageCode::Blocked => "blocked",
            PackageCode::Scheduled => "scheduled",
            PackageCode::Dispatching => "dispatching",
            PackageCode::Building => "building",
            PackageCode::Signing => "signing",
            PackageCode::Finished => "finished",
            PackageCode::Disabled => "disabled",
            PackageCode::Excluded => "excluded",
            PackageCode::Locked => "locked",
            PackageCode::Deleting => "deleting",
            PackageCode::Unknown(raw) => raw,
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageResult {
    pub name: String,
    pub code: PackageCode,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryResult {
    pub repository: String,
    pub arch: String,
    pub state: String,
    pub dirty: bool,
    pub packages: Vec<PackageResult>,
}

impl RepositoryResult {
    fn is_finished(&self) -> bool {
        const FINAL_STATES: [&str; 4] = ["published", "unpublished", "finished", "broken"];
        !self.dirty
            && FINAL_STATES.contains(&self.state.as_str())
            && self.packages.iter().all(|p| p.code.is_final())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResultSet {
    pub project: String,
    pub repositories: Vec<RepositoryResult>,
}

impl BuildResultSet {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            repositories: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.iter().all(|r| r.packages.is_empty())
    }

    /// Every repository settled and every package in a final state.
    pub fn is_finished(&self) -> bool {
        !self.repositories.is_empty() && self.repositories.iter().all(|r| r.is_finished())
    }

    pub fn packages(&self) -> impl Iterator<Item = (&RepositoryResult, &PackageResult)> {
        self.repositories
            .iter()
            .flat_map(|r| r.packages.iter().map(move |p| (r, p)))
    }
}

/// True when at least one package failed to build.
pub fn is_build_failed(results: &BuildResultSet) -> bool {
    results.packages().any(|(_, p)| p.code.is_failure())
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse `osc results --csv --format OSC_RESULTS_FORMAT` output.
pub fn parse_osc_results(project: &str, text: &str) -> Result<BuildResultSet> {
    let mut set = BuildResultSet::new(project);

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        let cols: Vec<&str> = line.splitn(7, '|').collect();
        let [repository, arch, package, state, dirty, code, rest @ ..] = cols.as_slice() else {
            return Err(StagingError::ResultParse(format!(
                "line {}: expected 7 '|' separated columns, got '{line}'",
                lineno + 1
            )));
        };
        let details = rest.first().map(|d| d.trim()).unwrap_or_default();
        let dirty = parse_bool(dirty).ok_or_else(|| {
            StagingError::ResultParse(format!("line {}: invalid dirty flag '{dirty}'", lineno + 1))
        })?;

        let idx = match set
            .repositories
            .iter()
            .position(|r| r.repository == *repository && r.arch == *arch)
        {
            Some(idx) => idx,
            None => {
                set.repositories.push(RepositoryResult {
                    repository: repository.to_string(),
                    arch: arch.to_string(),
                    state: state.to_string(),
                    dirty,
                    packages: Vec::new(),
                });
                set.repositories.len() - 1
            }
        };
        let repo = &mut set.repositories[idx];
        repo.dirty |= dirty;
        repo.packages.push(PackageResult {
            name: package.to_string(),
            code: PackageCode::parse(code),
            details: details.to_string(),
        });
    }

    Ok(set)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "0" | "no" => Some(false),
        "true" | "1" | "yes" => Some(true),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Markdown
// ---------------------------------------------------------------------------

/// Render the build results as a markdown table suitable for a review comment.
pub fn render_as_markdown(results: &BuildResultSet) -> String {
    let mut out = format!("### Build results for `{}`\n\n", results.project);

    if results.is_empty() {
        out.push_str("No build results available.\n");
        return out;
    }

    let failed = results.packages().filter(|(_, p)| p.code.is_failure()).count();
    let total = results.packages().count();
    let summary = if failed > 0 {
        format!("**{failed} of {total} builds failed.**")
    } else if results.is_finished() {
        format!("All {total} builds succeeded.")
    } else {
        format!("{total} builds, still in progress.")
    };
    out.push_str(&summary);
    out.push_str("\n\n");

    out.push_str("| Package | Repository | Architecture | Result |\n");
    out.push_str("| --- | --- | --- | --- |\n");
    for (repo, pkg) in results.packages() {
        let result = if pkg.details.is_empty() {
            pkg.code.to_string()
        } else {
            format!("{}: {}", pkg.code, escape_cell(&pkg.details))
        };
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            pkg.name, repo.repository, repo.arch, result
        ));
    }
    out
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}
