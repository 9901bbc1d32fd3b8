use crate::error::{Result, StagingError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// OsVersion
// ---------------------------------------------------------------------------

/// Operating system release the container images are built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OsVersion {
    Sp5,
    Sp6,
    Sp7,
    Sle16_0,
    Tumbleweed,
}

pub const ALL_OS_VERSIONS: [OsVersion; 5] = [
    OsVersion::Sp5,
    OsVersion::Sp6,
    OsVersion::Sp7,
    OsVersion::Sle16_0,
    OsVersion::Tumbleweed,
];

impl OsVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsVersion::Sp5 => "5",
            OsVersion::Sp6 => "6",
            OsVersion::Sp7 => "7",
            OsVersion::Sle16_0 => "16.0",
            OsVersion::Tumbleweed => "Tumbleweed",
        }
    }

    /// Suffix of the staging project name on OBS.
    pub fn project_suffix(&self) -> &'static str {
        match self {
            OsVersion::Sp5 => "SLE-15-SP5",
            OsVersion::Sp6 => "SLE-15-SP6",
            OsVersion::Sp7 => "SLE-15-SP7",
            OsVersion::Sle16_0 => "SLE-16.0",
            OsVersion::Tumbleweed => "openSUSE-Tumbleweed",
        }
    }

    /// Prefix for auto-generated branch names.
    pub fn branch_prefix(&self) -> &'static str {
        match self {
            OsVersion::Sp5 => "sle15-sp5",
            OsVersion::Sp6 => "sle15-sp6",
            OsVersion::Sp7 => "sle15-sp7",
            OsVersion::Sle16_0 => "sle16.0",
            OsVersion::Tumbleweed => "tumbleweed",
        }
    }

    /// Project whose `images` repository the staging project builds against.
    pub fn base_project(&self) -> &'static str {
        match self {
            OsVersion::Sp5 => "SUSE:SLE-15-SP5:Update",
            OsVersion::Sp6 => "SUSE:SLE-15-SP6:Update",
            OsVersion::Sp7 => "SUSE:SLE-15-SP7:Update",
            OsVersion::Sle16_0 => "SUSE:SLFO:Products:SLES:16.0",
            OsVersion::Tumbleweed => "openSUSE:Factory",
        }
    }

    pub fn is_sle15(&self) -> bool {
        matches!(self, OsVersion::Sp5 | OsVersion::Sp6 | OsVersion::Sp7)
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OsVersion {
    type Err = StagingError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        ALL_OS_VERSIONS
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| StagingError::InvalidOsVersion(s.to_string()))
    }
}

impl TryFrom<String> for OsVersion {
    type Error = StagingError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<OsVersion> for String {
    fn from(v: OsVersion) -> Self {
        v.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Parameters a staging session is built from.
///
/// An empty `branch_name` asks the session to generate one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub os_version: OsVersion,
    pub branch_name: String,
    pub osc_username: Option<String>,
}

impl SessionConfig {
    pub fn new(os_version: OsVersion) -> Self {
        Self {
            os_version,
            branch_name: String::new(),
            osc_username: None,
        }
    }

    pub fn with_branch(mut self, branch_name: impl Into<String>) -> Self {
        self.branch_name = branch_name.into();
        self
    }

    pub fn with_username(mut self, osc_username: Option<String>) -> Self {
        self.osc_username = osc_username.filter(|u| !u.trim().is_empty());
        self
    }
}
