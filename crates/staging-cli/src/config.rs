use staging_core::{OsVersion, SessionConfig, SessionFactory};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::ConfigError;

/// Raw configuration inputs as given on the command line or environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigArgs {
    pub load: bool,
    pub from_stdin: bool,
    pub os_version: Option<String>,
    pub branch_name: Option<String>,
    pub osc_username: Option<String>,
}

/// Exactly one of the three ways a session gets its configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Reload the session persisted by a previous run.
    Load,
    /// Parse a review comment read from stdin, acting as the given user.
    Stdin { osc_username: Option<String> },
    Explicit(SessionConfig),
}

impl ConfigSource {
    /// Pick the configuration mode and validate the explicit parameters.
    ///
    /// Runs before any asynchronous work; a returned error means no handle
    /// will be constructed.
    pub fn resolve(args: ConfigArgs) -> Result<Self, ConfigError> {
        let osc_username = args.osc_username.filter(|u| !u.trim().is_empty());
        match (args.load, args.from_stdin) {
            (true, true) => Err(ConfigError::ConflictingSources),
            (true, false) => Ok(ConfigSource::Load),
            (false, true) => Ok(ConfigSource::Stdin { osc_username }),
            (false, false) => {
                let raw = args
                    .os_version
                    .filter(|v| !v.trim().is_empty())
                    .ok_or(ConfigError::MissingOsVersion)?;
                let os_version: OsVersion =
                    raw.parse().map_err(ConfigError::InvalidOsVersion)?;
                Ok(ConfigSource::Explicit(
                    SessionConfig::new(os_version)
                        .with_branch(args.branch_name.unwrap_or_default())
                        .with_username(osc_username),
                ))
            }
        }
    }
}

/// Construct the session handle through the factory path `source` selects.
///
/// `stdin` is only read in [`ConfigSource::Stdin`] mode.
pub async fn acquire<F, R>(
    factory: &F,
    source: ConfigSource,
    mut stdin: R,
) -> Result<F::Handle, ConfigError>
where
    F: SessionFactory,
    R: AsyncRead + Unpin,
{
    let handle = match source {
        ConfigSource::Load => factory.from_session_file().await,
        ConfigSource::Stdin { osc_username } => {
            let mut text = String::new();
            stdin
                .read_to_string(&mut text)
                .await
                .map_err(ConfigError::Stdin)?;
            tracing::debug!(bytes = text.len(), "read review comment from stdin");
            factory.from_review_comment(&text, osc_username)
        }
        ConfigSource::Explicit(config) => factory.from_parameters(config),
    };
    handle.map_err(ConfigError::Acquire)
}
