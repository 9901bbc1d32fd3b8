//! Command front end for a scratch-build staging session.
//!
//! ```text
//! ConfigArgs ──resolve──▶ ConfigSource ──acquire──▶ SessionHandle
//!                                                     │
//!                      Lifecycle::run ── setup ───────┤
//!                                        dispatch ────┤ ──render──▶ stdout
//!                                        teardown ────┘
//! ```

pub mod action;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod render;

#[cfg(test)]
pub(crate) mod testing;

pub use action::{Action, ActionId, ActionOutput};
pub use config::{ConfigArgs, ConfigSource};
pub use error::{ConfigError, RunError};
pub use lifecycle::Lifecycle;
pub use logging::LogConfig;
