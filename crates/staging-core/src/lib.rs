pub mod build_result;
pub mod comment;
pub mod error;
pub mod handle;
pub mod io;
pub mod session;
pub mod types;

pub use build_result::{is_build_failed, render_as_markdown, BuildResultSet};
pub use error::{Result, StagingError};
pub use handle::{SessionFactory, SessionHandle};
pub use types::{OsVersion, SessionConfig, ALL_OS_VERSIONS};
