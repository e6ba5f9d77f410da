//! Render Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A render error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for render operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The WeasyPrint executable could not be located. Install it, or point
    /// the configuration at the right path.
    #[display("no weasyprint executable found at {_0}")]
    ExecutableNotFound(#[error(not(source))] String),
    /// The requested operation does not make sense for this kind of source
    /// (e.g. stylesheets attached to a URL).
    #[display("improper source: {_0}")]
    ImproperSource(#[error(not(source))] String),
    /// WeasyPrint exited unsuccessfully. `status` is `None` when the process
    /// was killed by a signal.
    #[display("command failed (exitstatus={}): {command}", status.map_or_else(|| "none".to_string(), |s| s.to_string()))]
    Failed {
        /// Exit code of the process, if it exited normally.
        status: Option<i32>,
        /// The command line that was executed, for diagnostics.
        command: String,
    },
    /// WeasyPrint exited successfully but produced too little output to be
    /// a PDF document.
    #[display("rendered output too small to be a PDF ({_0} bytes)")]
    OutputTooSmall(#[error(not(source))] usize),
    /// A stylesheet file could not be loaded.
    #[display("stylesheet not found: {_0}")]
    StylesheetNotFound(#[error(not(source))] String),
    /// Spawning the process, or moving data in or out of it, failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io | Self::Failed { .. })
    }
}
