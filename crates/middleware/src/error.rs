//! Middleware Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Errors leaving the [`tower::Service`]
//! are flattened into a [`BoxError`] so the host framework can turn them into
//! its usual 500 response.

use derive_more::{Display, Error};
use paperboy_render::error::{Error as RenderError, ErrorKind as RenderErrorKind};
use tower::BoxError;

/// A middleware error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for middleware operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A path rule could not be parsed (usually an invalid regex).
    #[display("invalid path rule: {_0}")]
    InvalidRule(#[error(not(source))] String),
    /// The renderer could not be set up from configuration.
    #[display("renderer is not configured correctly")]
    Configuration,
    /// WeasyPrint failed to render the HTML response.
    #[display("failed to render PDF: {_0}")]
    Render(RenderErrorKind),
    /// The downstream response body could not be read to the end.
    #[display("failed to read response body: {_0}")]
    Body(#[error(not(source))] String),
    /// The blocking render task panicked or was cancelled.
    #[display("render task did not complete")]
    Task,
}

impl ErrorKind {
    /// Convert a render error into a middleware error, preserving the render
    /// crate's `Exn` frame (error tree) as a child in its own error tree.
    #[track_caller]
    pub fn render(err: RenderError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Render(inner))
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Render(inner) => inner.is_retryable(),
            Self::Body(_) | Self::Task => true,
            Self::InvalidRule(_) | Self::Configuration => false,
        }
    }
}

/// Logs the whole error tree, then hands the top-level error to tower.
pub(crate) fn into_box_error(err: Error) -> BoxError {
    tracing::error!(error = ?err, "Failed to serve PDF response");
    Box::new((*err).clone())
}
