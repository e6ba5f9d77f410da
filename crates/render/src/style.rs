//! CSS style management for rendered documents.
//!
//! Styles are assembled through [`StyleConfig`]'s builder API, combining
//! stylesheet files with raw CSS content. Files are read eagerly at
//! construction time so that missing files fail fast rather than at render
//! time.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fmt::Write;
use std::path::Path;

enum Style {
    // The path is kept only for logging; content was read at construction.
    Stylesheet { path: String, content: String },
    Inline(String),
}
impl Style {
    fn content(&self) -> &str {
        match self {
            Self::Stylesheet { content, .. } | Self::Inline(content) => content,
        }
    }
}

/// An ordered collection of CSS blocks to inject into HTML sources.
///
/// Styles are applied in insertion order, so later styles override earlier
/// ones. Stylesheet files come before inline styles regardless of the order
/// in which they were added.
///
/// # Example
///
/// ```no_run
/// use paperboy_render::StyleConfig;
/// # use paperboy_render::error::Result;
///
/// # fn get_styles() -> Result<StyleConfig> {
/// let styles = StyleConfig::new()
///     .with_file("/path/to/print.css")?
///     .with_content("body { font-size: 11pt; }");
/// # Ok(styles)
/// # }
/// ```
#[derive(Default)]
pub struct StyleConfig {
    stylesheets: Vec<Style>,
    inline: Vec<Style>,
}
impl StyleConfig {
    /// Creates an empty style configuration with no stylesheets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stylesheet read from a file on disk.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            exn::bail!(ErrorKind::StylesheetNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path).or_raise(|| ErrorKind::Io)?;
        self.stylesheets.push(Style::Stylesheet { path: path.display().to_string(), content });
        Ok(self)
    }

    /// Appends raw CSS content. This is infallible since no I/O is involved.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.inline.push(Style::Inline(content.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.stylesheets.is_empty() && self.inline.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stylesheets.len() + self.inline.len()
    }

    /// Writes each style into its own `<style>` block.
    fn blocks(&self) -> String {
        let mut out = String::new();
        for style in self.stylesheets.iter().chain(&self.inline) {
            if let Style::Stylesheet { path, .. } = style {
                tracing::trace!(path = %path, "Injecting stylesheet");
            }
            // Infallible: writing to a String.
            let _ = write!(out, "<style>{}</style>", style.content());
        }
        out
    }

    /// Injects every style into `html`: immediately before the closing head
    /// tag when there is one, otherwise at the very start of the document.
    /// The markup itself is never decoded.
    pub(crate) fn inject(&self, html: &[u8]) -> Vec<u8> {
        if self.is_empty() {
            return html.to_vec();
        }
        let blocks = self.blocks();
        const NEEDLE: &[u8] = b"</head";
        let position = html.windows(NEEDLE.len()).position(|w| w.eq_ignore_ascii_case(NEEDLE));
        let pos = match position {
            Some(pos) => {
                tracing::debug!(position = pos, blocks = self.len(), "Custom CSS injected into HTML");
                pos
            },
            None => {
                tracing::debug!(blocks = self.len(), "Closing head tag not found; prepending custom CSS");
                0
            },
        };
        let mut out = Vec::with_capacity(html.len() + blocks.len());
        out.extend_from_slice(&html[..pos]);
        out.extend_from_slice(blocks.as_bytes());
        out.extend_from_slice(&html[pos..]);
        out
    }
}
