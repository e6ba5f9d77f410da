//! Thin wrapper around the WeasyPrint executable.
//!
//! A [`Renderer`] pairs a located [`Executable`] with default [`Options`] and
//! optional [`StyleConfig`], and turns a [`Source`] (HTML markup, a URL or a
//! file) into PDF bytes:
//!
//! ```no_run
//! use paperboy_render::{Options, Renderer};
//! # use paperboy_render::error::Result;
//!
//! # fn example() -> Result<()> {
//! let options = Options::new().with("presentational_hints", true);
//! let renderer = Renderer::discover("weasyprint", options)?;
//! let pdf = renderer.to_pdf("<h1>Hello</h1>")?;
//! assert!(pdf.starts_with(b"%PDF"));
//! # Ok(())
//! # }
//! ```
//!
//! Rendering is synchronous: the calling thread waits for WeasyPrint to exit.
//! There is no timeout.

pub mod error;
mod executable;
#[cfg(all(unix, any(test, feature = "mock")))]
pub mod mock;
mod options;
mod render;
mod source;
mod style;

use crate::error::Result;
pub use crate::executable::{DEFAULT_EXECUTABLE, Executable};
pub use crate::options::{OptionValue, Options, normalize_name};
pub use crate::render::{Command, MINIMUM_PDF_SIZE};
pub use crate::source::Source;
pub use crate::style::StyleConfig;
use std::path::Path;
use std::sync::Arc;

/// WeasyPrint, plus everything needed to call it the same way every time.
///
/// Cheap to clone; styles are shared.
#[derive(Clone)]
pub struct Renderer {
    executable: Executable,
    options: Options,
    styles: Arc<StyleConfig>,
}
impl Renderer {
    pub fn new(executable: Executable, options: Options) -> Self {
        Self { executable, options, styles: Arc::new(StyleConfig::new()) }
    }

    /// Locates `executable` (see [`Executable::discover`]) and fails fast if
    /// it is missing.
    pub fn discover(executable: impl AsRef<Path>, options: Options) -> Result<Self> {
        Ok(Self::new(Executable::discover(executable)?, options))
    }

    pub fn with_styles(mut self, styles: StyleConfig) -> Self {
        self.styles = Arc::new(styles);
        self
    }

    /// A copy of this renderer with `overrides` merged over its options.
    pub fn with_options(&self, overrides: &Options) -> Self {
        Self { options: self.options.clone().merge(overrides), ..self.clone() }
    }

    pub fn executable(&self) -> &Executable {
        &self.executable
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("executable", &self.executable)
            .field("options", &self.options)
            .field("styles", &self.styles.len())
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::mock::FakeWeasyPrint;

    #[test]
    fn per_render_overrides_merge_over_defaults() {
        let fake = FakeWeasyPrint::new();
        let renderer = Renderer::new(fake.executable(), Options::new().with("encoding", "utf-8").with("dpi", 96_i64));
        let custom = renderer.with_options(&Options::new().with("dpi", 300_i64));
        assert_eq!(custom.options().to_args(), ["--encoding", "utf-8", "--dpi", "300"]);
        // The original is left alone.
        assert_eq!(renderer.options().to_args(), ["--encoding", "utf-8", "--dpi", "96"]);
    }
}
