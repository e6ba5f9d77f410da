//! Tower middleware serving PDF versions of HTML pages.
//!
//! Wrap any HTTP service in a [`PdfLayer`] and a request for `/invoice/42.pdf`
//! is answered by asking the inner service for `/invoice/42`, then rendering
//! the HTML it returns with WeasyPrint:
//!
//! 1. The request path is classified against the layer's [`Conditions`].
//! 2. Matching requests are rewritten: `.pdf` is stripped, `text/html` goes to
//!    the front of `Accept`, and a [`RenderSession`] is attached.
//! 3. HTML responses have their root-relative `href`/`src` attributes made
//!    absolute, are rendered, and are returned as `application/pdf`.
//!
//! Anything else passes through untouched. Render failures surface as the
//! service's error; nothing falls back to serving the HTML.

pub mod error;
mod rewrite;
mod rules;
mod service;
mod session;
mod transform;
mod translate;

pub use crate::rules::{Conditions, PATTERN_PREFIX, PDF_SUFFIX, Rule};
pub use crate::service::{PdfLayer, PdfService};
pub use crate::session::{MountPoint, OriginalUri, RenderSession};
pub use crate::transform::{PdfBody, SAVE_PDF_HEADER};
pub use crate::translate::translate_paths;
