//! Per-request state shared between the request and response halves of the
//! middleware.

use http::header::HOST;
use http::{Request, Uri};

/// Marker attached to the request extensions of every request passing
/// through the middleware, rendered or not. Downstream handlers tell a PDF
/// render from a normal page view by [`rendering`](Self::rendering), which
/// is `false` for pass-through requests. Each request gets its own session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSession {
    /// The response will be converted to PDF.
    pub rendering: bool,
    /// `ETag` and `Cache-Control` survive the conversion.
    pub caching: bool,
    /// Request scheme, `http` when the URI does not carry one.
    pub scheme: String,
    /// Request host (with port, if any), from the `Host` header or the URI.
    pub host: Option<String>,
    /// The path as the host application will see it (after rewriting).
    pub path: String,
}

impl RenderSession {
    pub(crate) fn new<B>(request: &Request<B>, caching: bool) -> Self {
        Self {
            rendering: false,
            caching,
            scheme: request.uri().scheme_str().unwrap_or("http").to_string(),
            host: host(request),
            path: request.uri().path().to_string(),
        }
    }

    /// Root URL for relative asset paths: the configured one, otherwise the
    /// request's own `scheme://host/`.
    pub fn root_url(&self, configured: Option<&str>) -> String {
        match (configured, &self.host) {
            (Some(root), _) => root.to_string(),
            (None, Some(host)) => format!("{}://{host}/", self.scheme),
            (None, None) => "/".to_string(),
        }
    }
}

/// Path prefix under which the host application is mounted (the CGI
/// `SCRIPT_NAME`). Insert it into the request extensions ahead of the
/// middleware when the application lives below `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint(pub String);

/// The request URI as it arrived, before any `.pdf` rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalUri(pub Uri);

fn host<B>(request: &Request<B>) -> Option<String> {
    request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|authority| authority.to_string()))
}
