use crate::rules::PDF_SUFFIX;
use crate::session::{MountPoint, OriginalUri, RenderSession};
use http::header::{ACCEPT, HeaderValue};
use http::uri::PathAndQuery;
use http::{Request, Uri};

const HTML: &str = "text/html";

/// Turns a `.pdf` request into a request for the HTML page behind it.
///
/// The `.pdf` suffix and any [`MountPoint`] prefix are stripped from the
/// path, `text/html` is put at the front of `Accept`, and the original URI is
/// kept in an [`OriginalUri`] extension. When the new URI cannot be built the
/// request is left exactly as it was and the session does not render.
pub(crate) fn rewrite_request<B>(request: &mut Request<B>, session: &mut RenderSession) {
    let original = request.uri().clone();
    let path = stripped_path(original.path(), request.extensions().get::<MountPoint>());
    let path_and_query = match original.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.clone(),
    };
    let Some(uri) = rebuild_uri(&original, &path_and_query) else {
        tracing::warn!(path = %path_and_query, "Could not rebuild request URI; passing the request through");
        return;
    };
    tracing::debug!(from = %original.path(), to = %path, "Rewrote PDF request");
    *request.uri_mut() = uri;
    session.rendering = true;
    session.path = path;
    request.extensions_mut().insert(OriginalUri(original));

    let accept = match request.headers().get_all(ACCEPT).iter().filter_map(|v| v.to_str().ok()).collect::<Vec<_>>() {
        existing if existing.is_empty() => HTML.to_string(),
        existing => format!("{HTML},{}", existing.join(",")),
    };
    match HeaderValue::from_str(&accept) {
        Ok(value) => {
            request.headers_mut().insert(ACCEPT, value);
        },
        Err(_) => {
            request.headers_mut().insert(ACCEPT, HeaderValue::from_static(HTML));
        },
    }
}

/// Drops `.pdf`, then the mount prefix when it covers whole path segments:
/// `/app` is stripped from `/app/x` and `/app` but not from `/application`.
fn stripped_path(path: &str, mount: Option<&MountPoint>) -> String {
    let path = path.strip_suffix(PDF_SUFFIX).unwrap_or(path);
    let prefix = mount.map_or("", |MountPoint(prefix)| prefix.trim_end_matches('/'));
    let path = match path.strip_prefix(prefix) {
        Some(rest) if !prefix.is_empty() && (rest.is_empty() || rest.starts_with('/')) => rest,
        _ => path,
    };
    if path.is_empty() { "/".to_string() } else { path.to_string() }
}

fn rebuild_uri(original: &Uri, path_and_query: &str) -> Option<Uri> {
    let mut parts = original.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}
