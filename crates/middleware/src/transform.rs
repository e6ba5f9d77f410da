use crate::error::{ErrorKind, Result};
use crate::session::RenderSession;
use crate::translate::translate_paths;
use bytes::Bytes;
use exn::ResultExt;
use http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG, HeaderMap, HeaderName, HeaderValue};
use http::Response;
use http_body::Body;
use http_body_util::{BodyExt, Either, Full};
use paperboy_render::{Renderer, Source};
use regex::Regex;
use std::sync::LazyLock;
use tower::BoxError;
use tracing::instrument;

/// Response header naming a file the rendered PDF should also be written to.
/// Never sent to the client.
pub const SAVE_PDF_HEADER: HeaderName = HeaderName::from_static("paperboy-save-pdf");

static HTML_CONTENT_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)text/html|application/xhtml\+xml").unwrap());

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Body of every response leaving the middleware: the downstream body when
/// passed through untouched, or the rendered PDF.
pub type PdfBody<B> = Either<B, Full<Bytes>>;

fn is_html(headers: &HeaderMap) -> bool {
    headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok()).is_some_and(|ct| HTML_CONTENT_TYPE.is_match(ct))
}

/// Replaces an HTML response with its PDF rendering when the session asked
/// for one. Everything else passes through without being buffered.
#[instrument(skip_all, fields(path = %session.path))]
pub(crate) async fn transform_response<B>(
    response: Response<B>,
    session: &RenderSession,
    renderer: &Renderer,
    root_url: Option<&str>,
) -> Result<Response<PdfBody<B>>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    if !session.rendering || !is_html(response.headers()) {
        return Ok(response.map(Either::Left));
    }

    let (mut parts, body) = response.into_parts();
    let html = body.collect().await.map_err(|e| ErrorKind::Body(Into::<BoxError>::into(e).to_string()))?.to_bytes();
    let root = session.root_url(root_url);
    // Left undecoded; WeasyPrint reads the charset from the markup itself.
    let html = translate_paths(&html, &root).into_owned();

    let renderer = renderer.clone();
    let pdf = tokio::task::spawn_blocking(move || renderer.to_pdf(Source::Html(html)))
        .await
        .or_raise(|| ErrorKind::Task)?
        .map_err(ErrorKind::render)?;
    tracing::info!(bytes = pdf.len(), root = %root, "Rendered HTML response as PDF");

    if let Some(target) = parts.headers.remove(SAVE_PDF_HEADER) {
        save(&target, &pdf).await;
    }
    if !session.caching {
        parts.headers.remove(ETAG);
        parts.headers.remove(CACHE_CONTROL);
    }
    parts.headers.insert(CONTENT_TYPE, HeaderValue::from_static(PDF_CONTENT_TYPE));
    parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(pdf.len()));
    Ok(Response::from_parts(parts, Either::Right(Full::new(Bytes::from(pdf)))))
}

/// Best effort: failures are logged and otherwise ignored.
async fn save(target: &HeaderValue, pdf: &[u8]) {
    let Ok(path) = target.to_str() else {
        tracing::warn!(header = ?target, "Ignoring non-UTF-8 save path");
        return;
    };
    match tokio::fs::write(path, pdf).await {
        Ok(()) => tracing::debug!(path, bytes = pdf.len(), "Saved rendered PDF"),
        Err(e) => tracing::warn!(path, error = %e, "Failed to save rendered PDF"),
    }
}
