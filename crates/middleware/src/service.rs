use crate::error::{ErrorKind, Result, into_box_error};
use crate::rewrite::rewrite_request;
use crate::rules::{Conditions, Rule};
use crate::session::RenderSession;
use crate::transform::{PdfBody, transform_response};
use bytes::Bytes;
use exn::ResultExt;
use futures::future::BoxFuture;
use http::{Request, Response};
use http_body::Body;
use paperboy_config::Config;
use paperboy_render::Renderer;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{BoxError, Layer, Service};

#[derive(Debug, Clone)]
struct Shared {
    renderer: Renderer,
    conditions: Conditions,
    root_url: Option<String>,
    caching: bool,
}

/// Serves `<page>.pdf` by requesting `<page>` from the wrapped service and
/// rendering the HTML it returns.
///
/// ```no_run
/// use paperboy_middleware::PdfLayer;
/// use paperboy_render::{Options, Renderer};
///
/// # fn example() -> paperboy_render::error::Result<()> {
/// let renderer = Renderer::discover("weasyprint", Options::new().with("presentational_hints", true))?;
/// let layer = PdfLayer::new(renderer).only(["/invoices", "/reports"]).caching(true);
/// # let _ = layer;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PdfLayer {
    shared: Arc<Shared>,
}

impl PdfLayer {
    /// Renders every `.pdf` request, with caching headers stripped and asset
    /// URLs resolved against the request's own host.
    pub fn new(renderer: Renderer) -> Self {
        Self { shared: Arc::new(Shared { renderer, conditions: Conditions::Always, root_url: None, caching: false }) }
    }

    /// Locates WeasyPrint and parses the path rules from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let renderer = Renderer::discover(&config.executable, config.renderer_options())
            .or_raise(|| ErrorKind::Configuration)?;
        let conditions = Conditions::parse(&config.only, &config.except)?;
        let mut layer = Self::new(renderer).conditions(conditions).caching(config.caching);
        if let Some(root) = &config.root_url {
            layer = layer.root_url(root);
        }
        Ok(layer)
    }

    pub fn conditions(mut self, conditions: Conditions) -> Self {
        Arc::make_mut(&mut self.shared).conditions = conditions;
        self
    }

    /// Only render paths matching one of `rules`. Replaces any `except` rules.
    pub fn only<R: Into<Rule>>(self, rules: impl IntoIterator<Item = R>) -> Self {
        let rules: Vec<Rule> = rules.into_iter().map(Into::into).collect();
        if rules.is_empty() {
            return self;
        }
        self.conditions(Conditions::Only(rules))
    }

    /// Render every path except those matching one of `rules`. Has no effect
    /// once `only` rules are set.
    pub fn except<R: Into<Rule>>(self, rules: impl IntoIterator<Item = R>) -> Self {
        let rules: Vec<Rule> = rules.into_iter().map(Into::into).collect();
        if rules.is_empty() {
            return self;
        }
        if let Conditions::Only(_) = self.shared.conditions {
            tracing::debug!("Ignoring `except` rules; `only` rules take precedence");
            return self;
        }
        self.conditions(Conditions::Except(rules))
    }

    /// Root URL for root-relative asset paths, instead of the request's own
    /// scheme and host. Must end with `/`.
    pub fn root_url(mut self, root: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.shared).root_url = Some(root.into());
        self
    }

    /// Keep `ETag` and `Cache-Control` on rendered PDFs.
    pub fn caching(mut self, caching: bool) -> Self {
        Arc::make_mut(&mut self.shared).caching = caching;
        self
    }
}

impl<S> Layer<S> for PdfLayer {
    type Service = PdfService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PdfService { inner, shared: Arc::clone(&self.shared) }
    }
}

/// See [`PdfLayer`].
#[derive(Debug, Clone)]
pub struct PdfService<S> {
    inner: S,
    shared: Arc<Shared>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for PdfService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
    ResBody: Body<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    type Response = Response<PdfBody<ResBody>>;
    type Error = BoxError;
    type Future = BoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        let mut session = RenderSession::new(&request, self.shared.caching);
        if self.shared.conditions.should_render(request.uri().path()) {
            rewrite_request(&mut request, &mut session);
        }
        request.extensions_mut().insert(session.clone());

        let response = self.inner.call(request);
        let shared = Arc::clone(&self.shared);
        Box::pin(async move {
            let response = response.await.map_err(Into::<BoxError>::into)?;
            transform_response(response, &session, &shared.renderer, shared.root_url.as_deref())
                .await
                .map_err(into_box_error)
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::session::MountPoint;
    use crate::transform::SAVE_PDF_HEADER;
    use http::StatusCode;
    use http::header::{ACCEPT, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG};
    use http_body_util::{BodyExt, Full};
    use paperboy_render::Options;
    use paperboy_render::mock::FakeWeasyPrint;
    use std::convert::Infallible;
    use std::sync::Mutex;
    use tower::{ServiceExt, service_fn};

    type Seen = Arc<Mutex<Vec<(String, Option<RenderSession>)>>>;

    /// Returns `Hello world!` as HTML for any path, with caching headers and
    /// optionally a save header, and records what it was asked for.
    fn app(
        seen: Seen,
        save_to: Option<String>,
    ) -> impl Service<Request<()>, Response = Response<Full<Bytes>>, Error = Infallible, Future: Send + 'static> + Clone {
        service_fn(move |request: Request<()>| {
            let seen = Arc::clone(&seen);
            let save_to = save_to.clone();
            async move {
                let session = request.extensions().get::<RenderSession>().cloned();
                seen.lock().unwrap().push((request.uri().to_string(), session));
                let mut response = Response::builder()
                    .status(StatusCode::OK)
                    .header(CONTENT_TYPE, "text/html")
                    .header(ETAG, "\"v1\"")
                    .header(CACHE_CONTROL, "public, max-age=600");
                if let Some(path) = save_to {
                    response = response.header(SAVE_PDF_HEADER, path);
                }
                Ok::<_, Infallible>(response.body(Full::new(Bytes::from_static(b"Hello world!"))).unwrap())
            }
        })
    }

    fn get(uri: &str) -> Request<()> {
        Request::get(uri).header("host", "example.com").body(()).unwrap()
    }

    async fn body(response: Response<PdfBody<Full<Bytes>>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn pdf_requests_are_rendered() {
        let fake = FakeWeasyPrint::new();
        let seen = Seen::default();
        let service = PdfLayer::new(Renderer::new(fake.executable(), Options::new())).layer(app(seen.clone(), None));

        let response = service.oneshot(get("/public/test.pdf")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/pdf");
        let length: usize = response.headers()[CONTENT_LENGTH].to_str().unwrap().parse().unwrap();
        let pdf = body(response).await;
        assert_eq!(pdf.len(), length);
        assert!(pdf.starts_with(b"%PDF"));
        assert!(String::from_utf8_lossy(&pdf).contains("Hello world!"));
        assert_eq!(seen.lock().unwrap()[0].0, "/public/test");
    }

    #[tokio::test]
    async fn other_requests_pass_through() {
        let fake = FakeWeasyPrint::new();
        let seen = Seen::default();
        let service = PdfLayer::new(Renderer::new(fake.executable(), Options::new())).layer(app(seen.clone(), None));

        let response = service.oneshot(get("/public/test.txt")).await.unwrap();
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html");
        assert_eq!(response.headers()[ETAG], "\"v1\"");
        assert_eq!(body(response).await, "Hello world!");
        assert_eq!(seen.lock().unwrap()[0].0, "/public/test.txt");
    }

    #[tokio::test]
    async fn rules_decide_what_is_rendered() {
        let fake = FakeWeasyPrint::new();
        let seen = Seen::default();
        let layer = PdfLayer::new(Renderer::new(fake.executable(), Options::new())).except(["/secret"]);

        let response = layer.layer(app(seen.clone(), None)).oneshot(get("/secret/test.pdf")).await.unwrap();
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html");
        let response = layer.layer(app(seen.clone(), None)).oneshot(get("/public/test.pdf")).await.unwrap();
        assert_eq!(response.headers()[CONTENT_TYPE], "application/pdf");

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, "/secret/test.pdf");
        assert_eq!(seen[1].0, "/public/test");
    }

    #[test]
    fn only_wins_over_except() {
        let fake = FakeWeasyPrint::new();
        let layer = PdfLayer::new(Renderer::new(fake.executable(), Options::new())).only(["/public"]).except(["/x"]);
        assert!(matches!(layer.shared.conditions, Conditions::Only(_)));
        let layer = PdfLayer::new(Renderer::new(fake.executable(), Options::new())).except(["/x"]).only(["/public"]);
        assert!(matches!(layer.shared.conditions, Conditions::Only(_)));
    }

    #[tokio::test]
    async fn caching_headers_are_kept_when_enabled() {
        let fake = FakeWeasyPrint::new();
        let layer = PdfLayer::new(Renderer::new(fake.executable(), Options::new()));

        let response = layer.layer(app(Seen::default(), None)).oneshot(get("/test.pdf")).await.unwrap();
        assert!(response.headers().get(ETAG).is_none());
        assert!(response.headers().get(CACHE_CONTROL).is_none());

        let response = layer.caching(true).layer(app(Seen::default(), None)).oneshot(get("/test.pdf")).await.unwrap();
        assert_eq!(response.headers()[ETAG], "\"v1\"");
        assert_eq!(response.headers()[CACHE_CONTROL], "public, max-age=600");
    }

    #[tokio::test]
    async fn save_header_writes_the_pdf() {
        let fake = FakeWeasyPrint::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.pdf");
        let service = PdfLayer::new(Renderer::new(fake.executable(), Options::new()))
            .layer(app(Seen::default(), Some(path.display().to_string())));

        let response = service.oneshot(get("/test.pdf")).await.unwrap();
        assert!(response.headers().get(SAVE_PDF_HEADER).is_none());
        let pdf = body(response).await;
        assert_eq!(std::fs::read(&path).unwrap(), pdf);
    }

    #[tokio::test]
    async fn unwritable_save_path_is_ignored() {
        let fake = FakeWeasyPrint::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("test.pdf");
        let service = PdfLayer::new(Renderer::new(fake.executable(), Options::new()))
            .layer(app(Seen::default(), Some(path.display().to_string())));

        let response = service.oneshot(get("/test.pdf")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SAVE_PDF_HEADER).is_none());
        assert_eq!(response.headers()[CONTENT_TYPE], "application/pdf");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn render_session_does_not_leak_between_requests() {
        let fake = FakeWeasyPrint::new();
        let seen = Seen::default();
        let mut service = PdfLayer::new(Renderer::new(fake.executable(), Options::new())).layer(app(seen.clone(), None));

        for uri in ["/a.txt", "/b.pdf", "/c.txt"] {
            service.ready().await.unwrap().call(get(uri)).await.unwrap();
        }
        let rendering: Vec<bool> =
            seen.lock().unwrap().iter().map(|(_, session)| session.as_ref().unwrap().rendering).collect();
        assert_eq!(rendering, [false, true, false]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_are_independent() {
        let fake = FakeWeasyPrint::new();
        let service = PdfLayer::new(Renderer::new(fake.executable(), Options::new())).layer(app(Seen::default(), None));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                let uri = if i % 2 == 0 { format!("/doc{i}.pdf") } else { format!("/doc{i}.html") };
                tokio::spawn(async move { (i, service.oneshot(get(&uri)).await.unwrap()) })
            })
            .collect();
        for handle in handles {
            let (i, response) = handle.await.unwrap();
            let expected = if i % 2 == 0 { "application/pdf" } else { "text/html" };
            assert_eq!(response.headers()[CONTENT_TYPE], expected);
        }
    }

    #[tokio::test]
    async fn downstream_sees_rewritten_request() {
        let fake = FakeWeasyPrint::new();
        let seen = Seen::default();
        let service = PdfLayer::new(Renderer::new(fake.executable(), Options::new())).layer(app(seen.clone(), None));
        let request = Request::get("/app/report.pdf?page=2")
            .header("host", "example.com")
            .header(ACCEPT, "application/pdf")
            .extension(MountPoint("/app".to_string()))
            .body(())
            .unwrap();
        service.oneshot(request).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, "/report?page=2");
        let session = seen[0].1.as_ref().unwrap();
        assert!(session.rendering);
        assert_eq!(session.path, "/report");
        assert_eq!(session.host.as_deref(), Some("example.com"));
    }

    #[tokio::test]
    async fn mount_point_only_strips_whole_segments() {
        let fake = FakeWeasyPrint::new();
        let seen = Seen::default();
        let service = PdfLayer::new(Renderer::new(fake.executable(), Options::new())).layer(app(seen.clone(), None));
        let request = Request::get("/application/report.pdf")
            .header("host", "example.com")
            .extension(MountPoint("/app".to_string()))
            .body(())
            .unwrap();
        service.oneshot(request).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, "/application/report");
        assert_eq!(seen[0].1.as_ref().unwrap().path, "/application/report");
    }

    #[tokio::test]
    async fn render_failures_become_service_errors() {
        let fake = FakeWeasyPrint::failing(2);
        let service = PdfLayer::new(Renderer::new(fake.executable(), Options::new())).layer(app(Seen::default(), None));
        let err = service.oneshot(get("/test.pdf")).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<ErrorKind>(), Some(ErrorKind::Render(_))));
    }

    #[test]
    fn from_config_rejects_invalid_rules() {
        let fake = FakeWeasyPrint::new();
        let config = Config {
            executable: fake.path().to_path_buf(),
            only: vec!["regex:(".to_string()],
            ..Config::default()
        };
        let err = PdfLayer::from_config(&config).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidRule("(".to_string()));
    }

    #[test]
    fn from_config_requires_an_executable() {
        let config = Config { executable: "/no/such/paperboy-weasyprint-missing".into(), ..Config::default() };
        let err = PdfLayer::from_config(&config).unwrap_err();
        assert_eq!(*err, ErrorKind::Configuration);
    }

    #[test]
    fn from_config_carries_settings() {
        let fake = FakeWeasyPrint::new();
        let config = Config {
            executable: fake.path().to_path_buf(),
            root_url: Some("http://example.net/".to_string()),
            caching: true,
            except: vec!["/secret".to_string()],
            ..Config::default()
        };
        let layer = PdfLayer::from_config(&config).unwrap();
        assert!(layer.shared.caching);
        assert_eq!(layer.shared.root_url.as_deref(), Some("http://example.net/"));
        assert!(matches!(layer.shared.conditions, Conditions::Except(_)));
    }

    /// Compares against a real WeasyPrint rendering when one is installed.
    #[tokio::test]
    async fn matches_real_weasyprint_output_size() {
        let Ok(path) = which::which("weasyprint") else {
            return;
        };
        let renderer = Renderer::discover(&path, Options::new()).unwrap();
        let expected = tokio::task::spawn_blocking({
            let renderer = renderer.clone();
            move || renderer.to_pdf("Hello world!").unwrap()
        })
        .await
        .unwrap();

        let service = PdfLayer::new(renderer).layer(app(Seen::default(), None));
        let pdf = body(service.oneshot(get("/public/test.pdf")).await.unwrap()).await;
        assert!(pdf.starts_with(b"%PDF"));
        // Timestamps and IDs make byte-for-byte comparison impossible.
        assert!(pdf.len().abs_diff(expected.len()) < expected.len() / 10);
    }
}
