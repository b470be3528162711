use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderName,
    middleware::Next,
    response::Response,
};
use tracing::Level;

use crate::{
    record::{AccessRecord, RequestSnapshot},
    sink::LogSink,
};

use super::body::{EmitOnDrop, LoggedBody};

pub const DEFAULT_REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// State for [`request_logging`]: the category label stamped on every
/// record and the sink records are written to.
#[derive(Clone)]
pub struct RequestLogger {
    category: Arc<str>,
    sink: Arc<dyn LogSink>,
    request_id_header: HeaderName,
}

impl RequestLogger {
    pub fn new(category: impl Into<String>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            category: Arc::from(category.into()),
            sink,
            request_id_header: DEFAULT_REQUEST_ID_HEADER,
        }
    }

    /// Header consulted for a correlation id when no `RequestId` extension
    /// is present.
    pub fn with_request_id_header(mut self, header: HeaderName) -> Self {
        self.request_id_header = header;
        self
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn request_id_header(&self) -> &HeaderName {
        &self.request_id_header
    }

    pub(crate) fn emit(&self, record: &AccessRecord) {
        self.sink.write(Level::INFO, &record.summary(), record);
    }
}

impl std::fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLogger")
            .field("category", &self.category)
            .field("request_id_header", &self.request_id_header)
            .finish_non_exhaustive()
    }
}

/// Writes one access record per request.
///
/// The record is emitted once the response body has been fully streamed or
/// dropped. If the handler panics or the request future is cancelled before
/// a response exists, the record is still emitted with status `0`.
pub async fn request_logging(
    State(logger): State<RequestLogger>,
    request: Request,
    next: Next,
) -> Response {
    let snapshot = RequestSnapshot::capture(&request, logger.request_id_header());
    let mut guard = EmitOnDrop::new(logger, snapshot);

    let response = next.run(request).await;
    guard.set_status(response.status().as_u16());

    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::new(LoggedBody::new(body, guard)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        middleware::{real_ip::RemoteAddr, SecureTransport},
        sink::MemorySink,
    };
    use axum::{
        http::StatusCode,
        routing::get,
        Router,
    };
    use tower::ServiceExt;
    use tower_http::{
        catch_panic::CatchPanicLayer,
        request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    };

    fn app(sink: Arc<MemorySink>) -> Router {
        let logger = RequestLogger::new("api", sink);
        Router::new()
            .route(
                "/widgets",
                get(|| async { "three widgets" })
                    .post(|| async { (StatusCode::CREATED, "created") }),
            )
            .route("/empty", get(|| async { StatusCode::NO_CONTENT }))
            .route("/boom", get(boom))
            .layer(axum::middleware::from_fn_with_state(logger, request_logging))
            .layer(CatchPanicLayer::new())
    }

    async fn boom() -> &'static str {
        panic!("handler exploded")
    }

    fn widgets_request(remote: &str) -> Request {
        axum::http::Request::builder()
            .method("GET")
            .uri("/widgets")
            .header("host", "example.com")
            .header("user-agent", "test-agent/1.0")
            .extension(RemoteAddr(remote.to_string()))
            .body(Body::empty())
            .unwrap()
    }

    async fn call(app: Router, request: Request) -> (StatusCode, axum::body::Bytes) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn logs_plain_http_request() {
        let sink = Arc::new(MemorySink::new());

        let (status, body) = call(app(sink.clone()), widgets_request("10.0.0.5:54321")).await;
        assert_eq!(status, StatusCode::OK);

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.level, Level::INFO);
        assert_eq!(entry.message, "[GET] http://example.com/widgets");

        let record = &entry.record;
        assert_eq!(record.http_method, "GET");
        assert_eq!(record.http_scheme, "http");
        assert_eq!(record.http_host, "example.com");
        assert_eq!(record.http_uri, "/widgets");
        assert_eq!(record.http_proto, "HTTP/1.1");
        assert_eq!(record.http_addr, "http://example.com/widgets");
        assert_eq!(record.remote_addr, "10.0.0.5");
        assert_eq!(record.user_agent, "test-agent/1.0");
        assert_eq!(record.resp_status, 200);
        assert_eq!(record.resp_bytes_length, body.len() as u64);
        assert_eq!(record.category, "api");
        assert!(!record.resp_elapsed_ms.is_empty());
        assert!(!record.ts.is_empty());
        assert_eq!(record.request_id, None);
    }

    #[tokio::test]
    async fn remote_address_without_port_is_logged_verbatim() {
        let sink = Arc::new(MemorySink::new());

        call(app(sink.clone()), widgets_request("10.0.0.5")).await;

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].remote_addr, "10.0.0.5");
    }

    #[tokio::test]
    async fn secure_transport_marks_https() {
        let sink = Arc::new(MemorySink::new());
        let mut request = widgets_request("10.0.0.5:443");
        request.extensions_mut().insert(SecureTransport);

        call(app(sink.clone()), request).await;

        let records = sink.records();
        assert_eq!(records[0].http_scheme, "https");
        assert_eq!(records[0].http_addr, "https://example.com/widgets");
        assert_eq!(sink.entries()[0].message, "[GET] https://example.com/widgets");
    }

    #[tokio::test]
    async fn records_status_and_bytes_written() {
        let sink = Arc::new(MemorySink::new());
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/widgets")
            .header("host", "example.com")
            .body(Body::from("payload"))
            .unwrap();

        let (status, body) = call(app(sink.clone()), request).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(&body[..], b"created");
        let records = sink.records();
        let record = &records[0];
        assert_eq!(record.http_method, "POST");
        assert_eq!(record.resp_status, 201);
        assert_eq!(record.resp_bytes_length, 7);
        assert_eq!(record.remote_addr, "");
    }

    #[tokio::test]
    async fn empty_body_response_emits_once() {
        let sink = Arc::new(MemorySink::new());
        let request = axum::http::Request::builder()
            .uri("/empty")
            .header("host", "example.com")
            .body(Body::empty())
            .unwrap();

        let (status, _) = call(app(sink.clone()), request).await;

        assert_eq!(status, StatusCode::NO_CONTENT);
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].resp_status, 204);
        assert_eq!(records[0].resp_bytes_length, 0);
    }

    #[tokio::test]
    async fn dropping_the_response_unread_still_emits() {
        let sink = Arc::new(MemorySink::new());

        let response = app(sink.clone())
            .oneshot(widgets_request("10.0.0.5:1"))
            .await
            .unwrap();
        assert!(sink.is_empty());
        drop(response);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].resp_status, 200);
    }

    #[tokio::test]
    async fn panicking_handler_is_logged_with_unset_status() {
        let sink = Arc::new(MemorySink::new());
        let request = axum::http::Request::builder()
            .uri("/boom")
            .header("host", "example.com")
            .body(Body::empty())
            .unwrap();

        let (status, _) = call(app(sink.clone()), request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].resp_status, 0);
        assert_eq!(records[0].resp_bytes_length, 0);
        assert_eq!(records[0].http_uri, "/boom");
    }

    #[tokio::test]
    async fn request_id_header_is_recorded_when_present() {
        let sink = Arc::new(MemorySink::new());
        let mut request = widgets_request("10.0.0.5:54321");
        request
            .headers_mut()
            .insert("x-request-id", "abc-123".parse().unwrap());

        call(app(sink.clone()), request).await;

        assert_eq!(sink.records()[0].request_id.as_deref(), Some("abc-123"));
    }

    #[tokio::test]
    async fn custom_request_id_header_is_honoured() {
        let sink = Arc::new(MemorySink::new());
        let logger = RequestLogger::new("api", sink.clone())
            .with_request_id_header(HeaderName::from_static("x-correlation-id"));
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(logger, request_logging));
        let request = axum::http::Request::builder()
            .uri("/")
            .header("x-correlation-id", "corr-9")
            .header("x-request-id", "ignored")
            .body(Body::empty())
            .unwrap();

        call(app, request).await;

        assert_eq!(sink.records()[0].request_id.as_deref(), Some("corr-9"));
    }

    #[tokio::test]
    async fn generated_request_id_matches_response_header() {
        let sink = Arc::new(MemorySink::new());
        let logger = RequestLogger::new("api", sink.clone());
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(logger, request_logging))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        let response = app
            .oneshot(axum::http::Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let header = response
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let records = sink.records();
        assert!(header.is_some());
        assert_eq!(records[0].request_id, header);
    }
}
