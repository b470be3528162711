//! The per-request access record and the request snapshot it is built from.

use std::{
    net::SocketAddr,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, OriginalUri, Request},
    http::{header, HeaderMap, HeaderName},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::request_id::RequestId;

use crate::{middleware::real_ip::RemoteAddr, middleware::SecureTransport, net};

/// RFC 1123 with a literal UTC zone, e.g. `Mon, 02 Jan 2006 15:04:05 UTC`.
const RFC1123_UTC: &str = "%a, %d %b %Y %H:%M:%S UTC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// One structured log entry describing a finished request.
///
/// Field names are what downstream log consumers parse; do not rename them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessRecord {
    pub http_host: String,
    pub http_uri: String,
    pub http_proto: String,
    pub http_method: String,
    pub http_scheme: String,
    pub http_addr: String,
    pub remote_addr: String,
    pub user_agent: String,
    pub resp_status: u16,
    /// Elapsed time in nanoseconds.
    pub resp_elapsed: u64,
    pub resp_elapsed_ms: String,
    pub resp_bytes_length: u64,
    pub ts: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl AccessRecord {
    /// Human readable summary line: `[GET] http://example.com/widgets`.
    pub fn summary(&self) -> String {
        format!(
            "[{}] {}://{}{}",
            self.http_method, self.http_scheme, self.http_host, self.http_uri
        )
    }
}

/// Request values captured before the downstream handler takes ownership
/// of the request.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    pub started: Instant,
    pub ts: DateTime<Utc>,
    pub host: String,
    pub uri: String,
    pub proto: String,
    pub method: String,
    pub user_agent: String,
    pub remote_addr: String,
    pub secure: bool,
    pub request_id: Option<String>,
}

impl RequestSnapshot {
    pub fn capture(request: &Request, request_id_header: &HeaderName) -> Self {
        let headers = request.headers();
        let uri = request
            .extensions()
            .get::<OriginalUri>()
            .map(|original| &original.0)
            .unwrap_or_else(|| request.uri());

        let host = header_str(headers, &header::HOST)
            .map(str::to_string)
            .or_else(|| uri.authority().map(|authority| authority.to_string()))
            .unwrap_or_default();

        let target = match uri.path_and_query() {
            Some(path_and_query) => path_and_query.as_str().to_string(),
            None => uri.to_string(),
        };

        let remote_addr = match request.extensions().get::<RemoteAddr>() {
            Some(RemoteAddr(addr)) => addr.clone(),
            None => request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.to_string())
                .unwrap_or_default(),
        };

        let request_id = request
            .extensions()
            .get::<RequestId>()
            .and_then(|id| id.header_value().to_str().ok())
            .or_else(|| header_str(headers, request_id_header))
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        Self {
            started: Instant::now(),
            ts: Utc::now(),
            host,
            uri: target,
            proto: format!("{:?}", request.version()),
            method: request.method().to_string(),
            user_agent: header_str(headers, &header::USER_AGENT)
                .unwrap_or_default()
                .to_string(),
            remote_addr,
            secure: request.extensions().get::<SecureTransport>().is_some(),
            request_id,
        }
    }

    pub fn scheme(&self) -> Scheme {
        if self.secure {
            Scheme::Https
        } else {
            Scheme::Http
        }
    }

    /// Builds the record once the response status and size are known.
    pub fn finish(self, status: u16, bytes: u64, category: &str) -> AccessRecord {
        let elapsed = self.started.elapsed();
        let scheme = self.scheme().as_str();

        AccessRecord {
            http_addr: format!("{}://{}{}", scheme, self.host, self.uri),
            remote_addr: net::client_ip(&self.remote_addr),
            http_scheme: scheme.to_string(),
            http_host: self.host,
            http_uri: self.uri,
            http_proto: self.proto,
            http_method: self.method,
            user_agent: self.user_agent,
            resp_status: status,
            resp_elapsed: u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX),
            resp_elapsed_ms: format_elapsed(elapsed),
            resp_bytes_length: bytes,
            ts: self.ts.format(RFC1123_UTC).to_string(),
            category: category.to_string(),
            request_id: self.request_id,
        }
    }
}

/// `Duration`'s `Debug` form: `1.5ms`, `250µs`, `90s`. Seconds never roll
/// over into minutes or hours. Never empty.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:?}", elapsed)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
