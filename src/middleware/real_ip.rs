//! Client address taken from trusted proxy headers.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName},
    middleware::Next,
    response::Response,
};

const TRUE_CLIENT_IP: HeaderName = HeaderName::from_static("true-client-ip");
const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");
const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Remote address of the peer as a string. Overrides the socket address
/// when present; may or may not carry a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAddr(pub String);

/// Replaces the peer address with the one advertised by a reverse proxy.
///
/// Only mount this behind proxies that overwrite these headers, otherwise
/// clients can claim any address they like.
pub async fn real_ip(mut request: Request, next: Next) -> Response {
    if let Some(ip) = forwarded_ip(request.headers()) {
        request.extensions_mut().insert(RemoteAddr(ip));
    }
    next.run(request).await
}

/// `True-Client-IP`, then `X-Real-IP`, then the first `X-Forwarded-For` hop.
pub fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let single = |name: &HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    single(&TRUE_CLIENT_IP)
        .or_else(|| single(&X_REAL_IP))
        .or_else(|| {
            headers
                .get(X_FORWARDED_FOR)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .map(str::to_string)
}
