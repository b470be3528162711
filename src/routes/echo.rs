use axum::{body::Bytes, http::HeaderMap, response::IntoResponse};

/// Echoes the request body back with the same content type.
pub async fn echo(headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| axum::http::HeaderValue::from_static("application/octet-stream"));

    ([(axum::http::header::CONTENT_TYPE, content_type)], body)
}
