use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use rand::Rng;
use std::fmt::Write;
use std::time::Instant;

/// Trace id of the current request, stored in request extensions and echoed
/// in every envelope and in the `X-Trace-Id` response header.
#[derive(Clone)]
pub struct TraceId(pub String);

impl std::ops::Deref for TraceId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

/// 16 hex characters from 8 random bytes.
fn generate_trace_id() -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    let mut s = String::with_capacity(16);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

const MAX_BODY_LOG_CHARS: usize = 200;

/// Truncates to at most `max` bytes on a char boundary.
fn truncate_body(bytes: &[u8], max: usize) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) if s.len() > max => {
            let mut end = max;
            while end > 0 && !s.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &s[..end])
        }
        Ok(s) => s.to_string(),
        Err(_) => "<non-utf8 body>".to_string(),
    }
}

fn format_elapsed(elapsed_us: u128) -> String {
    if elapsed_us < 1000 {
        format!("{elapsed_us}µs")
    } else if elapsed_us < 1_000_000 {
        format!("{}ms", elapsed_us / 1000)
    } else {
        format!("{:.1}s", elapsed_us as f64 / 1_000_000.0)
    }
}

const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Credentials and tokens travel under `/v1/auth/`.
fn is_sensitive(path: &str) -> bool {
    path.starts_with("/v1/auth/")
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"))
}

/// Buffers a body so it can be logged and then replayed.
async fn buffer(body: Body, limit: usize, loggable: bool) -> (Bytes, Option<String>) {
    let bytes = axum::body::to_bytes(body, limit).await.unwrap_or_default();
    let snippet = (loggable && !bytes.is_empty()).then(|| truncate_body(&bytes, MAX_BODY_LOG_CHARS));
    (bytes, snippet)
}

/// Assigns a trace id and logs one line per request and per response.
/// Bodies under `/v1/auth/` are never logged; other JSON bodies are, on
/// every status class.
pub async fn request_logging(mut req: Request, next: Next) -> Response {
    let trace_id = generate_trace_id();
    req.extensions_mut().insert(TraceId(trace_id.clone()));

    let method = req.method().clone();
    let url = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path().to_string(), |pq| pq.as_str().to_string());
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let sensitive = is_sensitive(req.uri().path());

    let (req, request_body) = if !sensitive && matches!(method.as_str(), "POST" | "PUT" | "PATCH") {
        let (parts, body) = req.into_parts();
        let (bytes, snippet) = buffer(body, MAX_REQUEST_BODY_BYTES, true).await;
        (Request::from_parts(parts, Body::from(bytes)), snippet)
    } else {
        (req, None)
    };

    tracing::info!(
        trace_id = %trace_id,
        method = %method,
        path = %url,
        body = request_body.as_deref(),
        ua = %user_agent,
        "--> request"
    );

    let start = Instant::now();
    let response = next.run(req).await;
    let elapsed = format_elapsed(start.elapsed().as_micros());

    let (parts, body) = response.into_parts();
    let loggable = !sensitive && is_json(&parts.headers);
    let (bytes, response_body) = buffer(body, usize::MAX, loggable).await;
    let status = parts.status.as_u16();
    let body = response_body.as_deref();
    if parts.status.is_server_error() {
        tracing::error!(trace_id = %trace_id, status, elapsed = %elapsed, body, "<-- response");
    } else if parts.status.is_client_error() {
        tracing::warn!(trace_id = %trace_id, status, elapsed = %elapsed, body, "<-- response");
    } else {
        tracing::info!(trace_id = %trace_id, status, elapsed = %elapsed, body, "<-- response");
    }

    let mut response = Response::from_parts(parts, Body::from(bytes));
    if let Ok(val) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert("X-Trace-Id", val);
    }
    response
}
