//! Rate-limit gate for the `/api` routes.

use crate::rate_limiter::{RateDecision, RequestRateLimiter};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Bucket shared by requests that carry no identity headers
pub const ANONYMOUS: &str = "anon";

/// Client identity for rate limiting
///
/// First `x-forwarded-for` entry, else `x-real-ip`, else [`ANONYMOUS`].
/// Empty values count as missing.
pub fn client_identity(headers: &HeaderMap) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header_value("x-forwarded-for")
        .and_then(|forwarded| forwarded.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .or_else(|| header_value("x-real-ip"))
        .unwrap_or(ANONYMOUS)
        .to_string()
}

/// Count the request against its identity; reject with 429 over the limit
pub async fn rate_limit(
    State(limiter): State<Arc<RequestRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let identity = client_identity(request.headers());

    match limiter.check(&identity, Instant::now()) {
        RateDecision::Allowed { .. } => next.run(request).await,
        RateDecision::Limited { retry_after } => {
            warn!(
                identity = %identity,
                path = %request.uri().path(),
                "Rate limit exceeded"
            );
            too_many_requests(retry_after)
        }
    }
}

/// 429 with `Retry-After` in whole seconds, rounded up
pub fn too_many_requests(retry_after: Duration) -> Response {
    let seconds = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, seconds.to_string())],
        Json(json!({ "error": "Too many requests" })),
    )
        .into_response()
}
