//! Request ID middleware for request tracing and correlation.
//!
//! Every response carries an `x-request-id`. An inbound id from a proxy is
//! kept when it looks sane; otherwise a UUID v4 is generated. The id is
//! recorded in the current span and tagged on the Sentry scope.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest inbound request id that is passed through.
const MAX_INBOUND_LEN: usize = 128;

/// Middleware that ensures every request has a request ID.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(accept_inbound)
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    Span::current().record("request_id", &request_id);
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Keep an upstream id only if it is short printable ASCII without spaces.
fn accept_inbound(id: &str) -> Option<&str> {
    let id = id.trim();
    (!id.is_empty()
        && id.len() <= MAX_INBOUND_LEN
        && id.bytes().all(|b| b.is_ascii_graphic()))
    .then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_inbound() {
        assert_eq!(accept_inbound(" cf-1234 "), Some("cf-1234"));
        assert_eq!(accept_inbound(""), None);
        assert_eq!(accept_inbound("has space"), None);
        assert_eq!(accept_inbound(&"a".repeat(MAX_INBOUND_LEN + 1)), None);
    }
}
