//! Visitor identification middleware.
//!
//! Reads `X-Session-Id`, mints a new id when the header is absent, and
//! injects `VisitorContext` into request extensions. The id is echoed back
//! so the widget can keep it for later requests.

use axum::http::{header, HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::VisitorContext;

pub const SESSION_HEADER: HeaderName = HeaderName::from_static("x-session-id");

const MIN_ID_LEN: usize = 8;
const MAX_ID_LEN: usize = 64;

/// Client-chosen ids become storage key prefixes, so only a small safe
/// alphabet is accepted.
pub fn is_valid_session_id(id: &str) -> bool {
    (MIN_ID_LEN..=MAX_ID_LEN).contains(&id.len())
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
}

pub async fn identify_visitor(req: Request<axum::body::Body>, next: Next) -> Response {
    match identify_visitor_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn identify_visitor_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let session_id = match req.headers().get(&SESSION_HEADER) {
        Some(value) => {
            let id = value
                .to_str()
                .ok()
                .map(str::trim)
                .filter(|id| is_valid_session_id(id))
                .ok_or_else(|| ApiError::BadRequest("Invalid X-Session-Id header".into()))?;
            id.to_string()
        }
        None => {
            let id = Uuid::new_v4().to_string();
            tracing::debug!(session_id = %id, "New visitor session");
            id
        }
    };

    req.extensions_mut().insert(VisitorContext {
        session_id: session_id.clone(),
    });

    let mut response = next.run(req).await;
    if let Ok(val) = HeaderValue::from_str(&session_id) {
        response.headers_mut().insert(SESSION_HEADER, val);
    }
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_use_a_safe_alphabet() {
        assert!(is_valid_session_id("3f2b9c1e-7d4a-4b8e-9f00-1234567890ab"));
        assert!(is_valid_session_id("visitor_01"));
        assert!(!is_valid_session_id("short"));
        assert!(!is_valid_session_id("../../etc/passwd"));
        assert!(!is_valid_session_id("has.dots.inside"));
        assert!(!is_valid_session_id(&"a".repeat(65)));
    }
}
