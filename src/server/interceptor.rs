//! Authentication gate in front of every route.
//!
//! Per request: `UNAUTHENTICATED -> IDENTIFIED -> {PASSED | REJECTED}`.
//!
//! 1. Identity headers, when both present, are attached as the caller. This
//!    happens whether or not the path needs it.
//! 2. `/`, `/login` and anything outside `/api` pass.
//! 3. Remaining `/api` paths without an identity get a 401 and the handler never runs.
//! 4. Everything else passes.
//!
//! Upgrade handshakes (e.g. websocket) are HTTP requests too and take the same
//! path; they are only tagged in the request span. No route accepts an upgrade.
//!
//! Only the presence of credentials is checked here. Whether the caller may do
//! what it asks is decided by each handler against the permission matrix.

use axum::extract::Request;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::AppError;
use crate::identity::{identity_from_headers, RequestContext};

pub const API_PREFIX: &str = "/api";
pub const ROOT_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Pass,
    Reject,
}

/// Paths that never require credentials at the interceptor.
pub fn is_public_path(path: &str) -> bool {
    path == ROOT_PATH || path == LOGIN_PATH || !path.starts_with(API_PREFIX)
}

/// Gate outcome for a path given whether an identity was attached.
pub fn decide(path: &str, identified: bool) -> Decision {
    if is_public_path(path) || identified {
        Decision::Pass
    } else {
        Decision::Reject
    }
}

/// True for requests asking to switch protocols (`Connection: upgrade` plus an
/// `Upgrade` header), e.g. a websocket handshake.
pub fn is_protocol_upgrade(headers: &HeaderMap) -> bool {
    if !headers.contains_key(header::UPGRADE) {
        return false;
    }
    headers.get_all(header::CONNECTION).iter().any(|v| {
        v.to_str()
            .map(|s| s.split(',').any(|token| token.trim().eq_ignore_ascii_case("upgrade")))
            .unwrap_or(false)
    })
}

pub async fn authenticate(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let path = req.uri().path().to_string();
    let upgrade = is_protocol_upgrade(req.headers());
    let span = info_span!("request", id = %request_id, method = %req.method(), path = %path, upgrade);

    let identity = identity_from_headers(req.headers());
    let identified = identity.is_some();
    if let Some(id) = &identity {
        span.in_scope(|| debug!(target: "auth", user = %id.username, role = %id.role, "identity attached"));
    }
    req.extensions_mut().insert(RequestContext::new(identity));

    match decide(&path, identified) {
        Decision::Pass => next.run(req).instrument(span).await,
        Decision::Reject => {
            span.in_scope(|| warn!(target: "auth", "rejected: missing user credentials"));
            AppError::auth("missing_credentials", "Unauthorized - Missing user credentials").into_response()
        }
    }
}
