use std::convert::Infallible;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;

use super::principal::Identity;
use crate::error::AppError;

/// Per-request context attached by the auth interceptor as a request extension.
/// The request id lives on the interceptor's tracing span, not here.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub identity: Option<Identity>,
}

impl RequestContext {
    pub fn new(identity: Option<Identity>) -> Self { Self { identity } }
}

/// The authenticated caller of the current request.
///
/// Taking `Caller` as a handler argument makes the identity dependency explicit;
/// extraction fails with 401 when the interceptor attached no identity.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

impl Caller {
    pub fn identity(&self) -> &Identity { &self.0 }
    pub fn username(&self) -> &str { &self.0.username }
    pub fn role(&self) -> &str { &self.0.role }
}

fn attached_identity(parts: &Parts) -> Option<Identity> {
    parts.extensions.get::<RequestContext>().and_then(|ctx| ctx.identity.clone())
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        attached_identity(parts)
            .map(Caller)
            .ok_or_else(|| AppError::auth("missing_credentials", "Unauthorized - No user credentials"))
    }
}

impl<S> OptionalFromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Option<Self>, Self::Rejection> {
        Ok(attached_identity(parts).map(Caller))
    }
}
