//! Caller identity and role-based authorization.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod extract;
mod request_context;
mod matrix;
mod authorizer;

pub use principal::Identity;
pub use extract::{identity_from_headers, ROLE_HEADER, USER_HEADER};
pub use request_context::{Caller, RequestContext};
pub use matrix::{Action, ActionSet, MatrixBuilder, PermissionMatrix, Resource, Role, CLINIC_POLICY};
pub use authorizer::Authorizer;
