use serde::{Deserialize, Serialize};

use super::matrix::Role;

/// The caller of one request as claimed by its identity headers.
///
/// `role` is kept verbatim: an unrecognized role is still an identity, it just
/// never passes an authorization check.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub role: String,
    pub username: String,
}

impl Identity {
    pub fn new(role: impl Into<String>, username: impl Into<String>) -> Self {
        Self { role: role.into(), username: username.into() }
    }

    /// Parsed role, if it names one of the known roles.
    pub fn known_role(&self) -> Option<Role> { self.role.parse().ok() }
}
