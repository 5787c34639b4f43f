use std::sync::Arc;

use tracing::warn;

use super::matrix::{Action, PermissionMatrix, Resource, CLINIC_POLICY};
use super::principal::Identity;
use crate::error::{AppError, AppResult};

/// Permission checker over a shared, frozen [`PermissionMatrix`].
///
/// Every method is total: unrecognized role, resource or action names simply
/// yield `false`. There is no default-allow path.
#[derive(Debug, Clone)]
pub struct Authorizer {
    matrix: Arc<PermissionMatrix>,
}

impl Default for Authorizer {
    fn default() -> Self { Self { matrix: CLINIC_POLICY.clone() } }
}

impl Authorizer {
    pub fn new(matrix: Arc<PermissionMatrix>) -> Self { Self { matrix } }

    pub fn matrix(&self) -> &PermissionMatrix { &self.matrix }

    /// `action ∈ lookup(role, resource)` with every argument as a raw string.
    pub fn authorize(&self, role: &str, resource: &str, action: &str) -> bool {
        match action.parse::<Action>() {
            Ok(action) => self.matrix.lookup(role, resource).contains(action),
            Err(()) => false,
        }
    }

    /// Typed resource/action with the caller's role as supplied in the request.
    pub fn allows(&self, role: &str, resource: Resource, action: Action) -> bool {
        match role.parse() {
            Ok(role) => self.matrix.actions_for(role, resource).contains(action),
            Err(()) => false,
        }
    }

    /// Handler-side gate: `Ok(())` when the caller may perform `action` on
    /// `resource`, otherwise a 403 whose detail reads
    /// "Access denied - No permission to {capability}".
    pub fn require(&self, caller: &Identity, resource: Resource, action: Action, capability: &str) -> AppResult<()> {
        if self.allows(&caller.role, resource, action) {
            return Ok(());
        }
        warn!(
            target: "auth",
            user = %caller.username,
            role = %caller.role,
            resource = %resource,
            action = %action,
            "permission denied"
        );
        Err(AppError::forbidden(
            "permission_denied".to_string(),
            format!("Access denied - No permission to {capability}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Role;

    fn caller(role: &str) -> Identity { Identity::new(role, "tester") }

    #[test]
    fn string_level_checks() {
        let a = Authorizer::default();
        assert!(a.authorize("Doctor", "prescriptions", "write"));
        assert!(!a.authorize("Nurse", "prescriptions", "write"));
        assert!(a.authorize("Pharmacist", "prescriptions", "read"));
        assert!(!a.authorize("Doctor", "reports", "delete"));
        assert!(!a.authorize("Doctor", "patients", "purge"));
    }

    #[test]
    fn require_denies_with_capability_in_detail() {
        let a = Authorizer::default();
        let err = a.require(&caller("Nurse"), Resource::Patients, Action::Write, "add patients").unwrap_err();
        assert_eq!(err.http_status(), 403);
        assert_eq!(err.message(), "Access denied - No permission to add patients");
        assert!(a.require(&caller("Doctor"), Resource::Patients, Action::Write, "add patients").is_ok());
    }

    #[test]
    fn unknown_role_is_forbidden_not_unauthenticated() {
        let a = Authorizer::default();
        let err = a.require(&caller("Surgeon"), Resource::Patients, Action::Read, "view patients").unwrap_err();
        assert_eq!(err.http_status(), 403);
    }

    #[test]
    fn custom_matrix_is_respected() {
        let m = PermissionMatrix::builder().grant(Role::Nurse, Resource::Users, &[Action::Read]).build();
        let a = Authorizer::new(Arc::new(m));
        assert!(a.allows("Nurse", Resource::Users, Action::Read));
        assert!(!a.allows("Admin", Resource::Users, Action::Read));
    }
}
