use thiserror::Error;

use crate::{Principal, Role, SecurityContext};

/// Roles allowed to run an operation. The caller needs any one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleRequirement(&'static [Role]);

impl RoleRequirement {
    pub const fn any_of(roles: &'static [Role]) -> Self {
        Self(roles)
    }

    pub fn roles(&self) -> &'static [Role] {
        self.0
    }

    pub fn admits(&self, principal: &Principal) -> bool {
        self.0.iter().any(|r| principal.has_role(*r))
    }
}

impl core::fmt::Display for RoleRequirement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Role::as_str).collect();
        write!(f, "{}", names.join("|"))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden: requires one of {required}")]
    Forbidden { required: String },
}

/// Operation-side authorization contract (checked at the service boundary).
///
/// Implement this on operations that require a role; services call
/// [`authorize`] with the result before touching the store.
pub trait OperationAuthorization {
    fn required_roles(&self) -> RoleRequirement;
}

/// Authorize the caller in `ctx` against `required`.
///
/// - No IO
/// - No panics
/// - Anonymous callers are `Unauthenticated`; authenticated callers lacking
///   every required role are `Forbidden`.
pub fn authorize<'a>(
    ctx: &'a SecurityContext,
    required: &RoleRequirement,
) -> Result<&'a Principal, AuthzError> {
    let principal = ctx.principal().ok_or(AuthzError::Unauthenticated)?;
    if required.admits(principal) {
        Ok(principal)
    } else {
        Err(AuthzError::Forbidden {
            required: required.to_string(),
        })
    }
}

/// Privilege escalation guard: only an ADMIN may hand out the ADMIN role.
pub fn can_grant(actor: &Principal, role: Role) -> bool {
    role != Role::Admin || actor.is_admin()
}

/// An ADMIN account may only be edited by another ADMIN, so staff cannot
/// demote an ADMIN or take over its email.
pub fn can_manage(actor: &Principal, target: Role) -> bool {
    target != Role::Admin || actor.is_admin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pms_core::UserId;

    const ADMIN_ONLY: RoleRequirement = RoleRequirement::any_of(&[Role::Admin]);
    const STAFF: RoleRequirement = RoleRequirement::any_of(&[Role::Admin, Role::Facilitator]);

    fn ctx(role: Role) -> SecurityContext {
        SecurityContext::Authenticated(Principal {
            user_id: UserId::new(),
            email: "a@x.com".to_string(),
            roles: vec![role],
        })
    }

    #[test]
    fn admin_passes_admin_only_operation() {
        assert!(authorize(&ctx(Role::Admin), &ADMIN_ONLY).is_ok());
    }

    #[test]
    fn facilitator_is_forbidden_on_admin_only_operation() {
        let err = authorize(&ctx(Role::Facilitator), &ADMIN_ONLY).unwrap_err();
        assert_eq!(
            err,
            AuthzError::Forbidden {
                required: "ADMIN".to_string()
            }
        );
    }

    #[test]
    fn anonymous_is_unauthenticated() {
        assert_eq!(
            authorize(&SecurityContext::Anonymous, &STAFF),
            Err(AuthzError::Unauthenticated)
        );
    }

    #[test]
    fn any_intersecting_role_is_enough() {
        assert!(authorize(&ctx(Role::Facilitator), &STAFF).is_ok());
        assert!(authorize(&ctx(Role::Student), &STAFF).is_err());
    }

    #[test]
    fn only_admin_can_grant_admin() {
        let facilitator = ctx(Role::Facilitator);
        let admin = ctx(Role::Admin);
        assert!(!can_grant(facilitator.principal().unwrap(), Role::Admin));
        assert!(can_grant(facilitator.principal().unwrap(), Role::Student));
        assert!(can_grant(admin.principal().unwrap(), Role::Admin));
    }

    #[test]
    fn only_admin_can_manage_an_admin_account() {
        let facilitator = ctx(Role::Facilitator);
        let admin = ctx(Role::Admin);
        assert!(!can_manage(facilitator.principal().unwrap(), Role::Admin));
        assert!(can_manage(facilitator.principal().unwrap(), Role::Student));
        assert!(can_manage(admin.principal().unwrap(), Role::Admin));
    }
}
