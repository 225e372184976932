use pms_core::UserId;

use crate::Role;

/// A caller whose token validated and whose identity still exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
    /// Roles decoded from the token's `authorities` claim.
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

/// Per-request, read-only view of who is calling.
///
/// Built once by the authorization gate and passed explicitly to every
/// service call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SecurityContext {
    #[default]
    Anonymous,
    Authenticated(Principal),
}

impl SecurityContext {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            SecurityContext::Anonymous => None,
            SecurityContext::Authenticated(p) => Some(p),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal().is_some()
    }
}
