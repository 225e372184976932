//! Which roles may run which operation.
//!
//! This is the single place role requirements are declared. Services call
//! [`Operation::authorize`] before touching a store; nothing else performs role
//! checks.

use pms_auth::{authorize, OperationAuthorization, Principal, Role, RoleRequirement, SecurityContext};

use super::ServiceError;

const ANY_ROLE: RoleRequirement =
    RoleRequirement::any_of(&[Role::Admin, Role::Facilitator, Role::Student]);
const STAFF: RoleRequirement = RoleRequirement::any_of(&[Role::Admin, Role::Facilitator]);
const ADMIN: RoleRequirement = RoleRequirement::any_of(&[Role::Admin]);

/// Every protected operation. Registration and login are public and absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Profile,
    ListUsers,
    UpdateUser,
    DeleteUser,
    ChangeUserRole,
    CreateCohort,
    ListCohorts,
    GetCohort,
    UpdateCohort,
    DeleteCohort,
    CreateStudent,
    ListStudents,
    GetStudent,
    UpdateStudent,
    DeleteStudent,
}

impl OperationAuthorization for Operation {
    fn required_roles(&self) -> RoleRequirement {
        match self {
            Operation::Profile => ANY_ROLE,
            Operation::ListUsers => ADMIN,
            Operation::UpdateUser => STAFF,
            Operation::DeleteUser => ADMIN,
            Operation::ChangeUserRole => ADMIN,

            Operation::CreateCohort => ADMIN,
            Operation::ListCohorts => ANY_ROLE,
            Operation::GetCohort => ANY_ROLE,
            Operation::UpdateCohort => ADMIN,
            Operation::DeleteCohort => ADMIN,

            Operation::CreateStudent => STAFF,
            Operation::ListStudents => STAFF,
            Operation::GetStudent => ANY_ROLE,
            Operation::UpdateStudent => STAFF,
            Operation::DeleteStudent => ADMIN,
        }
    }
}

impl Operation {
    pub fn authorize<'a>(&self, ctx: &'a SecurityContext) -> Result<&'a Principal, ServiceError> {
        authorize(ctx, &self.required_roles()).map_err(|e| {
            tracing::debug!(operation = ?self, reason = %e, "operation denied");
            ServiceError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pms_core::UserId;

    fn ctx(role: Role) -> SecurityContext {
        SecurityContext::Authenticated(Principal {
            user_id: UserId::new(),
            email: "a@x.com".to_string(),
            roles: vec![role],
        })
    }

    #[test]
    fn student_role_reads_but_never_writes_cohorts() {
        let student = ctx(Role::Student);
        assert!(Operation::ListCohorts.authorize(&student).is_ok());
        assert!(Operation::GetCohort.authorize(&student).is_ok());
        assert!(matches!(
            Operation::CreateCohort.authorize(&student),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[test]
    fn facilitator_manages_students_but_cannot_delete_them() {
        let facilitator = ctx(Role::Facilitator);
        assert!(Operation::CreateStudent.authorize(&facilitator).is_ok());
        assert!(Operation::UpdateStudent.authorize(&facilitator).is_ok());
        assert!(Operation::DeleteStudent.authorize(&facilitator).is_err());
    }

    #[test]
    fn anonymous_is_unauthenticated_everywhere() {
        assert_eq!(
            Operation::Profile.authorize(&SecurityContext::Anonymous),
            Err(ServiceError::Unauthenticated)
        );
    }

    #[test]
    fn admin_passes_every_operation() {
        let admin = ctx(Role::Admin);
        for op in [
            Operation::Profile,
            Operation::ListUsers,
            Operation::UpdateUser,
            Operation::DeleteUser,
            Operation::ChangeUserRole,
            Operation::CreateCohort,
            Operation::ListCohorts,
            Operation::GetCohort,
            Operation::UpdateCohort,
            Operation::DeleteCohort,
            Operation::CreateStudent,
            Operation::ListStudents,
            Operation::GetStudent,
            Operation::UpdateStudent,
            Operation::DeleteStudent,
        ] {
            assert!(op.authorize(&admin).is_ok(), "{op:?}");
        }
    }
}
