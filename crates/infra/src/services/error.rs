use thiserror::Error;
use tracing::error;

use pms_auth::AuthzError;
use pms_core::DomainError;

use crate::store::StoreError;

/// Error surfaced by the resource services.
///
/// Each variant maps to exactly one HTTP status in the API layer. `Internal`
/// carries detail for the log only; callers must not echo it to clients.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Unknown email or wrong password. The two are deliberately indistinguishable.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("a user with this {field} already exists")]
    DuplicateIdentity { field: &'static str },

    #[error("a {resource} with this {field} already exists")]
    Duplicate {
        resource: &'static str,
        field: &'static str,
    },

    #[error("{resource} not found with ID: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Map a store failure on `resource` (record `id`) into the service vocabulary.
    ///
    /// Backend failures are logged here, once, with full detail.
    pub fn from_store(err: StoreError, resource: &'static str, id: impl ToString) -> Self {
        match err {
            StoreError::Duplicate { field } if resource == "User" => {
                ServiceError::DuplicateIdentity { field }
            }
            StoreError::Duplicate { field } => ServiceError::Duplicate { resource, field },
            StoreError::NotFound => ServiceError::not_found(resource, id),
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            StoreError::Backend(msg) => {
                error!(resource, error = %msg, "store backend failure");
                ServiceError::Internal(msg)
            }
        }
    }
}

impl From<AuthzError> for ServiceError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Unauthenticated => ServiceError::Unauthenticated,
            AuthzError::Forbidden { .. } => ServiceError::Forbidden(value.to_string()),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::NotFound { resource, id } => ServiceError::NotFound { resource, id },
            DomainError::Duplicate { resource, field } => ServiceError::Duplicate { resource, field },
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_duplicates_become_identity_duplicates() {
        let err = ServiceError::from_store(StoreError::Duplicate { field: "cellphone" }, "User", "x");
        assert_eq!(err, ServiceError::DuplicateIdentity { field: "cellphone" });
        assert_eq!(err.to_string(), "a user with this cellphone already exists");
    }

    #[test]
    fn store_not_found_names_resource_and_id() {
        let err = ServiceError::from_store(StoreError::NotFound, "Cohort", "42");
        assert_eq!(err.to_string(), "Cohort not found with ID: 42");
    }

    #[test]
    fn forbidden_keeps_required_roles_in_message() {
        let err: ServiceError = AuthzError::Forbidden {
            required: "ADMIN".to_string(),
        }
        .into();
        assert!(matches!(err, ServiceError::Forbidden(msg) if msg.contains("ADMIN")));
    }
}
