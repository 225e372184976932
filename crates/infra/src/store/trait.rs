use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use pms_auth::User;
use pms_cohorts::{Cohort, Student};
use pms_core::{CohortId, StudentId, UserId};

/// Store operation error.
///
/// These are **infrastructure errors** raised by the store itself, as opposed
/// to domain errors raised while validating input.
///
/// - **Duplicate**: a unique field collided (`email`, `cellphone`, `cohortName`,
///   `emailAddress`)
/// - **NotFound**: update/delete targeted a missing record
/// - **Conflict**: a reference would dangle (missing parent, or children still
///   pointing at the record)
/// - **Backend**: anything else (connection, lock poisoning, row decoding)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("duplicate value for unique field '{field}'")]
    Duplicate { field: &'static str },

    #[error("record not found")]
    NotFound,

    #[error("reference conflict: {0}")]
    Conflict(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Credential store: exclusive owner of identities.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: User) -> Result<User, StoreError>;
    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_user_by_cellphone(&self, cellphone: &str) -> Result<Option<User>, StoreError>;
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    /// Replace the stored record with the same id.
    async fn update_user(&self, user: User) -> Result<User, StoreError>;
    async fn delete_user(&self, id: UserId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CohortStore: Send + Sync {
    async fn insert_cohort(&self, cohort: Cohort) -> Result<Cohort, StoreError>;
    async fn find_cohort(&self, id: CohortId) -> Result<Option<Cohort>, StoreError>;
    async fn list_cohorts(&self) -> Result<Vec<Cohort>, StoreError>;
    async fn update_cohort(&self, cohort: Cohort) -> Result<Cohort, StoreError>;
    /// Fails with `Conflict` while any student references the cohort.
    async fn delete_cohort(&self, id: CohortId) -> Result<(), StoreError>;
    async fn cohort_has_students(&self, id: CohortId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait StudentStore: Send + Sync {
    async fn insert_student(&self, student: Student) -> Result<Student, StoreError>;
    async fn find_student(&self, id: StudentId) -> Result<Option<Student>, StoreError>;
    async fn list_students(&self) -> Result<Vec<Student>, StoreError>;
    async fn update_student(&self, student: Student) -> Result<Student, StoreError>;
    async fn delete_student(&self, id: StudentId) -> Result<(), StoreError>;
}

/// The three stores a running service needs, type-erased.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub cohorts: Arc<dyn CohortStore>,
    pub students: Arc<dyn StudentStore>,
}

impl Stores {
    /// All three traits served by one backend.
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: UserStore + CohortStore + StudentStore + 'static,
    {
        Self {
            users: backend.clone(),
            cohorts: backend.clone(),
            students: backend,
        }
    }
}

impl core::fmt::Debug for Stores {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
