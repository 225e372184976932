//! Persistence for identities, cohorts and students.

mod r#trait;

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use pms_auth::{IdentityLookup, LookupError, User};

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use r#trait::{CohortStore, StoreError, Stores, StudentStore, UserStore};

/// Lets the authorization gate resolve token subjects through a [`UserStore`].
#[derive(Clone)]
pub struct StoreIdentityLookup {
    users: Arc<dyn UserStore>,
}

impl StoreIdentityLookup {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl IdentityLookup for StoreIdentityLookup {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, LookupError> {
        self.users
            .find_user_by_email(email)
            .await
            .map_err(|e| LookupError(e.to_string()))
    }
}
