//! Resource services (application-level orchestration).
//!
//! Every protected call follows the same pipeline:
//!
//! ```text
//! SecurityContext + input
//!   ↓
//! 1. Operation::authorize (role check, once)
//!   ↓
//! 2. Input validation (domain rules)
//!   ↓
//! 3. Reference resolution (facilitator, cohort) via timeout-bounded store calls
//!   ↓
//! 4. Single store mutation (uniqueness and references re-checked by the store)
//! ```
//!
//! ## Design Principles
//!
//! - **Explicit caller**: the security context is a parameter, never ambient state
//! - **No HTTP**: services return [`ServiceError`]; the API layer owns status codes
//! - **Bounded IO**: each store call is wrapped in [`bounded`]; a timeout is `Internal`
//! - **CPU off the runtime**: password hashing runs on the blocking pool

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use pms_auth::{PasswordHasher, TokenService};

use crate::store::{StoreError, Stores};

pub mod accounts;
pub mod cohorts;
mod error;
pub mod policy;
pub mod students;

pub use accounts::AccountService;
pub use cohorts::{CohortDetails, CohortService, CohortSummary};
pub use error::ServiceError;
pub use policy::Operation;
pub use students::{StudentDetails, StudentService};

/// Run a store call under `limit`. A timeout surfaces as `StoreError::Backend`.
pub(crate) async fn bounded<T, F>(limit: Duration, operation: &'static str, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, timeout_ms = limit.as_millis() as u64, "store call timed out");
            Err(StoreError::Backend(format!("{operation} timed out")))
        }
    }
}

/// The three resource services, wired over one set of stores.
#[derive(Clone)]
pub struct Services {
    pub accounts: Arc<AccountService>,
    pub cohorts: Arc<CohortService>,
    pub students: Arc<StudentService>,
}

impl Services {
    pub fn new(
        stores: Stores,
        hasher: Arc<PasswordHasher>,
        tokens: Arc<TokenService>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            accounts: Arc::new(AccountService::new(
                stores.users.clone(),
                hasher,
                tokens,
                store_timeout,
            )),
            cohorts: Arc::new(CohortService::new(stores.clone(), store_timeout)),
            students: Arc::new(StudentService::new(stores, store_timeout)),
        }
    }
}

impl core::fmt::Debug for Services {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
