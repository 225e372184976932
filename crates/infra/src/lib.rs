//! Infrastructure layer: stores and the resource services built on them.

pub mod services;
pub mod store;

pub use services::{
    AccountService, CohortDetails, CohortService, CohortSummary, Operation, ServiceError, Services,
    StudentDetails, StudentService,
};
pub use store::{
    CohortStore, InMemoryStore, PostgresStore, StoreError, StoreIdentityLookup, Stores,
    StudentStore, UserStore,
};
