//! Cohorts domain module.
//!
//! Records and input validation for cohorts and the students enrolled in them,
//! implemented as deterministic domain logic (no IO, no HTTP, no storage).
//! Reference checks (facilitator exists, cohort exists) belong to the services
//! that own the stores.

pub mod cohort;
pub mod student;

pub use cohort::{Cohort, CohortDraft, MAX_IMAGE_URL_LEN};
pub use student::{Student, StudentDraft, StudentStatus, UnknownStatus, MAX_PROGRESS};
