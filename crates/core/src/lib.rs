//! `pms-core`: shared domain building blocks (ids, errors, entity contract).
//!
//! This crate has no infrastructure concerns.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{require_non_blank, DomainError, DomainResult};
pub use id::{CohortId, StudentId, UserId};
