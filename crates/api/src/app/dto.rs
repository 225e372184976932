//! Request/response bodies. Field names are camelCase on the wire.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use pms_auth::{Registration, Role, User, UserUpdate};
use pms_cohorts::{CohortDraft, StudentDraft, StudentStatus};
use pms_core::{CohortId, StudentId, UserId};
use pms_infra::{CohortDetails, CohortSummary, StudentDetails};

// -------------------------
// Request DTOs
// -------------------------

// No `Debug` on bodies that carry a password.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub cellphone: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

impl From<RegisterRequest> for Registration {
    fn from(body: RegisterRequest) -> Self {
        Registration {
            full_name: body.full_name,
            email: body.email,
            cellphone: body.cellphone,
            password: body.password,
            role: body.role,
        }
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateRequest {
    pub full_name: String,
    pub email: String,
    pub cellphone: String,
    #[serde(default)]
    pub role: Option<Role>,
}

impl From<UserUpdateRequest> for UserUpdate {
    fn from(body: UserUpdateRequest) -> Self {
        UserUpdate {
            full_name: body.full_name,
            email: body.email,
            cellphone: body.cellphone,
            role: body.role,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RoleChangeRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortRequest {
    pub cohort_name: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub facilitator_id: UserId,
}

impl From<CohortRequest> for CohortDraft {
    fn from(body: CohortRequest) -> Self {
        CohortDraft {
            cohort_name: body.cohort_name,
            duration: body.duration,
            start_date: body.start_date,
            image_url: body.image_url,
            facilitator_id: body.facilitator_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRequest {
    pub full_names: String,
    pub email_address: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub home_address: Option<String>,
    pub cohort_id: CohortId,
    #[serde(default)]
    pub qualification: Option<String>,
    #[serde(default)]
    pub progress: i32,
    #[serde(default)]
    pub status: StudentStatus,
}

impl From<StudentRequest> for StudentDraft {
    fn from(body: StudentRequest) -> Self {
        StudentDraft {
            full_names: body.full_names,
            email_address: body.email_address,
            phone_number: body.phone_number,
            date_of_birth: body.date_of_birth,
            home_address: body.home_address,
            cohort_id: body.cohort_id,
            qualification: body.qualification,
            progress: body.progress,
            status: body.status,
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

/// Full user view. Never carries the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub cellphone: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            full_name: u.full_name,
            email: u.email,
            cellphone: u.cellphone,
            role: u.role,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Embedded user reference (facilitator, creator).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for UserSummary {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            full_name: u.full_name,
            email: u.email,
            role: u.role,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortResponse {
    pub id: CohortId,
    pub cohort_name: String,
    pub duration: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub image_url: Option<String>,
    pub facilitator: Option<UserSummary>,
    pub created_by: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CohortDetails> for CohortResponse {
    fn from(d: CohortDetails) -> Self {
        let c = d.cohort;
        Self {
            id: c.id,
            cohort_name: c.cohort_name,
            duration: c.duration,
            start_date: c.start_date,
            image_url: c.image_url,
            facilitator: d.facilitator.map(UserSummary::from),
            created_by: d.created_by.map(UserSummary::from),
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Cohort as embedded in a student response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortSummaryResponse {
    pub id: CohortId,
    pub cohort_name: String,
    pub duration: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub image_url: Option<String>,
    pub facilitator: Option<UserSummary>,
}

impl From<CohortSummary> for CohortSummaryResponse {
    fn from(s: CohortSummary) -> Self {
        let c = s.cohort;
        Self {
            id: c.id,
            cohort_name: c.cohort_name,
            duration: c.duration,
            start_date: c.start_date,
            image_url: c.image_url,
            facilitator: s.facilitator.map(UserSummary::from),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentResponse {
    pub id: StudentId,
    pub full_names: String,
    pub email_address: String,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub home_address: Option<String>,
    pub cohort: Option<CohortSummaryResponse>,
    pub qualification: Option<String>,
    pub progress: i32,
    pub status: StudentStatus,
    pub created_by: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl From<StudentDetails> for StudentResponse {
    fn from(d: StudentDetails) -> Self {
        let s = d.student;
        Self {
            id: s.id,
            full_names: s.full_names,
            email_address: s.email_address,
            phone_number: s.phone_number,
            date_of_birth: s.date_of_birth,
            home_address: s.home_address,
            cohort: d.cohort.map(CohortSummaryResponse::from),
            qualification: s.qualification,
            progress: s.progress,
            status: s.status,
            created_by: d.created_by.map(UserSummary::from),
            created_at: s.created_at,
            last_updated: s.last_updated,
        }
    }
}
