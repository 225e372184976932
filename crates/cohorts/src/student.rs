use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pms_core::{require_non_blank, CohortId, DomainError, DomainResult, Entity, StudentId, UserId};

/// Upper bound of `progress` (a percentage).
pub const MAX_PROGRESS: i32 = 100;

/// Enrolment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudentStatus {
    #[default]
    Active,
    Completed,
    Dropped,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown student status '{0}'")]
pub struct UnknownStatus(pub String);

impl StudentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Active => "ACTIVE",
            StudentStatus::Completed => "COMPLETED",
            StudentStatus::Dropped => "DROPPED",
        }
    }
}

impl FromStr for StudentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(StudentStatus::Active),
            "COMPLETED" => Ok(StudentStatus::Completed),
            "DROPPED" => Ok(StudentStatus::Dropped),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl core::fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A student enrolled in exactly one cohort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub id: StudentId,
    pub full_names: String,
    pub email_address: String,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub home_address: Option<String>,
    pub cohort_id: CohortId,
    pub qualification: Option<String>,
    pub progress: i32,
    pub status: StudentStatus,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentDraft {
    pub full_names: String,
    pub email_address: String,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub home_address: Option<String>,
    pub cohort_id: CohortId,
    pub qualification: Option<String>,
    pub progress: i32,
    pub status: StudentStatus,
}

impl StudentDraft {
    pub fn validate(&self) -> DomainResult<()> {
        require_non_blank("fullNames", &self.full_names)?;
        require_non_blank("emailAddress", &self.email_address)?;
        if !self.email_address.contains('@') {
            return Err(DomainError::validation("emailAddress must be a valid address"));
        }
        if !(0..=MAX_PROGRESS).contains(&self.progress) {
            return Err(DomainError::validation(format!(
                "progress must be between 0 and {MAX_PROGRESS}"
            )));
        }
        Ok(())
    }
}

impl Student {
    pub fn create(draft: StudentDraft, created_by: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: StudentId::new(),
            full_names: draft.full_names,
            email_address: draft.email_address,
            phone_number: draft.phone_number,
            date_of_birth: draft.date_of_birth,
            home_address: draft.home_address,
            cohort_id: draft.cohort_id,
            qualification: draft.qualification,
            progress: draft.progress,
            status: draft.status,
            created_by,
            created_at: now,
            last_updated: now,
        }
    }

    pub fn apply(&mut self, draft: StudentDraft, now: DateTime<Utc>) {
        self.full_names = draft.full_names;
        self.email_address = draft.email_address;
        self.phone_number = draft.phone_number;
        self.date_of_birth = draft.date_of_birth;
        self.home_address = draft.home_address;
        self.cohort_id = draft.cohort_id;
        self.qualification = draft.qualification;
        self.progress = draft.progress;
        self.status = draft.status;
        self.last_updated = now;
    }
}

impl Entity for Student {
    type Id = StudentId;
    const RESOURCE: &'static str = "Student";

    fn id(&self) -> StudentId {
        self.id
    }
}
