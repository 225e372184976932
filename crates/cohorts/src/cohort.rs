use chrono::{DateTime, NaiveDate, Utc};

use pms_core::{require_non_blank, CohortId, DomainError, DomainResult, Entity, UserId};

/// Longest accepted `image_url`, in characters.
pub const MAX_IMAGE_URL_LEN: usize = 500;

/// A cohort: a named group of students led by one facilitator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cohort {
    pub id: CohortId,
    pub cohort_name: String,
    pub duration: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub image_url: Option<String>,
    pub facilitator_id: UserId,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied cohort fields, used for both create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortDraft {
    pub cohort_name: String,
    pub duration: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub image_url: Option<String>,
    pub facilitator_id: UserId,
}

impl CohortDraft {
    pub fn validate(&self) -> DomainResult<()> {
        require_non_blank("cohortName", &self.cohort_name)?;
        if let Some(url) = &self.image_url {
            if url.chars().count() > MAX_IMAGE_URL_LEN {
                return Err(DomainError::validation(format!(
                    "imageUrl must be at most {MAX_IMAGE_URL_LEN} characters"
                )));
            }
        }
        Ok(())
    }
}

impl Cohort {
    pub fn create(draft: CohortDraft, created_by: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: CohortId::new(),
            cohort_name: draft.cohort_name,
            duration: draft.duration,
            start_date: draft.start_date,
            image_url: draft.image_url,
            facilitator_id: draft.facilitator_id,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace every editable field. `id`, `created_by` and `created_at` never change.
    pub fn apply(&mut self, draft: CohortDraft, now: DateTime<Utc>) {
        self.cohort_name = draft.cohort_name;
        self.duration = draft.duration;
        self.start_date = draft.start_date;
        self.image_url = draft.image_url;
        self.facilitator_id = draft.facilitator_id;
        self.updated_at = now;
    }
}

impl Entity for Cohort {
    type Id = CohortId;
    const RESOURCE: &'static str = "Cohort";

    fn id(&self) -> CohortId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn draft() -> CohortDraft {
        CohortDraft {
            cohort_name: "2026 Java Bootcamp".to_string(),
            duration: Some("12 weeks".to_string()),
            start_date: NaiveDate::from_ymd_opt(2026, 2, 1),
            image_url: None,
            facilitator_id: UserId::new(),
        }
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut d = draft();
        d.cohort_name = " ".to_string();
        assert!(matches!(d.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn image_url_is_bounded() {
        let mut d = draft();
        d.image_url = Some("x".repeat(MAX_IMAGE_URL_LEN));
        assert!(d.validate().is_ok());
        d.image_url = Some("x".repeat(MAX_IMAGE_URL_LEN + 1));
        assert!(d.validate().is_err());
    }

    #[test]
    fn apply_keeps_identity_and_creator() {
        let creator = UserId::new();
        let t0 = Utc::now();
        let mut cohort = Cohort::create(draft(), creator, t0);
        let id = cohort.id;

        let mut next = draft();
        next.cohort_name = "Renamed".to_string();
        cohort.apply(next, t0 + Duration::minutes(5));

        assert_eq!(cohort.id, id);
        assert_eq!(cohort.created_by, creator);
        assert_eq!(cohort.created_at, t0);
        assert_eq!(cohort.cohort_name, "Renamed");
        assert!(cohort.updated_at > cohort.created_at);
    }
}
