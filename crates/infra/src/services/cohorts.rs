use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument};

use pms_auth::{SecurityContext, User};
use pms_cohorts::{Cohort, CohortDraft};
use pms_core::{CohortId, Entity, UserId};

use super::{bounded, Operation, ServiceError};
use crate::store::Stores;

const COHORT: &str = Cohort::RESOURCE;
const USER: &str = User::RESOURCE;

/// A cohort with its facilitator resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortSummary {
    pub cohort: Cohort,
    pub facilitator: Option<User>,
}

/// A cohort with facilitator and creator resolved, as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortDetails {
    pub cohort: Cohort,
    pub facilitator: Option<User>,
    pub created_by: Option<User>,
}

pub struct CohortService {
    stores: Stores,
    store_timeout: Duration,
}

impl CohortService {
    pub fn new(stores: Stores, store_timeout: Duration) -> Self {
        Self {
            stores,
            store_timeout,
        }
    }

    /// Create a cohort owned by the caller. The facilitator must exist.
    #[instrument(skip_all, err)]
    pub async fn create(
        &self,
        ctx: &SecurityContext,
        draft: CohortDraft,
    ) -> Result<CohortDetails, ServiceError> {
        let principal = Operation::CreateCohort.authorize(ctx)?;
        draft.validate()?;
        self.require_user(draft.facilitator_id).await?;

        let cohort = Cohort::create(draft, principal.user_id, Utc::now());
        let id = cohort.id;
        let cohort = bounded(
            self.store_timeout,
            "insert_cohort",
            self.stores.cohorts.insert_cohort(cohort),
        )
        .await
        .map_err(|e| ServiceError::from_store(e, COHORT, id))?;

        info!(cohort_id = %cohort.id, actor = %principal.user_id, "cohort created");
        self.details(cohort).await
    }

    pub async fn get(&self, ctx: &SecurityContext, id: CohortId) -> Result<CohortDetails, ServiceError> {
        Operation::GetCohort.authorize(ctx)?;
        let cohort = self.require_cohort(id).await?;
        self.details(cohort).await
    }

    pub async fn list(&self, ctx: &SecurityContext) -> Result<Vec<CohortDetails>, ServiceError> {
        Operation::ListCohorts.authorize(ctx)?;
        let cohorts = bounded(self.store_timeout, "list_cohorts", self.stores.cohorts.list_cohorts())
            .await
            .map_err(|e| ServiceError::from_store(e, COHORT, "*"))?;

        let mut out = Vec::with_capacity(cohorts.len());
        for cohort in cohorts {
            out.push(self.details(cohort).await?);
        }
        Ok(out)
    }

    /// Replace the editable fields. A changed facilitator is re-resolved.
    #[instrument(skip(self, ctx, draft), fields(cohort_id = %id), err)]
    pub async fn update(
        &self,
        ctx: &SecurityContext,
        id: CohortId,
        draft: CohortDraft,
    ) -> Result<CohortDetails, ServiceError> {
        let principal = Operation::UpdateCohort.authorize(ctx)?;
        draft.validate()?;

        let mut cohort = self.require_cohort(id).await?;
        if cohort.facilitator_id != draft.facilitator_id {
            self.require_user(draft.facilitator_id).await?;
        }

        cohort.apply(draft, Utc::now());
        let cohort = bounded(
            self.store_timeout,
            "update_cohort",
            self.stores.cohorts.update_cohort(cohort),
        )
        .await
        .map_err(|e| ServiceError::from_store(e, COHORT, id))?;

        info!(actor = %principal.user_id, "cohort updated");
        self.details(cohort).await
    }

    /// Delete an empty cohort. Fails with `Conflict` while students are enrolled.
    #[instrument(skip(self, ctx), fields(cohort_id = %id), err)]
    pub async fn delete(&self, ctx: &SecurityContext, id: CohortId) -> Result<(), ServiceError> {
        let principal = Operation::DeleteCohort.authorize(ctx)?;
        self.require_cohort(id).await?;

        let enrolled = bounded(
            self.store_timeout,
            "cohort_has_students",
            self.stores.cohorts.cohort_has_students(id),
        )
        .await
        .map_err(|e| ServiceError::from_store(e, COHORT, id))?;
        if enrolled {
            return Err(ServiceError::Conflict(format!(
                "Cohort {id} still has enrolled students"
            )));
        }

        bounded(self.store_timeout, "delete_cohort", self.stores.cohorts.delete_cohort(id))
            .await
            .map_err(|e| ServiceError::from_store(e, COHORT, id))?;
        info!(actor = %principal.user_id, "cohort deleted");
        Ok(())
    }

    async fn require_cohort(&self, id: CohortId) -> Result<Cohort, ServiceError> {
        bounded(self.store_timeout, "find_cohort", self.stores.cohorts.find_cohort(id))
            .await
            .map_err(|e| ServiceError::from_store(e, COHORT, id))?
            .ok_or_else(|| ServiceError::not_found(COHORT, id))
    }

    async fn details(&self, cohort: Cohort) -> Result<CohortDetails, ServiceError> {
        let facilitator = self.find_user(cohort.facilitator_id).await?;
        let created_by = if cohort.created_by == cohort.facilitator_id {
            facilitator.clone()
        } else {
            self.find_user(cohort.created_by).await?
        };
        Ok(CohortDetails {
            cohort,
            facilitator,
            created_by,
        })
    }

    async fn require_user(&self, id: UserId) -> Result<User, ServiceError> {
        self.find_user(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(USER, id))
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, ServiceError> {
        bounded(self.store_timeout, "find_user", self.stores.users.find_user(id))
            .await
            .map_err(|e| ServiceError::from_store(e, USER, id))
    }
}
