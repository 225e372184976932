use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument};

use pms_auth::{SecurityContext, User};
use pms_cohorts::{Cohort, Student, StudentDraft};
use pms_core::{CohortId, Entity, StudentId, UserId};

use super::{bounded, CohortSummary, Operation, ServiceError};
use crate::store::Stores;

const STUDENT: &str = Student::RESOURCE;
const COHORT: &str = Cohort::RESOURCE;
const USER: &str = User::RESOURCE;

/// A student with its cohort (and that cohort's facilitator) and creator resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentDetails {
    pub student: Student,
    pub cohort: Option<CohortSummary>,
    pub created_by: Option<User>,
}

pub struct StudentService {
    stores: Stores,
    store_timeout: Duration,
}

impl StudentService {
    pub fn new(stores: Stores, store_timeout: Duration) -> Self {
        Self {
            stores,
            store_timeout,
        }
    }

    /// Enrol a student in an existing cohort, owned by the caller.
    #[instrument(skip_all, err)]
    pub async fn create(
        &self,
        ctx: &SecurityContext,
        draft: StudentDraft,
    ) -> Result<StudentDetails, ServiceError> {
        let principal = Operation::CreateStudent.authorize(ctx)?;
        draft.validate()?;
        self.require_cohort(draft.cohort_id).await?;

        let student = Student::create(draft, principal.user_id, Utc::now());
        let id = student.id;
        let student = bounded(
            self.store_timeout,
            "insert_student",
            self.stores.students.insert_student(student),
        )
        .await
        .map_err(|e| ServiceError::from_store(e, STUDENT, id))?;

        info!(student_id = %student.id, actor = %principal.user_id, "student created");
        self.details(student).await
    }

    pub async fn get(
        &self,
        ctx: &SecurityContext,
        id: StudentId,
    ) -> Result<StudentDetails, ServiceError> {
        Operation::GetStudent.authorize(ctx)?;
        let student = self.require_student(id).await?;
        self.details(student).await
    }

    pub async fn list(&self, ctx: &SecurityContext) -> Result<Vec<StudentDetails>, ServiceError> {
        Operation::ListStudents.authorize(ctx)?;
        let students = bounded(
            self.store_timeout,
            "list_students",
            self.stores.students.list_students(),
        )
        .await
        .map_err(|e| ServiceError::from_store(e, STUDENT, "*"))?;

        let mut out = Vec::with_capacity(students.len());
        for student in students {
            out.push(self.details(student).await?);
        }
        Ok(out)
    }

    /// Replace the editable fields. A changed cohort is re-resolved.
    #[instrument(skip(self, ctx, draft), fields(student_id = %id), err)]
    pub async fn update(
        &self,
        ctx: &SecurityContext,
        id: StudentId,
        draft: StudentDraft,
    ) -> Result<StudentDetails, ServiceError> {
        let principal = Operation::UpdateStudent.authorize(ctx)?;
        draft.validate()?;

        let mut student = self.require_student(id).await?;
        if student.cohort_id != draft.cohort_id {
            self.require_cohort(draft.cohort_id).await?;
        }

        student.apply(draft, Utc::now());
        let student = bounded(
            self.store_timeout,
            "update_student",
            self.stores.students.update_student(student),
        )
        .await
        .map_err(|e| ServiceError::from_store(e, STUDENT, id))?;

        info!(actor = %principal.user_id, "student updated");
        self.details(student).await
    }

    #[instrument(skip(self, ctx), fields(student_id = %id), err)]
    pub async fn delete(&self, ctx: &SecurityContext, id: StudentId) -> Result<(), ServiceError> {
        let principal = Operation::DeleteStudent.authorize(ctx)?;
        bounded(
            self.store_timeout,
            "delete_student",
            self.stores.students.delete_student(id),
        )
        .await
        .map_err(|e| ServiceError::from_store(e, STUDENT, id))?;
        info!(actor = %principal.user_id, "student deleted");
        Ok(())
    }

    async fn require_student(&self, id: StudentId) -> Result<Student, ServiceError> {
        bounded(self.store_timeout, "find_student", self.stores.students.find_student(id))
            .await
            .map_err(|e| ServiceError::from_store(e, STUDENT, id))?
            .ok_or_else(|| ServiceError::not_found(STUDENT, id))
    }

    async fn require_cohort(&self, id: CohortId) -> Result<Cohort, ServiceError> {
        self.find_cohort(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(COHORT, id))
    }

    async fn find_cohort(&self, id: CohortId) -> Result<Option<Cohort>, ServiceError> {
        bounded(self.store_timeout, "find_cohort", self.stores.cohorts.find_cohort(id))
            .await
            .map_err(|e| ServiceError::from_store(e, COHORT, id))
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, ServiceError> {
        bounded(self.store_timeout, "find_user", self.stores.users.find_user(id))
            .await
            .map_err(|e| ServiceError::from_store(e, USER, id))
    }

    async fn details(&self, student: Student) -> Result<StudentDetails, ServiceError> {
        let cohort = match self.find_cohort(student.cohort_id).await? {
            Some(cohort) => {
                let facilitator = self.find_user(cohort.facilitator_id).await?;
                Some(CohortSummary { cohort, facilitator })
            }
            None => None,
        };
        let created_by = self.find_user(student.created_by).await?;
        Ok(StudentDetails {
            student,
            cohort,
            created_by,
        })
    }
}
