use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use pms_auth::User;
use pms_cohorts::{Cohort, Student};
use pms_core::{CohortId, StudentId, UserId};

use super::r#trait::{CohortStore, StoreError, StudentStore, UserStore};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    cohorts: HashMap<CohortId, Cohort>,
    students: HashMap<StudentId, Student>,
}

impl Tables {
    fn user_collision(&self, candidate: &User) -> Option<&'static str> {
        let others = self.users.values().filter(|u| u.id != candidate.id);
        let mut email = false;
        let mut cellphone = false;
        for u in others {
            email |= u.email == candidate.email;
            cellphone |= u.cellphone == candidate.cellphone;
        }
        if email {
            Some("email")
        } else if cellphone {
            Some("cellphone")
        } else {
            None
        }
    }

    fn cohort_name_taken(&self, candidate: &Cohort) -> bool {
        self.cohorts
            .values()
            .any(|c| c.id != candidate.id && c.cohort_name == candidate.cohort_name)
    }

    fn student_email_taken(&self, candidate: &Student) -> bool {
        self.students
            .values()
            .any(|s| s.id != candidate.id && s.email_address == candidate.email_address)
    }

    fn check_cohort_refs(&self, cohort: &Cohort) -> Result<(), StoreError> {
        if !self.users.contains_key(&cohort.facilitator_id) {
            return Err(StoreError::Conflict(format!(
                "facilitator {} does not exist",
                cohort.facilitator_id
            )));
        }
        if !self.users.contains_key(&cohort.created_by) {
            return Err(StoreError::Conflict(format!(
                "creator {} does not exist",
                cohort.created_by
            )));
        }
        Ok(())
    }

    fn check_student_refs(&self, student: &Student) -> Result<(), StoreError> {
        if !self.cohorts.contains_key(&student.cohort_id) {
            return Err(StoreError::Conflict(format!(
                "cohort {} does not exist",
                student.cohort_id
            )));
        }
        if !self.users.contains_key(&student.created_by) {
            return Err(StoreError::Conflict(format!(
                "creator {} does not exist",
                student.created_by
            )));
        }
        Ok(())
    }

    fn user_is_referenced(&self, id: UserId) -> bool {
        self.cohorts
            .values()
            .any(|c| c.facilitator_id == id || c.created_by == id)
            || self.students.values().any(|s| s.created_by == id)
    }
}

/// In-memory store for tests/dev.
///
/// All three tables sit behind one `RwLock`, so every mutation (uniqueness
/// check included) is a single critical section.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let mut tables = self.write()?;
        if let Some(field) = tables.user_collision(&user) {
            return Err(StoreError::Duplicate { field });
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_cellphone(&self, cellphone: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.cellphone == cellphone)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.read()?.users.values().cloned().collect();
        users.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
        });
        Ok(users)
    }

    async fn update_user(&self, user: User) -> Result<User, StoreError> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&user.id) {
            return Err(StoreError::NotFound);
        }
        if let Some(field) = tables.user_collision(&user) {
            return Err(StoreError::Duplicate { field });
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        if tables.user_is_referenced(id) {
            return Err(StoreError::Conflict(format!(
                "user {id} is referenced by cohorts or students"
            )));
        }
        tables.users.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl CohortStore for InMemoryStore {
    async fn insert_cohort(&self, cohort: Cohort) -> Result<Cohort, StoreError> {
        let mut tables = self.write()?;
        if tables.cohort_name_taken(&cohort) {
            return Err(StoreError::Duplicate { field: "cohortName" });
        }
        tables.check_cohort_refs(&cohort)?;
        tables.cohorts.insert(cohort.id, cohort.clone());
        Ok(cohort)
    }

    async fn find_cohort(&self, id: CohortId) -> Result<Option<Cohort>, StoreError> {
        Ok(self.read()?.cohorts.get(&id).cloned())
    }

    async fn list_cohorts(&self) -> Result<Vec<Cohort>, StoreError> {
        let mut cohorts: Vec<Cohort> = self.read()?.cohorts.values().cloned().collect();
        cohorts.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
        });
        Ok(cohorts)
    }

    async fn update_cohort(&self, cohort: Cohort) -> Result<Cohort, StoreError> {
        let mut tables = self.write()?;
        if !tables.cohorts.contains_key(&cohort.id) {
            return Err(StoreError::NotFound);
        }
        if tables.cohort_name_taken(&cohort) {
            return Err(StoreError::Duplicate { field: "cohortName" });
        }
        tables.check_cohort_refs(&cohort)?;
        tables.cohorts.insert(cohort.id, cohort.clone());
        Ok(cohort)
    }

    async fn delete_cohort(&self, id: CohortId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if !tables.cohorts.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        if tables.students.values().any(|s| s.cohort_id == id) {
            return Err(StoreError::Conflict(format!(
                "cohort {id} still has enrolled students"
            )));
        }
        tables.cohorts.remove(&id);
        Ok(())
    }

    async fn cohort_has_students(&self, id: CohortId) -> Result<bool, StoreError> {
        Ok(self.read()?.students.values().any(|s| s.cohort_id == id))
    }
}

#[async_trait]
impl StudentStore for InMemoryStore {
    async fn insert_student(&self, student: Student) -> Result<Student, StoreError> {
        let mut tables = self.write()?;
        if tables.student_email_taken(&student) {
            return Err(StoreError::Duplicate { field: "emailAddress" });
        }
        tables.check_student_refs(&student)?;
        tables.students.insert(student.id, student.clone());
        Ok(student)
    }

    async fn find_student(&self, id: StudentId) -> Result<Option<Student>, StoreError> {
        Ok(self.read()?.students.get(&id).cloned())
    }

    async fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        let mut students: Vec<Student> = self.read()?.students.values().cloned().collect();
        students.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
        });
        Ok(students)
    }

    async fn update_student(&self, student: Student) -> Result<Student, StoreError> {
        let mut tables = self.write()?;
        if !tables.students.contains_key(&student.id) {
            return Err(StoreError::NotFound);
        }
        if tables.student_email_taken(&student) {
            return Err(StoreError::Duplicate { field: "emailAddress" });
        }
        tables.check_student_refs(&student)?;
        tables.students.insert(student.id, student.clone());
        Ok(student)
    }

    async fn delete_student(&self, id: StudentId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.students.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pms_auth::{Registration, Role};
    use pms_cohorts::{CohortDraft, StudentDraft, StudentStatus};

    fn user(email: &str, cellphone: &str) -> User {
        User::register(
            Registration {
                full_name: "Jane Doe".to_string(),
                email: email.to_string(),
                cellphone: cellphone.to_string(),
                password: "ab".to_string(),
                role: Some(Role::Admin),
            },
            "$argon2id$stub".to_string(),
            Utc::now(),
        )
    }

    fn cohort(name: &str, owner: UserId) -> Cohort {
        Cohort::create(
            CohortDraft {
                cohort_name: name.to_string(),
                duration: None,
                start_date: None,
                image_url: None,
                facilitator_id: owner,
            },
            owner,
            Utc::now(),
        )
    }

    fn student(email: &str, cohort_id: CohortId, owner: UserId) -> Student {
        Student::create(
            StudentDraft {
                full_names: "Thabo Mokoena".to_string(),
                email_address: email.to_string(),
                phone_number: None,
                date_of_birth: None,
                home_address: None,
                cohort_id,
                qualification: None,
                progress: 0,
                status: StudentStatus::Active,
            },
            owner,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn email_collision_is_reported_before_cellphone() {
        let store = InMemoryStore::new();
        store.insert_user(user("a@x.com", "1")).await.unwrap();

        let err = store.insert_user(user("a@x.com", "1")).await.unwrap_err();
        assert_eq!(err, StoreError::Duplicate { field: "email" });

        let err = store.insert_user(user("b@x.com", "1")).await.unwrap_err();
        assert_eq!(err, StoreError::Duplicate { field: "cellphone" });
    }

    #[tokio::test]
    async fn updating_a_user_to_its_own_email_is_not_a_collision() {
        let store = InMemoryStore::new();
        let mut u = store.insert_user(user("a@x.com", "1")).await.unwrap();
        u.full_name = "Renamed".to_string();
        assert!(store.update_user(u).await.is_ok());
    }

    #[tokio::test]
    async fn cohort_with_students_cannot_be_deleted() {
        let store = InMemoryStore::new();
        let owner = store.insert_user(user("a@x.com", "1")).await.unwrap();
        let c = store.insert_cohort(cohort("C1", owner.id)).await.unwrap();
        let s = store.insert_student(student("s@x.com", c.id, owner.id)).await.unwrap();

        assert!(store.cohort_has_students(c.id).await.unwrap());
        assert!(matches!(store.delete_cohort(c.id).await, Err(StoreError::Conflict(_))));

        store.delete_student(s.id).await.unwrap();
        assert!(store.delete_cohort(c.id).await.is_ok());
    }

    #[tokio::test]
    async fn student_needs_an_existing_cohort() {
        let store = InMemoryStore::new();
        let owner = store.insert_user(user("a@x.com", "1")).await.unwrap();
        let err = store
            .insert_student(student("s@x.com", CohortId::new(), owner.id))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn referenced_user_cannot_be_deleted() {
        let store = InMemoryStore::new();
        let owner = store.insert_user(user("a@x.com", "1")).await.unwrap();
        store.insert_cohort(cohort("C1", owner.id)).await.unwrap();
        assert!(matches!(store.delete_user(owner.id).await, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn deleting_missing_records_is_not_found() {
        let store = InMemoryStore::new();
        assert_eq!(store.delete_user(UserId::new()).await, Err(StoreError::NotFound));
        assert_eq!(store.delete_student(StudentId::new()).await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn duplicate_cohort_name_is_rejected() {
        let store = InMemoryStore::new();
        let owner = store.insert_user(user("a@x.com", "1")).await.unwrap();
        store.insert_cohort(cohort("C1", owner.id)).await.unwrap();
        let err = store.insert_cohort(cohort("C1", owner.id)).await.unwrap_err();
        assert_eq!(err, StoreError::Duplicate { field: "cohortName" });
    }
}
