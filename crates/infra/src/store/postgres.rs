//! Postgres-backed store implementation.
//!
//! One `PostgresStore` serves all three store traits over a shared pool. Each
//! mutation is a single statement, so uniqueness and referential integrity are
//! enforced by the schema constraints rather than by read-then-write checks.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Duplicate { field }` | Field named after the violated constraint |
//! | Database (foreign key violation) | `23503` | `Conflict` | Missing parent, or children still reference the row |
//! | Database (other) | Any other | `Backend` | Check constraints, syntax, permissions |
//! | PoolClosed / Io / Tls / other | N/A | `Backend` | Network and connection failures |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Row};
use tracing::{info, instrument};

use pms_auth::{Role, User};
use pms_cohorts::{Cohort, Student, StudentStatus};
use pms_core::{CohortId, StudentId, UserId};

use super::r#trait::{CohortStore, StoreError, StudentStore, UserStore};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const USER_COLUMNS: &str =
    "id, full_name, email, cellphone, password_hash, role, created_at, updated_at";
const COHORT_COLUMNS: &str = "id, cohort_name, duration, start_date, image_url, facilitator_id, \
     created_by, created_at, updated_at";
const STUDENT_COLUMNS: &str = "id, full_names, email_address, phone_number, date_of_birth, \
     home_address, cohort_id, qualification, progress, status, created_by, created_at, last_updated";

/// Postgres-backed store for identities, cohorts and students.
///
/// ## Thread Safety
///
/// Uses the SQLx connection pool, which is `Send + Sync`; clones share the pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the schema. Safe to run on every startup.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        info!("schema up to date");
        Ok(())
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, full_name, email, cellphone, password_hash, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.cellphone)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user", e))?;
        row.map(|r| decode::<UserRow, User>(&r)).transpose()
    }

    #[instrument(skip_all, err)]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.map(|r| decode::<UserRow, User>(&r)).transpose()
    }

    #[instrument(skip_all, err)]
    async fn find_user_by_cellphone(&self, cellphone: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE cellphone = $1"))
            .bind(cellphone)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_cellphone", e))?;
        row.map(|r| decode::<UserRow, User>(&r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(decode::<UserRow, User>).collect()
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update_user(&self, user: User) -> Result<User, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET full_name = $2, email = $3, cellphone = $4, password_hash = $5, role = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.cellphone)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CohortStore for PostgresStore {
    #[instrument(skip(self, cohort), fields(cohort_id = %cohort.id), err)]
    async fn insert_cohort(&self, cohort: Cohort) -> Result<Cohort, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO cohorts (id, cohort_name, duration, start_date, image_url, facilitator_id, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(cohort.id.as_uuid())
        .bind(&cohort.cohort_name)
        .bind(&cohort.duration)
        .bind(cohort.start_date)
        .bind(&cohort.image_url)
        .bind(cohort.facilitator_id.as_uuid())
        .bind(cohort.created_by.as_uuid())
        .bind(cohort.created_at)
        .bind(cohort.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_cohort", e))?;
        Ok(cohort)
    }

    #[instrument(skip(self), fields(cohort_id = %id), err)]
    async fn find_cohort(&self, id: CohortId) -> Result<Option<Cohort>, StoreError> {
        let row = sqlx::query(&format!("SELECT {COHORT_COLUMNS} FROM cohorts WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_cohort", e))?;
        row.map(|r| decode::<CohortRow, Cohort>(&r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_cohorts(&self) -> Result<Vec<Cohort>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {COHORT_COLUMNS} FROM cohorts ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_cohorts", e))?;
        rows.iter().map(decode::<CohortRow, Cohort>).collect()
    }

    #[instrument(skip(self, cohort), fields(cohort_id = %cohort.id), err)]
    async fn update_cohort(&self, cohort: Cohort) -> Result<Cohort, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE cohorts
            SET cohort_name = $2, duration = $3, start_date = $4, image_url = $5, facilitator_id = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(cohort.id.as_uuid())
        .bind(&cohort.cohort_name)
        .bind(&cohort.duration)
        .bind(cohort.start_date)
        .bind(&cohort.image_url)
        .bind(cohort.facilitator_id.as_uuid())
        .bind(cohort.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_cohort", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(cohort)
    }

    #[instrument(skip(self), fields(cohort_id = %id), err)]
    async fn delete_cohort(&self, id: CohortId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM cohorts WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_cohort", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(cohort_id = %id), err)]
    async fn cohort_has_students(&self, id: CohortId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM students WHERE cohort_id = $1) AS present")
            .bind(id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("cohort_has_students", e))?;
        row.try_get::<bool, _>("present")
            .map_err(|e| map_sqlx_error("cohort_has_students", e))
    }
}

#[async_trait]
impl StudentStore for PostgresStore {
    #[instrument(skip(self, student), fields(student_id = %student.id), err)]
    async fn insert_student(&self, student: Student) -> Result<Student, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO students (
                id, full_names, email_address, phone_number, date_of_birth, home_address,
                cohort_id, qualification, progress, status, created_by, created_at, last_updated
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(student.id.as_uuid())
        .bind(&student.full_names)
        .bind(&student.email_address)
        .bind(&student.phone_number)
        .bind(student.date_of_birth)
        .bind(&student.home_address)
        .bind(student.cohort_id.as_uuid())
        .bind(&student.qualification)
        .bind(student.progress)
        .bind(student.status.as_str())
        .bind(student.created_by.as_uuid())
        .bind(student.created_at)
        .bind(student.last_updated)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_student", e))?;
        Ok(student)
    }

    #[instrument(skip(self), fields(student_id = %id), err)]
    async fn find_student(&self, id: StudentId) -> Result<Option<Student>, StoreError> {
        let row = sqlx::query(&format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_student", e))?;
        row.map(|r| decode::<StudentRow, Student>(&r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_students", e))?;
        rows.iter().map(decode::<StudentRow, Student>).collect()
    }

    #[instrument(skip(self, student), fields(student_id = %student.id), err)]
    async fn update_student(&self, student: Student) -> Result<Student, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE students
            SET full_names = $2, email_address = $3, phone_number = $4, date_of_birth = $5,
                home_address = $6, cohort_id = $7, qualification = $8, progress = $9,
                status = $10, last_updated = $11
            WHERE id = $1
            "#,
        )
        .bind(student.id.as_uuid())
        .bind(&student.full_names)
        .bind(&student.email_address)
        .bind(&student.phone_number)
        .bind(student.date_of_birth)
        .bind(&student.home_address)
        .bind(student.cohort_id.as_uuid())
        .bind(&student.qualification)
        .bind(student.progress)
        .bind(student.status.as_str())
        .bind(student.last_updated)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_student", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(student)
    }

    #[instrument(skip(self), fields(student_id = %id), err)]
    async fn delete_student(&self, id: StudentId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_student", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

/// Unique-constraint name to the API field it protects.
fn constraint_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_email_key") => "email",
        Some("users_cellphone_key") => "cellphone",
        Some("cohorts_cohort_name_key") => "cohortName",
        Some("students_email_address_key") => "emailAddress",
        _ => "id",
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Duplicate {
                    field: constraint_field(db_err.constraint()),
                },
                Some("23503") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn decode<'r, R, T>(row: &'r PgRow) -> Result<T, StoreError>
where
    R: FromRow<'r, PgRow>,
    T: TryFrom<R, Error = StoreError>,
{
    let raw = R::from_row(row)
        .map_err(|e| StoreError::Backend(format!("failed to decode row: {}", e)))?;
    T::try_from(raw)
}

// SQLx row types

struct UserRow {
    id: uuid::Uuid,
    full_name: String,
    email: String,
    cellphone: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            full_name: row.try_get("full_name")?,
            email: row.try_get("email")?,
            cellphone: row.try_get("cellphone")?,
            password_hash: row.try_get("password_hash")?,
            role: row.try_get("role")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e| StoreError::Backend(format!("users.role: {e}")))?;
        Ok(User {
            id: UserId::from_uuid(row.id),
            full_name: row.full_name,
            email: row.email,
            cellphone: row.cellphone,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

struct CohortRow {
    id: uuid::Uuid,
    cohort_name: String,
    duration: Option<String>,
    start_date: Option<NaiveDate>,
    image_url: Option<String>,
    facilitator_id: uuid::Uuid,
    created_by: uuid::Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for CohortRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CohortRow {
            id: row.try_get("id")?,
            cohort_name: row.try_get("cohort_name")?,
            duration: row.try_get("duration")?,
            start_date: row.try_get("start_date")?,
            image_url: row.try_get("image_url")?,
            facilitator_id: row.try_get("facilitator_id")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<CohortRow> for Cohort {
    type Error = StoreError;

    fn try_from(row: CohortRow) -> Result<Self, Self::Error> {
        Ok(Cohort {
            id: CohortId::from_uuid(row.id),
            cohort_name: row.cohort_name,
            duration: row.duration,
            start_date: row.start_date,
            image_url: row.image_url,
            facilitator_id: UserId::from_uuid(row.facilitator_id),
            created_by: UserId::from_uuid(row.created_by),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

struct StudentRow {
    id: uuid::Uuid,
    full_names: String,
    email_address: String,
    phone_number: Option<String>,
    date_of_birth: Option<NaiveDate>,
    home_address: Option<String>,
    cohort_id: uuid::Uuid,
    qualification: Option<String>,
    progress: i32,
    status: String,
    created_by: uuid::Uuid,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for StudentRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(StudentRow {
            id: row.try_get("id")?,
            full_names: row.try_get("full_names")?,
            email_address: row.try_get("email_address")?,
            phone_number: row.try_get("phone_number")?,
            date_of_birth: row.try_get("date_of_birth")?,
            home_address: row.try_get("home_address")?,
            cohort_id: row.try_get("cohort_id")?,
            qualification: row.try_get("qualification")?,
            progress: row.try_get("progress")?,
            status: row.try_get("status")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            last_updated: row.try_get("last_updated")?,
        })
    }
}

impl TryFrom<StudentRow> for Student {
    type Error = StoreError;

    fn try_from(row: StudentRow) -> Result<Self, Self::Error> {
        let status: StudentStatus = row
            .status
            .parse()
            .map_err(|e| StoreError::Backend(format!("students.status: {e}")))?;
        Ok(Student {
            id: StudentId::from_uuid(row.id),
            full_names: row.full_names,
            email_address: row.email_address,
            phone_number: row.phone_number,
            date_of_birth: row.date_of_birth,
            home_address: row.home_address,
            cohort_id: CohortId::from_uuid(row.cohort_id),
            qualification: row.qualification,
            progress: row.progress,
            status,
            created_by: UserId::from_uuid(row.created_by),
            created_at: row.created_at,
            last_updated: row.last_updated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_constraints_map_to_api_field_names() {
        assert_eq!(constraint_field(Some("users_email_key")), "email");
        assert_eq!(constraint_field(Some("users_cellphone_key")), "cellphone");
        assert_eq!(constraint_field(Some("cohorts_cohort_name_key")), "cohortName");
        assert_eq!(constraint_field(Some("students_email_address_key")), "emailAddress");
        assert_eq!(constraint_field(None), "id");
    }

    #[test]
    fn pool_closed_is_a_backend_error() {
        assert!(matches!(
            map_sqlx_error("find_user", sqlx::Error::PoolClosed),
            StoreError::Backend(_)
        ));
    }

    #[test]
    fn schema_declares_every_mapped_constraint() {
        for name in [
            "users_email_key",
            "users_cellphone_key",
            "cohorts_cohort_name_key",
            "students_email_address_key",
        ] {
            assert!(SCHEMA.contains(name), "missing constraint {name}");
        }
    }
}
