//! Identity record and the inputs that create or change one.
//!
//! `User` is a plain record: it carries no behaviour beyond validation of the
//! inputs that produce it. Uniqueness of `email` and `cellphone` is enforced by
//! the credential store, not here.

use chrono::{DateTime, Utc};

use pms_core::{require_non_blank, DomainError, DomainResult, Entity, UserId};

use crate::Role;

/// Minimum accepted password length (in characters).
pub const MIN_PASSWORD_LEN: usize = 2;

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

/// A registered identity.
///
/// # Invariants
/// - `email` and `cellphone` are unique across all identities (store-enforced).
/// - `password_hash` is a PHC string, never the plaintext and never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub cellphone: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a fresh identity from validated registration data and a digest.
    pub fn register(registration: Registration, password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            full_name: registration.full_name,
            email: registration.email,
            cellphone: registration.cellphone,
            password_hash,
            role: registration.role.unwrap_or_else(Role::least_privileged),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a profile update. An omitted role keeps the current one.
    pub fn apply(&mut self, update: UserUpdate, now: DateTime<Utc>) {
        self.full_name = update.full_name;
        self.email = update.email;
        self.cellphone = update.cellphone;
        if let Some(role) = update.role {
            self.role = role;
        }
        self.updated_at = now;
    }

    pub fn change_role(&mut self, role: Role, now: DateTime<Utc>) {
        self.role = role;
        self.updated_at = now;
    }
}

impl Entity for User {
    type Id = UserId;
    const RESOURCE: &'static str = "User";

    fn id(&self) -> UserId {
        self.id
    }
}

impl core::fmt::Debug for User {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("cellphone", &self.cellphone)
            .field("password_hash", &"<redacted>")
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inputs
// ─────────────────────────────────────────────────────────────────────────────

/// Self-service registration input.
#[derive(Clone)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub cellphone: String,
    pub password: String,
    pub role: Option<Role>,
}

impl Registration {
    /// Shape checks only. Emails are stored as given (no case folding).
    pub fn validate(&self) -> DomainResult<()> {
        require_non_blank("fullName", &self.full_name)?;
        validate_email(&self.email)?;
        require_non_blank("cellphone", &self.cellphone)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }
}

impl core::fmt::Debug for Registration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registration")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("cellphone", &self.cellphone)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// Administrative profile update. Passwords are not changed through this path.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub full_name: String,
    pub email: String,
    pub cellphone: String,
    pub role: Option<Role>,
}

impl UserUpdate {
    pub fn validate(&self) -> DomainResult<()> {
        require_non_blank("fullName", &self.full_name)?;
        validate_email(&self.email)?;
        require_non_blank("cellphone", &self.cellphone)
    }
}

fn validate_email(email: &str) -> DomainResult<()> {
    require_non_blank("email", email)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(DomainError::validation("email must be a valid address")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(role: Option<Role>) -> Registration {
        Registration {
            full_name: "Jane Doe".to_string(),
            email: "jane@x.com".to_string(),
            cellphone: "0800000000".to_string(),
            password: "ab".to_string(),
            role,
        }
    }

    #[test]
    fn omitted_role_defaults_to_student() {
        let user = User::register(registration(None), "$argon2id$stub".to_string(), Utc::now());
        assert_eq!(user.role, Role::Student);
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn two_character_password_is_accepted() {
        assert!(registration(None).validate().is_ok());
    }

    #[test]
    fn one_character_password_is_rejected() {
        let mut r = registration(None);
        r.password = "a".to_string();
        assert!(matches!(r.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn malformed_email_is_rejected() {
        let mut r = registration(None);
        r.email = "jane.x.com".to_string();
        assert!(r.validate().is_err());
    }

    #[test]
    fn email_case_is_preserved() {
        let mut r = registration(None);
        r.email = "Jane@X.com".to_string();
        let user = User::register(r, "h".to_string(), Utc::now());
        assert_eq!(user.email, "Jane@X.com");
    }

    #[test]
    fn debug_output_hides_secrets() {
        let r = registration(Some(Role::Admin));
        let rendered = format!("{r:?}");
        assert!(!rendered.contains("\"ab\""));

        let user = User::register(r, "$argon2id$secret-digest".to_string(), Utc::now());
        assert!(!format!("{user:?}").contains("secret-digest"));
    }

    #[test]
    fn update_without_role_keeps_existing_role() {
        let mut user = User::register(registration(Some(Role::Facilitator)), "h".to_string(), Utc::now());
        user.apply(
            UserUpdate {
                full_name: "Jane D".to_string(),
                email: "jd@x.com".to_string(),
                cellphone: "0811111111".to_string(),
                role: None,
            },
            Utc::now(),
        );
        assert_eq!(user.role, Role::Facilitator);
        assert_eq!(user.email, "jd@x.com");
    }
}
