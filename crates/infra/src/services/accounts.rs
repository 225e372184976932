use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument};

use pms_auth::{
    can_grant, can_manage, PasswordError, PasswordHasher, Registration, Role, SecurityContext, TokenService, User,
    UserUpdate,
};
use pms_core::{Entity, UserId};

use super::{bounded, Operation, ServiceError};
use crate::store::UserStore;

const USER: &str = User::RESOURCE;

/// Registration, login and identity administration.
pub struct AccountService {
    users: Arc<dyn UserStore>,
    hasher: Arc<PasswordHasher>,
    tokens: Arc<TokenService>,
    store_timeout: Duration,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: Arc<PasswordHasher>,
        tokens: Arc<TokenService>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            store_timeout,
        }
    }

    /// Public self-registration. The role defaults to STUDENT when omitted.
    #[instrument(skip_all, err)]
    pub async fn register(&self, registration: Registration) -> Result<User, ServiceError> {
        registration.validate()?;

        // Pre-checks give the field-specific error in a stable order; the
        // store's unique constraints still decide races.
        if self.find_by_email(&registration.email).await?.is_some() {
            return Err(ServiceError::DuplicateIdentity { field: "email" });
        }
        if self.find_by_cellphone(&registration.cellphone).await?.is_some() {
            return Err(ServiceError::DuplicateIdentity { field: "cellphone" });
        }

        let digest = self.hash_password(registration.password.clone()).await?;
        let user = User::register(registration, digest, Utc::now());
        let id = user.id;

        let user = bounded(self.store_timeout, "insert_user", self.users.insert_user(user))
            .await
            .map_err(|e| ServiceError::from_store(e, USER, id))?;

        info!(user_id = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    /// Check credentials and issue a session token.
    ///
    /// Unknown email and wrong password both yield `InvalidCredentials`, after
    /// one password verification either way.
    #[instrument(skip_all, err)]
    pub async fn login(&self, email: &str, password: &str) -> Result<String, ServiceError> {
        let user = self.find_by_email(email).await?;

        let Some(user) = user else {
            let hasher = self.hasher.clone();
            let password = password.to_string();
            tokio::task::spawn_blocking(move || hasher.verify_dummy(&password))
                .await
                .map_err(|e| ServiceError::internal(format!("verify task failed: {e}")))?;
            info!("login rejected");
            return Err(ServiceError::InvalidCredentials);
        };

        let hasher = self.hasher.clone();
        let password = password.to_string();
        let digest = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(|e| ServiceError::internal(format!("verify task failed: {e}")))?;

        if !matches {
            info!(user_id = %user.id, "login rejected");
            return Err(ServiceError::InvalidCredentials);
        }

        let token = self
            .tokens
            .issue(&user)
            .map_err(|e| ServiceError::internal(e.to_string()))?;
        info!(user_id = %user.id, "login succeeded");
        Ok(token)
    }

    /// The caller's own identity.
    pub async fn profile(&self, ctx: &SecurityContext) -> Result<User, ServiceError> {
        let principal = Operation::Profile.authorize(ctx)?;
        self.get(principal.user_id).await
    }

    pub async fn list_users(&self, ctx: &SecurityContext) -> Result<Vec<User>, ServiceError> {
        Operation::ListUsers.authorize(ctx)?;
        bounded(self.store_timeout, "list_users", self.users.list_users())
            .await
            .map_err(|e| ServiceError::from_store(e, USER, "*"))
    }

    /// Replace name, email, cellphone and (optionally) role.
    ///
    /// Only an ADMIN caller may assign the ADMIN role or touch an ADMIN account.
    #[instrument(skip(self, ctx, update), fields(user_id = %id), err)]
    pub async fn update_user(
        &self,
        ctx: &SecurityContext,
        id: UserId,
        update: UserUpdate,
    ) -> Result<User, ServiceError> {
        let principal = Operation::UpdateUser.authorize(ctx)?;
        update.validate()?;

        if let Some(role) = update.role {
            if !can_grant(principal, role) {
                return Err(ServiceError::Forbidden(format!(
                    "only an ADMIN may grant the {role} role"
                )));
            }
        }

        let mut user = self.get(id).await?;
        if !can_manage(principal, user.role) {
            return Err(ServiceError::Forbidden(
                "only an ADMIN may modify an ADMIN account".to_string(),
            ));
        }

        if self
            .find_by_email(&update.email)
            .await?
            .is_some_and(|other| other.id != id)
        {
            return Err(ServiceError::DuplicateIdentity { field: "email" });
        }
        if self
            .find_by_cellphone(&update.cellphone)
            .await?
            .is_some_and(|other| other.id != id)
        {
            return Err(ServiceError::DuplicateIdentity { field: "cellphone" });
        }

        user.apply(update, Utc::now());
        let user = bounded(self.store_timeout, "update_user", self.users.update_user(user))
            .await
            .map_err(|e| ServiceError::from_store(e, USER, id))?;

        info!(actor = %principal.user_id, role = %user.role, "user updated");
        Ok(user)
    }

    #[instrument(skip(self, ctx), fields(user_id = %id), err)]
    pub async fn delete_user(&self, ctx: &SecurityContext, id: UserId) -> Result<(), ServiceError> {
        let principal = Operation::DeleteUser.authorize(ctx)?;
        bounded(self.store_timeout, "delete_user", self.users.delete_user(id))
            .await
            .map_err(|e| ServiceError::from_store(e, USER, id))?;
        info!(actor = %principal.user_id, "user deleted");
        Ok(())
    }

    #[instrument(skip(self, ctx), fields(user_id = %id, role = %role), err)]
    pub async fn change_role(
        &self,
        ctx: &SecurityContext,
        id: UserId,
        role: Role,
    ) -> Result<User, ServiceError> {
        let principal = Operation::ChangeUserRole.authorize(ctx)?;
        if !can_grant(principal, role) {
            return Err(ServiceError::Forbidden(format!(
                "only an ADMIN may grant the {role} role"
            )));
        }

        let mut user = self.get(id).await?;
        user.change_role(role, Utc::now());
        let user = bounded(self.store_timeout, "update_user", self.users.update_user(user))
            .await
            .map_err(|e| ServiceError::from_store(e, USER, id))?;

        info!(actor = %principal.user_id, "role changed");
        Ok(user)
    }

    async fn get(&self, id: UserId) -> Result<User, ServiceError> {
        bounded(self.store_timeout, "find_user", self.users.find_user(id))
            .await
            .map_err(|e| ServiceError::from_store(e, USER, id))?
            .ok_or_else(|| ServiceError::not_found(USER, id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        bounded(self.store_timeout, "find_user_by_email", self.users.find_user_by_email(email))
            .await
            .map_err(|e| ServiceError::from_store(e, USER, "email"))
    }

    async fn find_by_cellphone(&self, cellphone: &str) -> Result<Option<User>, ServiceError> {
        bounded(
            self.store_timeout,
            "find_user_by_cellphone",
            self.users.find_user_by_cellphone(cellphone),
        )
        .await
        .map_err(|e| ServiceError::from_store(e, USER, "cellphone"))
    }

    async fn hash_password(&self, plaintext: String) -> Result<String, ServiceError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| ServiceError::internal(format!("hash task failed: {e}")))?
            .map_err(|e| match e {
                PasswordError::Empty => ServiceError::Validation(e.to_string()),
                other => ServiceError::internal(other.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use pms_auth::{Principal, SigningSecret};

    use crate::store::InMemoryStore;

    struct Fixture {
        accounts: AccountService,
        tokens: Arc<TokenService>,
        hasher: Arc<PasswordHasher>,
        store: Arc<InMemoryStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let hasher = Arc::new(PasswordHasher::with_params(64, 1).unwrap());
        let tokens = Arc::new(
            TokenService::new(SigningSecret::new("test-secret"), ChronoDuration::hours(1)).unwrap(),
        );
        let accounts = AccountService::new(
            store.clone(),
            hasher.clone(),
            tokens.clone(),
            Duration::from_secs(5),
        );
        Fixture {
            accounts,
            tokens,
            hasher,
            store,
        }
    }

    fn jane() -> Registration {
        Registration {
            full_name: "Jane Doe".to_string(),
            email: "jane@x.com".to_string(),
            cellphone: "0800000000".to_string(),
            password: "ab".to_string(),
            role: None,
        }
    }

    fn ctx_for(user: &User) -> SecurityContext {
        SecurityContext::Authenticated(Principal {
            user_id: user.id,
            email: user.email.clone(),
            roles: vec![user.role],
        })
    }

    #[tokio::test]
    async fn registration_defaults_to_student_and_hashes_password() {
        let f = fixture();
        let user = f.accounts.register(jane()).await.unwrap();

        assert_eq!(user.role, Role::Student);
        assert_ne!(user.password_hash, "ab");
        assert!(f.hasher.verify("ab", &user.password_hash));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let f = fixture();
        f.accounts.register(jane()).await.unwrap();

        let mut again = jane();
        again.cellphone = "0811111111".to_string();
        let err = f.accounts.register(again).await.unwrap_err();
        assert_eq!(err, ServiceError::DuplicateIdentity { field: "email" });
    }

    #[tokio::test]
    async fn duplicate_cellphone_is_rejected() {
        let f = fixture();
        f.accounts.register(jane()).await.unwrap();

        let mut again = jane();
        again.email = "other@x.com".to_string();
        let err = f.accounts.register(again).await.unwrap_err();
        assert_eq!(err, ServiceError::DuplicateIdentity { field: "cellphone" });
    }

    #[tokio::test]
    async fn login_issues_token_for_email_subject() {
        let f = fixture();
        f.accounts.register(jane()).await.unwrap();

        let token = f.accounts.login("jane@x.com", "ab").await.unwrap();
        let verified = f.tokens.validate(&token).unwrap();
        assert_eq!(verified.subject, "jane@x.com");
        assert_eq!(verified.authorities, vec!["ROLE_STUDENT".to_string()]);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let f = fixture();
        f.accounts.register(jane()).await.unwrap();

        let wrong = f.accounts.login("jane@x.com", "nope").await.unwrap_err();
        let unknown = f.accounts.login("ghost@x.com", "ab").await.unwrap_err();
        assert_eq!(wrong, ServiceError::InvalidCredentials);
        assert_eq!(wrong, unknown);
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn profile_requires_authentication() {
        let f = fixture();
        let err = f.accounts.profile(&SecurityContext::Anonymous).await.unwrap_err();
        assert_eq!(err, ServiceError::Unauthenticated);
    }

    #[tokio::test]
    async fn facilitator_cannot_grant_admin() {
        let f = fixture();
        let mut reg = jane();
        reg.role = Some(Role::Facilitator);
        let facilitator = f.accounts.register(reg).await.unwrap();

        let update = UserUpdate {
            full_name: "Jane Doe".to_string(),
            email: "jane@x.com".to_string(),
            cellphone: "0800000000".to_string(),
            role: Some(Role::Admin),
        };
        let err = f
            .accounts
            .update_user(&ctx_for(&facilitator), facilitator.id, update)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let stored = f.store.find_user(facilitator.id).await.unwrap().unwrap();
        assert_eq!(stored.role, Role::Facilitator);
    }

    #[tokio::test]
    async fn facilitator_cannot_modify_an_admin_account() {
        let f = fixture();
        let mut admin_reg = jane();
        admin_reg.role = Some(Role::Admin);
        let admin = f.accounts.register(admin_reg).await.unwrap();
        let facilitator = f
            .accounts
            .register(Registration {
                full_name: "Fran".to_string(),
                email: "fran@x.com".to_string(),
                cellphone: "0833333333".to_string(),
                password: "ef".to_string(),
                role: Some(Role::Facilitator),
            })
            .await
            .unwrap();

        let update = UserUpdate {
            full_name: "Jane Doe".to_string(),
            email: "taken-over@x.com".to_string(),
            cellphone: "0800000000".to_string(),
            role: Some(Role::Student),
        };
        let err = f
            .accounts
            .update_user(&ctx_for(&facilitator), admin.id, update)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = f
            .accounts
            .change_role(&ctx_for(&facilitator), admin.id, Role::Student)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let stored = f.store.find_user(admin.id).await.unwrap().unwrap();
        assert_eq!(stored.role, Role::Admin);
        assert_eq!(stored.email, "jane@x.com");
    }

    #[tokio::test]
    async fn update_rejects_email_owned_by_someone_else() {
        let f = fixture();
        let mut admin_reg = jane();
        admin_reg.role = Some(Role::Admin);
        let admin = f.accounts.register(admin_reg).await.unwrap();

        let other = f
            .accounts
            .register(Registration {
                full_name: "John".to_string(),
                email: "john@x.com".to_string(),
                cellphone: "0822222222".to_string(),
                password: "cd".to_string(),
                role: None,
            })
            .await
            .unwrap();

        let update = UserUpdate {
            full_name: "John".to_string(),
            email: "jane@x.com".to_string(),
            cellphone: "0822222222".to_string(),
            role: None,
        };
        let err = f
            .accounts
            .update_user(&ctx_for(&admin), other.id, update)
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::DuplicateIdentity { field: "email" });
    }

    #[tokio::test]
    async fn admin_changes_role_and_deletes_user() {
        let f = fixture();
        let mut admin_reg = jane();
        admin_reg.role = Some(Role::Admin);
        let admin = f.accounts.register(admin_reg).await.unwrap();
        let other = f
            .accounts
            .register(Registration {
                full_name: "John".to_string(),
                email: "john@x.com".to_string(),
                cellphone: "0822222222".to_string(),
                password: "cd".to_string(),
                role: None,
            })
            .await
            .unwrap();
        let ctx = ctx_for(&admin);

        let promoted = f.accounts.change_role(&ctx, other.id, Role::Facilitator).await.unwrap();
        assert_eq!(promoted.role, Role::Facilitator);

        f.accounts.delete_user(&ctx, other.id).await.unwrap();
        let err = f.accounts.delete_user(&ctx, other.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { resource: "User", .. }));
    }

    #[tokio::test]
    async fn listing_users_is_admin_only() {
        let f = fixture();
        let student = f.accounts.register(jane()).await.unwrap();
        let err = f.accounts.list_users(&ctx_for(&student)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }
}
