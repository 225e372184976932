//! `pms-auth`: credential handling, session tokens and role checks.
//!
//! This crate is decoupled from HTTP and storage: the gate sees a path and a
//! header value, and reads identities through [`IdentityLookup`].

pub mod authorize;
pub mod claims;
pub mod gate;
pub mod password;
pub mod principal;
pub mod roles;
pub mod token;
pub mod user;

pub use authorize::{authorize, can_grant, can_manage, AuthzError, OperationAuthorization, RoleRequirement};
pub use claims::{identity_claims, validate_claims, ClaimsError, TokenClaims};
pub use gate::{
    extract_bearer, AuthorizationGate, GateResolution, GateStage, IdentityLookup, LookupError,
    PUBLIC_PATHS,
};
pub use password::{PasswordError, PasswordHasher, DEFAULT_ITERATIONS, DEFAULT_MEMORY_KIB};
pub use principal::{Principal, SecurityContext};
pub use roles::{Role, UnknownRole};
pub use token::{
    SigningSecret, TokenConfigError, TokenInvalid, TokenIssueError, TokenService, VerifiedToken,
    MAX_TOKEN_LIFETIME_MS, MIN_TOKEN_LIFETIME_MS,
};
pub use user::{Registration, User, UserUpdate, MIN_PASSWORD_LEN};
