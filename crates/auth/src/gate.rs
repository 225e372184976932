//! Per-request authorization gate.
//!
//! Turns a request path and an optional `Authorization` header into a
//! [`SecurityContext`]. The gate never rejects a request: every failure on the
//! way degrades to an anonymous context, and role checks happen later at the
//! service boundary.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{Principal, SecurityContext, TokenService, User};

/// Path prefixes that skip token processing entirely.
pub const PUBLIC_PATHS: &[&str] = &[
    "/api/auth/register",
    "/api/auth/login",
    "/v3/api-docs",
];

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("identity lookup failed: {0}")]
pub struct LookupError(pub String);

/// Read access to identities by email, as needed by the gate.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, LookupError>;
}

/// Where the gate stopped for a given request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStage {
    /// Allow-listed path; no token processing.
    Public,
    /// No usable `Authorization: Bearer` header.
    NoToken,
    /// Signature, structure or expiry check failed.
    TokenRejected,
    /// Subject unknown, lookup failed or timed out, or subject mismatch.
    IdentityUnresolved,
    /// Caller identity and roles attached.
    Authenticated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateResolution {
    pub stage: GateStage,
    pub context: SecurityContext,
}

impl GateResolution {
    fn anonymous(stage: GateStage) -> Self {
        Self {
            stage,
            context: SecurityContext::Anonymous,
        }
    }
}

pub struct AuthorizationGate {
    tokens: Arc<TokenService>,
    identities: Arc<dyn IdentityLookup>,
    public_paths: &'static [&'static str],
    lookup_timeout: Duration,
}

impl AuthorizationGate {
    pub fn new(
        tokens: Arc<TokenService>,
        identities: Arc<dyn IdentityLookup>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            tokens,
            identities,
            public_paths: PUBLIC_PATHS,
            lookup_timeout,
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.iter().any(|prefix| {
            path.strip_prefix(prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }

    pub async fn resolve(&self, path: &str, authorization: Option<&str>) -> GateResolution {
        self.resolve_at(path, authorization, Utc::now()).await
    }

    /// Run the pipeline against an explicit clock.
    ///
    /// Deterministic for identical inputs and store contents.
    pub async fn resolve_at(
        &self,
        path: &str,
        authorization: Option<&str>,
        now: DateTime<Utc>,
    ) -> GateResolution {
        if self.is_public(path) {
            return GateResolution::anonymous(GateStage::Public);
        }

        let Some(token) = authorization.and_then(extract_bearer) else {
            return GateResolution::anonymous(GateStage::NoToken);
        };

        let Ok(verified) = self.tokens.validate_at(token, now) else {
            return GateResolution::anonymous(GateStage::TokenRejected);
        };

        let lookup = tokio::time::timeout(
            self.lookup_timeout,
            self.identities.find_by_email(&verified.subject),
        )
        .await;

        let user = match lookup {
            Ok(Ok(Some(user))) => user,
            Ok(Ok(None)) => {
                debug!("token subject has no identity");
                return GateResolution::anonymous(GateStage::IdentityUnresolved);
            }
            Ok(Err(e)) => {
                warn!(error = %e, "identity lookup failed; continuing anonymous");
                return GateResolution::anonymous(GateStage::IdentityUnresolved);
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "identity lookup timed out; continuing anonymous"
                );
                return GateResolution::anonymous(GateStage::IdentityUnresolved);
            }
        };

        if !self.tokens.is_valid_at(token, &user, now) {
            return GateResolution::anonymous(GateStage::IdentityUnresolved);
        }

        GateResolution {
            stage: GateStage::Authenticated,
            context: SecurityContext::Authenticated(Principal {
                user_id: user.id,
                email: user.email,
                roles: verified.roles(),
            }),
        }
    }
}

impl core::fmt::Debug for AuthorizationGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthorizationGate")
            .field("public_paths", &self.public_paths)
            .field("lookup_timeout", &self.lookup_timeout)
            .finish_non_exhaustive()
    }
}

/// Token from an `Authorization` header value, if it is a non-empty bearer.
pub fn extract_bearer(header: &str) -> Option<&str> {
    let token = header.strip_prefix(BEARER_PREFIX)?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::Duration as ChronoDuration;

    use crate::{Registration, Role, SigningSecret};

    #[derive(Default)]
    struct MapLookup {
        users: Mutex<HashMap<String, User>>,
        fail: bool,
        stall: bool,
    }

    #[async_trait]
    impl IdentityLookup for MapLookup {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, LookupError> {
            if self.stall {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if self.fail {
                return Err(LookupError("connection refused".to_string()));
            }
            Ok(self.users.lock().unwrap().get(email).cloned())
        }
    }

    fn user(email: &str, role: Role) -> User {
        User::register(
            Registration {
                full_name: "Jane Doe".to_string(),
                email: email.to_string(),
                cellphone: "0800000000".to_string(),
                password: "ab".to_string(),
                role: Some(role),
            },
            "$argon2id$stub".to_string(),
            Utc::now(),
        )
    }

    fn tokens() -> Arc<TokenService> {
        Arc::new(TokenService::new(SigningSecret::new("secret"), ChronoDuration::hours(1)).unwrap())
    }

    fn gate(tokens: Arc<TokenService>, lookup: MapLookup) -> AuthorizationGate {
        AuthorizationGate::new(tokens, Arc::new(lookup), Duration::from_millis(50))
    }

    fn lookup_with(u: &User) -> MapLookup {
        let lookup = MapLookup::default();
        lookup.users.lock().unwrap().insert(u.email.clone(), u.clone());
        lookup
    }

    #[test]
    fn extract_bearer_requires_scheme_and_value() {
        assert_eq!(extract_bearer("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer("Bearer   abc  "), Some("abc"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("Basic abc"), None);
        assert_eq!(extract_bearer("bearer abc"), None);
    }

    #[test]
    fn public_paths_match_whole_segments() {
        let g = gate(tokens(), MapLookup::default());
        assert!(g.is_public("/api/auth/login"));
        assert!(g.is_public("/v3/api-docs"));
        assert!(g.is_public("/v3/api-docs/openapi.json"));
        assert!(!g.is_public("/v3/api-docsx"));
        assert!(!g.is_public("/swagger-ui/index.html"));
        assert!(!g.is_public("/api/auth/profile"));
        assert!(!g.is_public("/api/auth/loginx"));
    }

    #[tokio::test]
    async fn valid_token_for_known_identity_authenticates() {
        let tokens = tokens();
        let jane = user("jane@x.com", Role::Admin);
        let token = tokens.issue(&jane).unwrap();
        let g = gate(tokens, lookup_with(&jane));

        let res = g.resolve("/api/cohorts", Some(&format!("Bearer {token}"))).await;
        assert_eq!(res.stage, GateStage::Authenticated);
        let p = res.context.principal().unwrap();
        assert_eq!(p.email, "jane@x.com");
        assert_eq!(p.user_id, jane.id);
        assert_eq!(p.roles, vec![Role::Admin]);
    }

    #[tokio::test]
    async fn public_path_stays_anonymous_even_with_valid_token() {
        let tokens = tokens();
        let jane = user("jane@x.com", Role::Admin);
        let token = tokens.issue(&jane).unwrap();
        let g = gate(tokens, lookup_with(&jane));

        let res = g.resolve("/api/auth/login", Some(&format!("Bearer {token}"))).await;
        assert_eq!(res.stage, GateStage::Public);
        assert_eq!(res.context, SecurityContext::Anonymous);
    }

    #[tokio::test]
    async fn missing_header_is_anonymous() {
        let g = gate(tokens(), MapLookup::default());
        let res = g.resolve("/api/cohorts", None).await;
        assert_eq!(res.stage, GateStage::NoToken);
    }

    #[tokio::test]
    async fn invalid_token_is_anonymous_not_an_error() {
        let g = gate(tokens(), MapLookup::default());
        let res = g.resolve("/api/cohorts", Some("Bearer garbage")).await;
        assert_eq!(res.stage, GateStage::TokenRejected);
        assert_eq!(res.context, SecurityContext::Anonymous);
    }

    #[tokio::test]
    async fn deleted_subject_is_anonymous() {
        let tokens = tokens();
        let token = tokens.issue(&user("gone@x.com", Role::Admin)).unwrap();
        let g = gate(tokens, MapLookup::default());

        let res = g.resolve("/api/cohorts", Some(&format!("Bearer {token}"))).await;
        assert_eq!(res.stage, GateStage::IdentityUnresolved);
    }

    #[tokio::test]
    async fn lookup_failure_is_anonymous() {
        let tokens = tokens();
        let token = tokens.issue(&user("jane@x.com", Role::Admin)).unwrap();
        let g = gate(
            tokens,
            MapLookup {
                fail: true,
                ..Default::default()
            },
        );
        let res = g.resolve("/api/cohorts", Some(&format!("Bearer {token}"))).await;
        assert_eq!(res.stage, GateStage::IdentityUnresolved);
    }

    #[tokio::test]
    async fn lookup_timeout_is_anonymous() {
        let tokens = tokens();
        let token = tokens.issue(&user("jane@x.com", Role::Admin)).unwrap();
        let g = gate(
            tokens,
            MapLookup {
                stall: true,
                ..Default::default()
            },
        );
        let res = g.resolve("/api/cohorts", Some(&format!("Bearer {token}"))).await;
        assert_eq!(res.stage, GateStage::IdentityUnresolved);
    }

    #[tokio::test]
    async fn identical_requests_resolve_identically() {
        let tokens = tokens();
        let jane = user("jane@x.com", Role::Facilitator);
        let token = tokens.issue(&jane).unwrap();
        let g = gate(tokens, lookup_with(&jane));
        let header = format!("Bearer {token}");
        let now = Utc::now();

        let first = g.resolve_at("/api/students", Some(&header), now).await;
        let second = g.resolve_at("/api/students", Some(&header), now).await;
        assert_eq!(first, second);
    }
}
