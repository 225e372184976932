//! Signed session tokens (JWT, HS256).
//!
//! Tokens are self-contained: validation needs only the signing secret and the
//! clock. Every failure collapses into [`TokenInvalid`]; the specific reason is
//! logged at debug level.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use tracing::debug;

use crate::claims::{identity_claims, validate_claims, TokenClaims};
use crate::{Role, User};

/// Process-wide HMAC secret. Never printed.
#[derive(Clone)]
pub struct SigningSecret(String);

impl SigningSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl core::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// Shortest accepted token lifetime. Claims carry whole seconds, so anything
/// shorter yields `exp == iat`.
pub const MIN_TOKEN_LIFETIME_MS: i64 = 1_000;
/// Longest accepted token lifetime (ten years).
pub const MAX_TOKEN_LIFETIME_MS: i64 = 10 * 365 * 86_400_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenConfigError {
    #[error("signing secret must not be empty")]
    EmptySecret,

    #[error("token lifetime must be positive")]
    NonPositiveLifetime,

    #[error("token lifetime must be at least {MIN_TOKEN_LIFETIME_MS} ms")]
    LifetimeTooShort,

    #[error("token lifetime must be at most {MAX_TOKEN_LIFETIME_MS} ms")]
    LifetimeTooLong,
}

#[derive(Debug, Error)]
pub enum TokenIssueError {
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("token expiry is out of range")]
    ExpiryOutOfRange,
}

/// The single outcome for any token that must not be trusted.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid token")]
pub struct TokenInvalid;

/// What a successfully validated token asserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject: String,
    pub authorities: Vec<String>,
}

impl VerifiedToken {
    pub fn roles(&self) -> Vec<Role> {
        self.authorities
            .iter()
            .filter_map(|a| Role::from_authority(a))
            .collect()
    }
}

/// Issues and validates session tokens.
///
/// Immutable after construction; share it behind an `Arc`.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenService {
    pub fn new(secret: SigningSecret, lifetime: Duration) -> Result<Self, TokenConfigError> {
        if secret.is_empty() {
            return Err(TokenConfigError::EmptySecret);
        }
        if lifetime <= Duration::zero() {
            return Err(TokenConfigError::NonPositiveLifetime);
        }
        if lifetime < Duration::milliseconds(MIN_TOKEN_LIFETIME_MS) {
            return Err(TokenConfigError::LifetimeTooShort);
        }
        if lifetime > Duration::milliseconds(MAX_TOKEN_LIFETIME_MS) {
            return Err(TokenConfigError::LifetimeTooLong);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `validate_claims` with zero leeway.
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetime,
        })
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn issue(&self, user: &User) -> Result<String, TokenIssueError> {
        self.issue_at(user, Utc::now())
    }

    /// Sign a token for `user` valid on `[now, now + lifetime)`.
    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<String, TokenIssueError> {
        let exp = now
            .checked_add_signed(self.lifetime)
            .ok_or(TokenIssueError::ExpiryOutOfRange)?;
        let claims = identity_claims(user, now, exp);
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    pub fn validate(&self, token: &str) -> Result<VerifiedToken, TokenInvalid> {
        self.validate_at(token, Utc::now())
    }

    /// Check signature, structure and expiry. No store access.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedToken, TokenInvalid> {
        let claims = decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                debug!(reason = %e, "token rejected");
                TokenInvalid
            })?
            .claims;

        validate_claims(&claims, now).map_err(|e| {
            debug!(reason = %e, "token rejected");
            TokenInvalid
        })?;

        Ok(VerifiedToken {
            subject: claims.sub,
            authorities: claims.authorities,
        })
    }

    pub fn is_valid(&self, token: &str, user: &User) -> bool {
        self.is_valid_at(token, user, Utc::now())
    }

    /// `validate_at` succeeds and the token's subject is `user`'s email.
    pub fn is_valid_at(&self, token: &str, user: &User, now: DateTime<Utc>) -> bool {
        self.validate_at(token, now)
            .map(|t| t.subject == user.email)
            .unwrap_or(false)
    }
}

impl core::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &"HS256")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}
