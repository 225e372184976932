use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Role, User};

/// Session token payload.
///
/// `sub` is the identity's email; `authorities` holds exactly one
/// `ROLE_`-prefixed role string. Times are seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub authorities: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    #[error("token has expired")]
    Expired,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Build the claims for `user`, valid on `[iat, exp)`.
pub fn identity_claims(user: &User, iat: DateTime<Utc>, exp: DateTime<Utc>) -> TokenClaims {
    TokenClaims {
        sub: user.email.clone(),
        authorities: vec![user.role.authority()],
        iat: iat.timestamp(),
        exp: exp.timestamp(),
    }
}

/// Check the time window of already-decoded claims.
///
/// No leeway: a token is expired from the second `now >= exp`.
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), ClaimsError> {
    if claims.exp <= claims.iat {
        return Err(ClaimsError::InvalidTimeWindow);
    }
    if now.timestamp() >= claims.exp {
        return Err(ClaimsError::Expired);
    }
    Ok(())
}

impl TokenClaims {
    /// Roles decoded from `authorities`; unknown strings are skipped.
    pub fn roles(&self) -> Vec<Role> {
        self.authorities
            .iter()
            .filter_map(|a| Role::from_authority(a))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims(iat: i64, exp: i64) -> TokenClaims {
        TokenClaims {
            sub: "jane@x.com".to_string(),
            authorities: vec!["ROLE_STUDENT".to_string()],
            iat,
            exp,
        }
    }

    #[test]
    fn expired_at_exact_expiry_second() {
        let now = Utc::now();
        let c = claims(now.timestamp() - 10, now.timestamp());
        assert_eq!(validate_claims(&c, now), Err(ClaimsError::Expired));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let now = Utc::now();
        let c = claims(now.timestamp(), now.timestamp());
        assert_eq!(validate_claims(&c, now), Err(ClaimsError::InvalidTimeWindow));
    }

    #[test]
    fn live_window_passes() {
        let now = Utc::now();
        let c = claims(now.timestamp(), (now + Duration::hours(1)).timestamp());
        assert!(validate_claims(&c, now).is_ok());
    }

    #[test]
    fn unknown_authorities_are_dropped_from_roles() {
        let mut c = claims(0, 1);
        c.authorities.push("ROLE_CLIENT".to_string());
        assert_eq!(c.roles(), vec![Role::Student]);
    }
}
