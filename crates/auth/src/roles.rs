use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix carried by every role string inside the token `authorities` claim.
pub const AUTHORITY_PREFIX: &str = "ROLE_";

/// Closed set of permission tiers.
///
/// `Student` is the single least-privileged tier; there is no `CLIENT` alias.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Facilitator,
    Student,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}' (expected ADMIN, FACILITATOR or STUDENT)")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Facilitator, Role::Student];

    /// Role assigned when registration omits one.
    pub const fn least_privileged() -> Self {
        Role::Student
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Facilitator => "FACILITATOR",
            Role::Student => "STUDENT",
        }
    }

    /// Token authority string, e.g. `ROLE_ADMIN`.
    pub fn authority(&self) -> String {
        format!("{AUTHORITY_PREFIX}{}", self.as_str())
    }

    /// Inverse of [`Role::authority`]. Unprefixed or unknown strings yield `None`.
    pub fn from_authority(authority: &str) -> Option<Self> {
        authority
            .strip_prefix(AUTHORITY_PREFIX)
            .and_then(|name| name.parse().ok())
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::least_privileged()
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    /// Exact, case-sensitive match on the wire names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn authority_carries_role_prefix() {
        assert_eq!(Role::Admin.authority(), "ROLE_ADMIN");
        assert_eq!(Role::from_authority("ROLE_FACILITATOR"), Some(Role::Facilitator));
    }

    #[test]
    fn client_is_not_an_alias_for_student() {
        assert!("CLIENT".parse::<Role>().is_err());
        assert_eq!(Role::from_authority("ROLE_CLIENT"), None);
    }

    #[test]
    fn role_names_are_case_sensitive() {
        assert!("admin".parse::<Role>().is_err());
        assert_eq!(Role::from_authority("ADMIN"), None);
    }

    #[test]
    fn serde_uses_wire_names() {
        assert_eq!(serde_json::to_string(&Role::Facilitator).unwrap(), "\"FACILITATOR\"");
        let r: Role = serde_json::from_str("\"STUDENT\"").unwrap();
        assert_eq!(r, Role::Student);
    }

    proptest! {
        #[test]
        fn decoded_authorities_round_trip(s in "[A-Za-z_]{0,16}") {
            let decoded = Role::from_authority(&s);
            if let Some(role) = decoded {
                prop_assert_eq!(role.authority(), s);
            }
        }
    }
}
