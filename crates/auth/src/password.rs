//! Salted one-way password hashing (Argon2id, PHC string format).

use std::sync::OnceLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;

/// Argon2 memory cost (KiB) used by [`PasswordHasher::new`].
pub const DEFAULT_MEMORY_KIB: u32 = Params::DEFAULT_M_COST;
/// Argon2 time cost (passes over memory) used by [`PasswordHasher::new`].
pub const DEFAULT_ITERATIONS: u32 = Params::DEFAULT_T_COST;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password must not be empty")]
    Empty,

    #[error("invalid hashing parameters: {0}")]
    InvalidParams(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Argon2id hasher with fixed cost parameters.
///
/// `verify` reads the parameters embedded in the digest, so digests produced
/// under older cost settings keep verifying after the settings change.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    /// Argon2id with the crate's default parameters.
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Argon2id with explicit memory cost (KiB) and iteration count.
    pub fn with_params(memory_kib: u32, iterations: u32) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, Params::DEFAULT_P_COST, None)
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash `plaintext` under a fresh random salt.
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        if plaintext.is_empty() {
            return Err(PasswordError::Empty);
        }
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| PasswordError::Hashing(e.to_string()))
    }

    /// Constant-time check of `plaintext` against `digest`.
    ///
    /// A malformed digest is a mismatch, not an error.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        match PasswordHash::new(digest) {
            Ok(parsed) => self
                .argon2
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Burn one verification against a throwaway digest.
    ///
    /// Login calls this when the email is unknown so both failure paths cost
    /// the same.
    pub fn verify_dummy(&self, plaintext: &str) {
        static DUMMY: OnceLock<Option<String>> = OnceLock::new();
        let digest = DUMMY.get_or_init(|| self.hash("pms-dummy-password").ok());
        if let Some(digest) = digest {
            let _ = self.verify(plaintext, digest);
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("algorithm", &"argon2id")
            .finish()
    }
}
