//! Password hashing and verification using Argon2id

use crate::{config::SecurityConfig, error::AppError};
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

/// Hard upper bound on plaintext size accepted by the hasher.
/// Request validation applies the tighter configured policy first.
pub const MAX_PASSWORD_BYTES: usize = 1024;

/// Password hasher with configurable cost parameters
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    /// Build a hasher from the process-wide security settings
    pub fn from_config(config: &SecurityConfig) -> Result<Self, AppError> {
        let params = Params::new(
            config.hash_memory_kib,
            config.hash_iterations,
            config.hash_parallelism,
            None,
        )
        .map_err(|e| AppError::Config(format!("Invalid Argon2 params: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a password. The salt is generated per call and embedded in the
    /// PHC string, so verification needs nothing else.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        Self::check_input(password)?;

        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                tracing::error!("Failed to hash password: {:?}", e);
                AppError::Internal(format!("Failed to hash password: {}", e))
            })?
            .to_string();

        Ok(password_hash)
    }

    /// Verify a password against a stored hash.
    ///
    /// Returns `Ok(false)` on mismatch and for inputs the hasher would have
    /// refused; a stored value that is not a valid PHC string is an
    /// internal error.
    pub fn verify(&self, password: &str, stored: &str) -> Result<bool, AppError> {
        if Self::check_input(password).is_err() {
            return Ok(false);
        }

        let parsed_hash = PasswordHash::new(stored).map_err(|e| {
            tracing::error!("Failed to parse stored password hash: {:?}", e);
            AppError::Internal(format!("Failed to parse password hash: {}", e))
        })?;

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => {
                tracing::error!("Password verification failed: {:?}", e);
                Err(AppError::Internal(format!("Failed to verify password: {}", e)))
            }
        }
    }

    fn check_input(password: &str) -> Result<(), AppError> {
        if password.is_empty() {
            return Err(AppError::field("password", "Password is required"));
        }
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(AppError::field("password", "Password is too long"));
        }
        Ok(())
    }
}
