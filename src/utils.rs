use std::sync::OnceLock;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand_core::OsRng;

use crate::errors::AppError;

const MIN_PASSWORD_LENGTH: usize = 8;

/// One-way check of a plaintext secret against a stored hash.
pub trait CredentialVerifier: Send + Sync {
    fn matches(&self, plaintext: &str, hash: &str) -> bool;

    /// Burns the same work as a real check. Used when there is no account to check against.
    fn matches_nothing(&self, plaintext: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Verifier;

impl CredentialVerifier for Argon2Verifier {
    fn matches(&self, plaintext: &str, hash: &str) -> bool {
        match verify_password(plaintext, hash) {
            Ok(ok) => ok,
            Err(err) => {
                tracing::warn!(error = %err, "stored password hash is unreadable");
                false
            }
        }
    }

    fn matches_nothing(&self, plaintext: &str) {
        if let Some(hash) = dummy_hash() {
            let _ = verify_password(plaintext, hash);
        }
    }
}

fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(b"timing-equalizer", &salt)
                .map(|hash| hash.to_string())
                .ok()
        })
        .as_deref()
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::internal(format!("failed to hash password: {err}")))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|err| AppError::internal(format!("invalid password hash: {err}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
