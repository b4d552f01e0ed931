use argon2::{
    Argon2, PasswordHasher, PasswordVerifier,
    password_hash::{PasswordHash, SaltString},
};

use crate::error::AppError;

/// hash_password
///
/// One-way hash to an argon2 PHC string. Runs on the blocking pool since the
/// hash is deliberately expensive.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_blocking(&password))
        .await
        .map_err(|e| AppError::Store(format!("hashing task failed: {e}")))?
}

/// verify_password
///
/// `false` for a wrong password and for a stored value that is not a valid PHC string.
pub async fn verify_password(hash: String, password: String) -> bool {
    tokio::task::spawn_blocking(move || verify_blocking(&hash, &password))
        .await
        .unwrap_or(false)
}

fn hash_blocking(password: &str) -> Result<String, AppError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| AppError::Store(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AppError::Store(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Store(e.to_string()))?
        .to_string();
    Ok(phc)
}

fn verify_blocking(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
