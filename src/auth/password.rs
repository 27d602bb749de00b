use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Hash checked against when the account does not exist, so a missing
/// email costs the same as a wrong password. Carries the default Argon2id
/// parameters that `hash_password` produces.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$gNBKgLjwGZXvL2a3jpw1Lw$2nZzILLmwWk+K68LAx71GcJlDxWUT77FproTvWYVYXs";

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// A stored hash that cannot be parsed verifies as `false`, same as a wrong password.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "argon2 parse hash error");
            return false;
        }
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

/// Burn one verification against a throwaway hash. Always `false`.
pub fn verify_against_dummy(plain: &str) -> bool {
    let _ = verify_password(plain, DUMMY_HASH);
    false
}
