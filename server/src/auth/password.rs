use bcrypt::BcryptError;

/// bcrypt work factor. Matches the cost used by existing account rows.
pub const HASH_COST: u32 = 10;

/// Hash a password with bcrypt. CPU-bound: call from `spawn_blocking`.
pub fn hash_password(password: &str) -> Result<String, BcryptError> {
    bcrypt::hash(password, HASH_COST)
}

/// Check a password against a stored bcrypt hash.
/// A malformed hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(valid) => valid,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be parsed");
            false
        }
    }
}
