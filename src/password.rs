//! Password hashing and verification via bcrypt.

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

/// Hash a password for storage.
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, BCRYPT_COST)
}

/// Verify a presented password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(password, hash)
}
