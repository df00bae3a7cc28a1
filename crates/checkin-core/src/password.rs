//! PBKDF2-HMAC-SHA256 password hashes in PHC string format
//! (`$pbkdf2-sha256$i=<rounds>,l=32$<salt>$<hash>`).

use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::{Params, Pbkdf2};

use crate::error::CoreError;

/// Rounds used for newly created hashes.
pub const DEFAULT_ROUNDS: u32 = 600_000;

const OUTPUT_LEN: usize = 32;

/// Hashes `plain` with a fresh random salt.
pub fn hash_password(plain: &str) -> Result<String, CoreError> {
    hash_password_with(plain, DEFAULT_ROUNDS)
}

/// Hashes `plain` with an explicit round count (at least one).
pub fn hash_password_with(plain: &str, rounds: u32) -> Result<String, CoreError> {
    let salt = SaltString::generate(&mut OsRng);
    let params = Params {
        rounds: rounds.max(1),
        output_length: OUTPUT_LEN,
    };
    let hash = Pbkdf2
        .hash_password_customized(plain.as_bytes(), None, None, params, &salt)
        .map_err(|e| CoreError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Checks `plain` against a stored hash. Malformed hashes never match.
pub fn verify_password(plain: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Pbkdf2.verify_password(plain.as_bytes(), &parsed).is_ok()
}

/// Byte comparison whose running time does not depend on where inputs differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
