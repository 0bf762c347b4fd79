//! PBKDF2-SHA256 password hashes.
//!
//! Encoded as `pbkdf2-sha256$<iterations>$<salt>$<key>` (base64, no padding),
//! so the work factor can change without invalidating stored hashes.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::AuthError;

pub const KEY_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 32;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 256;

const SCHEME: &str = "pbkdf2-sha256";

fn derive(password: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; KEY_LENGTH]> {
    let mut key = Zeroizing::new([0u8; KEY_LENGTH]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key[..]);
    key
}

/// Generate a cryptographically random salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

pub fn hash_password(password: &str, iterations: u32) -> String {
    let salt = generate_salt();
    let key = derive(password, &salt, iterations);
    format!(
        "{SCHEME}${iterations}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(&key[..])
    )
}

/// Constant-time comparison against a stored hash.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(AuthError::CorruptedHash);
    };

    let iterations: u32 = iterations.parse().map_err(|_| AuthError::CorruptedHash)?;
    if iterations == 0 {
        return Err(AuthError::CorruptedHash);
    }
    let salt = STANDARD_NO_PAD
        .decode(salt)
        .map_err(|_| AuthError::CorruptedHash)?;
    let expected = STANDARD_NO_PAD
        .decode(expected)
        .map_err(|_| AuthError::CorruptedHash)?;

    let derived = derive(password, &salt, iterations);
    Ok(derived[..].ct_eq(&expected[..]).into())
}

/// Run the same key derivation a verification would, against a throwaway
/// salt, for logins naming an account that does not exist. Always false.
pub fn verify_absent_account(password: &str, iterations: u32) -> bool {
    let derived = derive(password, &[0u8; SALT_LENGTH], iterations.max(1));
    let never = [0xffu8; KEY_LENGTH];
    derived[..].ct_eq(&never[..]).into()
}

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation {
            field: "password",
            message: format!("must be at least {MIN_PASSWORD_LENGTH} characters"),
        });
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(AuthError::Validation {
            field: "password",
            message: format!("must be at most {MAX_PASSWORD_LENGTH} characters"),
        });
    }
    Ok(())
}
