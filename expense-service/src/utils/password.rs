use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Plaintext password. `Debug` is redacted so it cannot end up in logs.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Stored one-way credential (PHC string).
///
/// The only constructors are [`hash_password`] and deserialization from the
/// store, so a plaintext can never be stored here and a hash is never fed back
/// into the hasher.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHashString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHashString(***)")
    }
}

/// Symbols accepted by the complexity policy.
pub const PASSWORD_SYMBOLS: &str = "!@#$%^&*()-_=+[]{}|\\;:'\",.<>/?`~";

pub const PASSWORD_MIN_LENGTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    TooShort { min_length: usize, actual_length: usize },
    MissingUppercase,
    MissingLowercase,
    MissingNumber,
    MissingSymbol,
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::TooShort {
                min_length,
                actual_length,
            } => write!(
                f,
                "Password must be at least {} characters (got {})",
                min_length, actual_length
            ),
            PolicyError::MissingUppercase => {
                write!(f, "Password must contain at least one uppercase letter")
            }
            PolicyError::MissingLowercase => {
                write!(f, "Password must contain at least one lowercase letter")
            }
            PolicyError::MissingNumber => write!(f, "Password must contain at least one number"),
            PolicyError::MissingSymbol => write!(
                f,
                "Password must contain at least one of {}",
                PASSWORD_SYMBOLS
            ),
        }
    }
}

impl std::error::Error for PolicyError {}

/// Check a plaintext against the complexity policy, returning the first
/// violation found.
pub fn validate_password(password: &Password) -> Result<(), PolicyError> {
    let password = password.as_str();
    let length = password.chars().count();

    if length < PASSWORD_MIN_LENGTH {
        return Err(PolicyError::TooShort {
            min_length: PASSWORD_MIN_LENGTH,
            actual_length: length,
        });
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PolicyError::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PolicyError::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PolicyError::MissingNumber);
    }
    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        return Err(PolicyError::MissingSymbol);
    }

    Ok(())
}

/// Hash a password using Argon2id with a random salt.
///
/// CPU-bound; async callers go through `CredentialStore`, which runs this on
/// the blocking pool.
pub fn hash_password(password: &Password) -> Result<PasswordHashString, anyhow::Error> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(PasswordHashString(password_hash))
}

/// Verify a password against a stored hash. Argon2's verifier compares in
/// constant time. A malformed hash counts as a mismatch.
pub fn verify_password(password: &Password, password_hash: &PasswordHashString) -> bool {
    let parsed_hash = match PasswordHash::new(password_hash.as_str()) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(error = %e, "Stored password hash is malformed");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed_hash)
        .is_ok()
}
