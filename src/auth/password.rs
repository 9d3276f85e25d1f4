//! Account credentials: Argon2id hashes stored in `users.password_hash`, and
//! the one-time tokens that back `users.password_reset_token`.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::{rngs::OsRng, RngCore};
use time::{Duration, OffsetDateTime};
use tracing::error;

/// How long a password reset token stays redeemable.
pub const RESET_TOKEN_TTL: Duration = Duration::hours(1);

/// Hashes a password into a PHC string (`$argon2id$v=19$...`) with a fresh salt.
///
/// CPU heavy; callers on the async runtime wrap it in `spawn_blocking`.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "password hashing failed");
            anyhow::anyhow!("hash password: {e}")
        })?;
    Ok(hash.to_string())
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash cannot be parsed,
/// which means the users row is corrupt rather than the login being wrong.
pub fn verify_password(plain: &str, stored_hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| {
        error!(error = %e, "stored password hash is unreadable");
        anyhow::anyhow!("parse stored password hash: {e}")
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// A password reset token and the moment it stops working.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

impl ResetToken {
    pub fn is_expired(&self, at: OffsetDateTime) -> bool {
        at >= self.expires_at
    }
}

/// 256 random bits as 64 hex chars, valid for [`RESET_TOKEN_TTL`] from `now`.
///
/// No route issues or redeems these yet.
pub fn generate_reset_token(now: OffsetDateTime) -> ResetToken {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    ResetToken {
        token: bytes.iter().map(|b| format!("{b:02x}")).collect(),
        expires_at: now + RESET_TOKEN_TTL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn hash_is_salted_phc_string() {
        let a = hash_password("Secret123!").unwrap();
        let b = hash_password("Secret123!").unwrap();
        assert!(a.starts_with("$argon2id$"));
        assert_ne!(a, "Secret123!");
        assert_ne!(a, b);
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(err.to_string().contains("parse stored password hash"));
    }

    #[test]
    fn reset_tokens_are_hex_and_distinct() {
        let now = OffsetDateTime::now_utc();
        let a = generate_reset_token(now);
        let b = generate_reset_token(now);
        assert_eq!(a.token.len(), 64);
        assert!(a.token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn reset_token_expires_after_ttl() {
        let now = OffsetDateTime::now_utc();
        let token = generate_reset_token(now);
        assert_eq!(token.expires_at, now + RESET_TOKEN_TTL);
        assert!(!token.is_expired(now + Duration::minutes(59)));
        assert!(token.is_expired(now + RESET_TOKEN_TTL));
    }
}
