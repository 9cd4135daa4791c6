//! Password hashing and remember-me tokens.
//!
//! Passwords are stored as a single unsalted SHA-256 digest. The remember-me
//! token is a keyed digest of the user id and email; it never expires and
//! there is no server-side revocation.

use regex_lite::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

/// Length, in hex characters, of a remember-me token.
pub const TOKEN_LEN: usize = 32;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

static EMAIL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(EMAIL_PATTERN).ok());

/// Lowercase hex SHA-256 of the password.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Compare a plaintext password against a stored hash.
pub fn password_matches(password: &str, stored_hash: &str) -> bool {
    hash_password(password).as_bytes() == stored_hash.as_bytes()
}

/// Permissive email shape check.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.as_ref().is_some_and(|re| re.is_match(email))
}

/// Deterministic remember-me token for a user.
pub fn remember_token(secret: &str, user_id: i64, email: &str) -> String {
    let digest = Sha256::new()
        .chain_update(secret.as_bytes())
        .chain_update(b":")
        .chain_update(user_id.to_string().as_bytes())
        .chain_update(b":")
        .chain_update(email.as_bytes())
        .finalize();
    let mut token = hex::encode(digest);
    token.truncate(TOKEN_LEN);
    token
}

/// Recompute the token for `user_id`/`email` and compare.
pub fn verify_remember_token(secret: &str, user_id: i64, email: &str, token: &str) -> bool {
    remember_token(secret, user_id, email) == token
}
