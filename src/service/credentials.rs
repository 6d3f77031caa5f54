//! Password login and credential activation.

use crate::auth::{PasswordHasher, validate_password_strength};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::User;

/// Checks an email/password pair.
///
/// Unknown emails and wrong passwords both yield `InvalidCredentials`. An
/// invited account that never set a password yields `AccountNotActivated`.
pub fn verify_password(
    store: &dyn Store,
    hasher: &PasswordHasher,
    email: &str,
    plaintext: &str,
) -> Result<User> {
    let user = store
        .get_user_by_email(email)?
        .ok_or(Error::InvalidCredentials)?;

    let Some(hash) = user.password_hash.as_deref() else {
        return Err(Error::AccountNotActivated);
    };

    if hasher.verify(plaintext, hash)? {
        Ok(user)
    } else {
        Err(Error::InvalidCredentials)
    }
}

/// Hashes and stores a new password, clearing the invited flag.
pub fn set_password(
    store: &dyn Store,
    hasher: &PasswordHasher,
    email: &str,
    plaintext: &str,
    display_name: Option<&str>,
) -> Result<User> {
    validate_password_strength(plaintext)?;
    let hash = hasher.hash(plaintext)?;
    let display_name = display_name.map(str::trim).filter(|n| !n.is_empty());
    store.set_user_password(email, &hash, display_name)
}

/// Returns the user for `email`, creating an invited placeholder without a
/// password when none exists.
pub fn ensure_user_exists(store: &dyn Store, email: &str) -> Result<User> {
    store.ensure_user(email)
}
