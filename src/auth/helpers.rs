use std::sync::Arc;

use crate::error::Error;
use crate::server::AppState;
use crate::types::User;

#[derive(Debug)]
pub enum TokenValidationError {
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    UnknownUser,
    InternalError,
}

/// Extracts the token from a Bearer Authorization header.
/// Returns None if no auth header is present.
/// Returns Err if the auth scheme is unsupported or the token is empty.
pub fn extract_bearer_token(auth_header: Option<&str>) -> Result<Option<String>, TokenValidationError> {
    match auth_header {
        Some(header) => {
            let token = header
                .strip_prefix("Bearer ")
                .ok_or(TokenValidationError::InvalidScheme)?
                .trim();
            if token.is_empty() {
                return Err(TokenValidationError::InvalidToken);
            }
            Ok(Some(token.to_string()))
        }
        None => Ok(None),
    }
}

/// Validates a raw session token and loads the account it was issued for.
/// The account is read from the store so role changes apply immediately.
pub fn validate_session(state: &Arc<AppState>, raw_token: &str) -> Result<User, TokenValidationError> {
    let claims = state.tokens.verify_session(raw_token).map_err(|e| match e {
        Error::TokenExpired => TokenValidationError::TokenExpired,
        _ => TokenValidationError::InvalidToken,
    })?;

    let user = state
        .store
        .get_user(&claims.sub)
        .map_err(|e| {
            tracing::error!("Failed to load session user {}: {e}", claims.sub);
            TokenValidationError::InternalError
        })?
        .ok_or(TokenValidationError::UnknownUser)?;

    if !user.is_activated() {
        return Err(TokenValidationError::UnknownUser);
    }

    Ok(user)
}
