use lettre::Address;

use crate::error::{Error, Result};

const MAX_EMAIL_LEN: usize = 254;
const MAX_TITLE_LEN: usize = 200;

/// Returns the trimmed value, or `MissingFields(field)` if nothing is left.
pub fn require_field<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::MissingFields(field.to_string())),
    }
}

/// Accepts addresses the mail transport can deliver to, with a dotted domain.
/// Case is preserved.
pub fn validate_email(email: &str) -> Result<()> {
    if email.is_empty() {
        return Err(Error::MissingFields("email".to_string()));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(Error::BadRequest(format!(
            "email cannot exceed {MAX_EMAIL_LEN} characters"
        )));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(Error::BadRequest("email cannot contain whitespace".to_string()));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(Error::BadRequest("invalid email address".to_string()));
    };
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(Error::BadRequest("invalid email address".to_string()));
    }

    email
        .parse::<Address>()
        .map_err(|e| Error::BadRequest(format!("invalid email address: {e}")))?;
    Ok(())
}

pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::MissingFields("title".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(Error::BadRequest(format!(
            "title cannot exceed {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}
