use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::schema::{Field, SchemaPolicy};

/// Request body for account creation.
#[derive(Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Shape checks on supplied identity fields: email format and column lengths.
/// Presence rules are enforced by the store input types.
pub(crate) fn check_fields(
    policy: &SchemaPolicy,
    username: &mut Option<String>,
    email: &mut Option<String>,
) -> Result<(), AppError> {
    if let Some(e) = email.as_mut() {
        *e = normalize_email(e);
        if !e.is_empty() && policy.is_active(Field::Email) && !is_valid_email(e) {
            return Err(AppError::invalid_input("invalid email"));
        }
    }
    for (field, value) in [(Field::Username, username.as_deref()), (Field::Email, email.as_deref())] {
        if let Some(v) = value {
            if v.trim().chars().count() > field.spec().max_len {
                return Err(AppError::invalid_input(format!("{field} is too long")));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IdKind;

    fn policy() -> SchemaPolicy {
        SchemaPolicy::new(true, true, IdKind::Serial).unwrap()
    }

    #[test]
    fn email_regex() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("a x@y.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn emails_are_normalized_before_checking() {
        let mut username = None;
        let mut email = Some("  A@X.Com ".to_string());
        check_fields(&policy(), &mut username, &mut email).unwrap();
        assert_eq!(email.as_deref(), Some("a@x.com"));
    }

    #[test]
    fn rejects_malformed_email_and_long_username() {
        let mut username = None;
        let mut email = Some("nope".to_string());
        assert!(check_fields(&policy(), &mut username, &mut email).is_err());

        let mut username = Some("x".repeat(51));
        let mut email = None;
        assert!(check_fields(&policy(), &mut username, &mut email).is_err());
    }

    #[test]
    fn empty_email_is_left_to_presence_rules() {
        let mut username = Some("alice".to_string());
        let mut email = Some(String::new());
        assert!(check_fields(&policy(), &mut username, &mut email).is_ok());
    }
}
