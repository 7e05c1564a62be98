use std::fmt;

use serde::Serialize;

use crate::schema::{Field, SchemaPolicy, UserId};
use crate::users::store::UserStoreError;

/// User record as exposed outward. Never carries the password digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    #[cfg(test)]
    pub fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::Username => self.username.as_deref(),
            Field::Email => self.email.as_deref(),
        }
    }
}

/// Checked input for account creation.
pub struct NewUser {
    username: Option<String>,
    email: Option<String>,
    password: String,
}

impl NewUser {
    /// Keeps only the fields the policy activates; each of those must be non-empty.
    pub fn new(
        policy: &SchemaPolicy,
        username: Option<String>,
        email: Option<String>,
        password: String,
    ) -> Result<Self, UserStoreError> {
        let username = take_active(policy, Field::Username, username)?;
        let email = take_active(policy, Field::Email, email)?;
        if password.is_empty() {
            return Err(UserStoreError::InvalidInput("password is required".into()));
        }
        Ok(Self {
            username,
            email,
            password,
        })
    }

    pub fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::Username => self.username.as_deref(),
            Field::Email => self.email.as_deref(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn take_active(
    policy: &SchemaPolicy,
    field: Field,
    value: Option<String>,
) -> Result<Option<String>, UserStoreError> {
    if !policy.is_active(field) {
        return Ok(None);
    }
    match normalize(value) {
        Some(v) => Ok(Some(v)),
        None => Err(UserStoreError::InvalidInput(format!("{field} is required"))),
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Partial update. Holds at least one supplied, active field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPatch {
    username: Option<String>,
    email: Option<String>,
}

impl UserPatch {
    pub fn new(
        policy: &SchemaPolicy,
        username: Option<String>,
        email: Option<String>,
    ) -> Result<Self, UserStoreError> {
        let username = normalize(username);
        let email = normalize(email);
        for (field, value) in [(Field::Username, &username), (Field::Email, &email)] {
            if value.is_some() && !policy.is_active(field) {
                return Err(UserStoreError::InvalidInput(format!(
                    "{field} is not enabled for this deployment"
                )));
            }
        }
        if username.is_none() && email.is_none() {
            return Err(UserStoreError::EmptyUpdate);
        }
        Ok(Self { username, email })
    }

    pub fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::Username => self.username.as_deref(),
            Field::Email => self.email.as_deref(),
        }
    }
}
