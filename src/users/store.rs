use async_trait::async_trait;
use lazy_static::lazy_static;
use thiserror::Error;
use tracing::error;

use crate::auth::password::{self, PasswordDigest};
use crate::schema::{Field, UserId};
use crate::users::repo_types::{NewUser, User, UserPatch};

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("user not found")]
    NotFound,
    #[error("{0} already taken")]
    Conflict(Field),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("no fields supplied for update")]
    EmptyUpdate,
    #[error("database error")]
    Database(#[source] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for UserStoreError {
    fn from(e: sqlx::Error) -> Self {
        let conflict = match &e {
            sqlx::Error::RowNotFound => return UserStoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                db.constraint().and_then(Field::from_constraint)
            }
            _ => None,
        };
        match conflict {
            Some(field) => UserStoreError::Conflict(field),
            None => UserStoreError::Database(e),
        }
    }
}

/// User persistence. Implementations must be safe to call from concurrent requests.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, new_user: NewUser) -> Result<User, UserStoreError>;
    async fn get_user_by_id(&self, id: UserId) -> Result<User, UserStoreError>;
    async fn get_users(&self) -> Result<Vec<User>, UserStoreError>;
    /// `login` is matched against the policy's login column.
    async fn verify_user(&self, login: &str, password: &str) -> Result<User, UserStoreError>;
    async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<User, UserStoreError>;
    async fn delete_user(&self, id: UserId) -> Result<(), UserStoreError>;
}

lazy_static! {
    static ref DUMMY_DIGEST: Option<PasswordDigest> =
        password::hash_password("dummy-password-for-timing").ok();
}

/// Checks a looked-up candidate. Every failure is the same `InvalidCredentials`.
pub(crate) fn check_credentials(
    candidate: Option<(User, PasswordDigest)>,
    plain: &str,
) -> Result<User, UserStoreError> {
    let Some((user, digest)) = candidate else {
        if let Some(dummy) = DUMMY_DIGEST.as_ref() {
            let _ = password::verify_password(plain, dummy.as_str());
        }
        return Err(UserStoreError::InvalidCredentials);
    };

    match password::verify_password(plain, digest.as_str()) {
        Ok(true) => Ok(user),
        Ok(false) => Err(UserStoreError::InvalidCredentials),
        Err(e) => {
            error!(error = %e, user_id = %user.id, "stored password digest is unreadable");
            Err(UserStoreError::InvalidCredentials)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User {
            id: UserId::Serial(1),
            username: Some("alice".into()),
            email: Some("a@x.com".into()),
        }
    }

    #[test]
    fn matching_password_returns_user() {
        let digest = password::hash_password("secret").unwrap();
        let user = check_credentials(Some((alice(), digest)), "secret").unwrap();
        assert_eq!(user, alice());
    }

    #[test]
    fn wrong_password_and_unknown_login_are_indistinguishable() {
        let digest = password::hash_password("secret").unwrap();
        let wrong = check_credentials(Some((alice(), digest)), "nope").unwrap_err();
        let missing = check_credentials(None, "secret").unwrap_err();
        assert!(matches!(wrong, UserStoreError::InvalidCredentials));
        assert!(matches!(missing, UserStoreError::InvalidCredentials));
        assert_eq!(wrong.to_string(), missing.to_string());
    }

    #[test]
    fn corrupt_digest_is_invalid_credentials() {
        let err = check_credentials(Some((alice(), PasswordDigest::from_stored("garbage".into()))), "secret").unwrap_err();
        assert!(matches!(err, UserStoreError::InvalidCredentials));
    }

    #[test]
    fn row_not_found_classifies_as_not_found() {
        assert!(matches!(
            UserStoreError::from(sqlx::Error::RowNotFound),
            UserStoreError::NotFound
        ));
        assert!(matches!(
            UserStoreError::from(sqlx::Error::PoolTimedOut),
            UserStoreError::Database(_)
        ));
    }
}
