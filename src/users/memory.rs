use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;

use crate::auth::password::{self, PasswordDigest};
use crate::schema::{Field, SchemaPolicy, UserId};
use crate::users::{
    repo_types::{NewUser, User, UserPatch},
    store::{check_credentials, UserStore, UserStoreError},
};

struct StoredUser {
    user: User,
    digest: PasswordDigest,
}

/// In-process stand-in for the `users` table. The mutex plays the role of the
/// table's unique constraints.
pub struct MemoryUserStore {
    policy: Arc<SchemaPolicy>,
    rows: Mutex<Vec<StoredUser>>,
    next_id: AtomicI64,
}

impl MemoryUserStore {
    pub fn new(policy: Arc<SchemaPolicy>) -> Self {
        Self {
            policy,
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<StoredUser>>, UserStoreError> {
        self.rows
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned").into())
    }

    fn taken(rows: &[StoredUser], skip: Option<UserId>, field: Field, value: &str) -> bool {
        rows.iter()
            .filter(|row| Some(row.user.id) != skip)
            .any(|row| row.user.field(field) == Some(value))
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, UserStoreError> {
        let digest = password::hash_password(new_user.password())?;
        let mut rows = self.lock()?;
        for spec in self.policy.active_fields() {
            if let Some(value) = new_user.field(spec.field) {
                if Self::taken(&rows, None, spec.field, value) {
                    return Err(UserStoreError::Conflict(spec.field));
                }
            }
        }
        let id = self
            .policy
            .id_kind()
            .generate()
            .unwrap_or_else(|| UserId::Serial(self.next_id.fetch_add(1, Ordering::SeqCst)));
        let user = User {
            id,
            username: new_user.field(Field::Username).map(str::to_string),
            email: new_user.field(Field::Email).map(str::to_string),
        };
        rows.push(StoredUser {
            user: user.clone(),
            digest,
        });
        Ok(user)
    }

    async fn get_user_by_id(&self, id: UserId) -> Result<User, UserStoreError> {
        let rows = self.lock()?;
        rows.iter()
            .find(|row| row.user.id == id)
            .map(|row| row.user.clone())
            .ok_or(UserStoreError::NotFound)
    }

    async fn get_users(&self) -> Result<Vec<User>, UserStoreError> {
        let rows = self.lock()?;
        Ok(rows.iter().map(|row| row.user.clone()).collect())
    }

    async fn verify_user(&self, login: &str, password: &str) -> Result<User, UserStoreError> {
        let field = self.policy.login_field();
        let candidate = {
            let rows = self.lock()?;
            rows.iter()
                .find(|row| row.user.field(field) == Some(login))
                .map(|row| (row.user.clone(), row.digest.clone()))
        };
        check_credentials(candidate, password)
    }

    async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<User, UserStoreError> {
        let mut rows = self.lock()?;
        for field in [Field::Username, Field::Email] {
            if let Some(value) = patch.field(field) {
                if Self::taken(&rows, Some(id), field, value) {
                    return Err(UserStoreError::Conflict(field));
                }
            }
        }
        let row = rows
            .iter_mut()
            .find(|row| row.user.id == id)
            .ok_or(UserStoreError::NotFound)?;
        if let Some(username) = patch.field(Field::Username) {
            row.user.username = Some(username.to_string());
        }
        if let Some(email) = patch.field(Field::Email) {
            row.user.email = Some(email.to_string());
        }
        Ok(row.user.clone())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), UserStoreError> {
        let mut rows = self.lock()?;
        let before = rows.len();
        rows.retain(|row| row.user.id != id);
        if rows.len() == before {
            return Err(UserStoreError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IdKind;

    fn store(username: bool, email: bool) -> Arc<MemoryUserStore> {
        let policy = Arc::new(SchemaPolicy::new(username, email, IdKind::Serial).unwrap());
        Arc::new(MemoryUserStore::new(policy))
    }

    fn alice(store: &MemoryUserStore) -> NewUser {
        NewUser::new(
            &store.policy,
            Some("alice".into()),
            Some("a@x.com".into()),
            "secret".into(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn create_then_get_returns_same_fields() {
        let store = store(true, true);
        let created = store.create_user(alice(&store)).await.unwrap();
        assert_eq!(created.id, UserId::Serial(1));
        assert_eq!(store.get_user_by_id(created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn empty_listing_is_ok() {
        let store = store(true, true);
        assert!(store.get_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn verify_failures_are_identical() {
        let store = store(true, true);
        store.create_user(alice(&store)).await.unwrap();

        let ok = store.verify_user("a@x.com", "secret").await.unwrap();
        assert_eq!(ok.username.as_deref(), Some("alice"));

        let wrong = store.verify_user("a@x.com", "nope").await.unwrap_err();
        let missing = store.verify_user("b@x.com", "secret").await.unwrap_err();
        assert!(matches!(wrong, UserStoreError::InvalidCredentials));
        assert!(matches!(missing, UserStoreError::InvalidCredentials));
    }

    #[tokio::test]
    async fn partial_updates_leave_other_field() {
        let store = store(true, true);
        let created = store.create_user(alice(&store)).await.unwrap();

        let patch = UserPatch::new(&store.policy, Some("alicia".into()), None).unwrap();
        let updated = store.update_user(created.id, patch).await.unwrap();
        assert_eq!(updated.username.as_deref(), Some("alicia"));
        assert_eq!(updated.email.as_deref(), Some("a@x.com"));

        let patch = UserPatch::new(&store.policy, None, Some("new@x.com".into())).unwrap();
        let updated = store.update_user(created.id, patch).await.unwrap();
        assert_eq!(updated.username.as_deref(), Some("alicia"));
        assert_eq!(updated.email.as_deref(), Some("new@x.com"));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let store = store(true, true);
        let created = store.create_user(alice(&store)).await.unwrap();
        store.delete_user(created.id).await.unwrap();
        assert!(matches!(
            store.get_user_by_id(created.id).await,
            Err(UserStoreError::NotFound)
        ));
        assert!(matches!(
            store.delete_user(created.id).await,
            Err(UserStoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn concurrent_creates_with_same_email_conflict_once() {
        let store = store(true, true);
        let first = NewUser::new(&store.policy, Some("a1".into()), Some("dup@x.com".into()), "pw".into()).unwrap();
        let second = NewUser::new(&store.policy, Some("a2".into()), Some("dup@x.com".into()), "pw".into()).unwrap();

        let (s1, s2) = (store.clone(), store.clone());
        let (a, b) = tokio::join!(
            tokio::spawn(async move { s1.create_user(first).await }),
            tokio::spawn(async move { s2.create_user(second).await }),
        );
        let outcomes = [a.unwrap(), b.unwrap()];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(UserStoreError::Conflict(Field::Email)))));
    }
}
