use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{
    postgres::{PgArguments, PgRow},
    query::Query,
    PgPool, Postgres, Row,
};
use time::OffsetDateTime;

use crate::auth::password::{self, PasswordDigest};
use crate::schema::{Field, IdKind, SchemaPolicy, UserId};
use crate::users::{
    repo_types::{NewUser, User, UserPatch},
    statement::{self, SqlValue, Statement},
    store::{check_credentials, UserStore, UserStoreError},
};

/// `users` table access through a shared pool. No multi-statement transactions;
/// uniqueness is left to the table's constraints.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
    policy: Arc<SchemaPolicy>,
}

impl PgUserStore {
    pub fn new(db: PgPool, policy: Arc<SchemaPolicy>) -> Self {
        Self { db, policy }
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: Vec<SqlValue>,
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlValue::Text(v) => query.bind(v),
            SqlValue::BigInt(v) => query.bind(v),
            SqlValue::Uuid(v) => query.bind(v),
            SqlValue::Timestamp(v) => query.bind(v),
        };
    }
    query
}

fn user_from_row(policy: &SchemaPolicy, row: &PgRow) -> Result<User, sqlx::Error> {
    let id = match policy.id_kind() {
        IdKind::Serial => UserId::Serial(row.try_get("id")?),
        IdKind::Uuid => UserId::Uuid(row.try_get("id")?),
    };
    let mut user = User {
        id,
        username: None,
        email: None,
    };
    for field in statement::returned_fields(policy) {
        let value: Option<String> = row.try_get(field.spec().column)?;
        match field {
            Field::Username => user.username = value,
            Field::Email => user.email = value,
        }
    }
    Ok(user)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, UserStoreError> {
        let digest = password::hash_password(new_user.password())?;
        let Statement { sql, params } = statement::insert_user(
            &self.policy,
            &new_user,
            &digest,
            OffsetDateTime::now_utc(),
            self.policy.id_kind().generate(),
        );
        let row = bind_params(sqlx::query(&sql), params)
            .fetch_one(&self.db)
            .await?;
        Ok(user_from_row(&self.policy, &row)?)
    }

    async fn get_user_by_id(&self, id: UserId) -> Result<User, UserStoreError> {
        let Statement { sql, params } = statement::select_user_by_id(&self.policy, id);
        let row = bind_params(sqlx::query(&sql), params)
            .fetch_optional(&self.db)
            .await?
            .ok_or(UserStoreError::NotFound)?;
        Ok(user_from_row(&self.policy, &row)?)
    }

    async fn get_users(&self) -> Result<Vec<User>, UserStoreError> {
        let Statement { sql, params } = statement::select_users(&self.policy);
        let rows = bind_params(sqlx::query(&sql), params)
            .fetch_all(&self.db)
            .await?;
        let users = rows
            .iter()
            .map(|row| user_from_row(&self.policy, row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    async fn verify_user(&self, login: &str, password: &str) -> Result<User, UserStoreError> {
        let Statement { sql, params } = statement::select_credentials(&self.policy, login);
        let row = bind_params(sqlx::query(&sql), params)
            .fetch_optional(&self.db)
            .await?;
        let candidate = match row {
            Some(row) => {
                let digest = PasswordDigest::from_stored(row.try_get("password_hash")?);
                Some((user_from_row(&self.policy, &row)?, digest))
            }
            None => None,
        };
        check_credentials(candidate, password)
    }

    async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<User, UserStoreError> {
        let Statement { sql, params } = statement::update_user(&self.policy, id, &patch);
        let row = bind_params(sqlx::query(&sql), params)
            .fetch_optional(&self.db)
            .await?
            .ok_or(UserStoreError::NotFound)?;
        Ok(user_from_row(&self.policy, &row)?)
    }

    async fn delete_user(&self, id: UserId) -> Result<(), UserStoreError> {
        let Statement { sql, params } = statement::delete_user(id);
        let result = bind_params(sqlx::query(&sql), params)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(UserStoreError::NotFound);
        }
        Ok(())
    }
}
