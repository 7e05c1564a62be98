//! SQL for the `users` table, shaped by the [`SchemaPolicy`].
//!
//! Every column that carries a value goes through [`Columns::bind`], which
//! records the column name, its `$n` placeholder and the value in one step,
//! so the placeholder numbering and the parameter list cannot drift apart.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::password::PasswordDigest;
use crate::schema::{Field, SchemaPolicy, UserId};
use crate::users::repo_types::{NewUser, UserPatch};

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    BigInt(i64),
    Uuid(Uuid),
    Timestamp(OffsetDateTime),
}

impl From<UserId> for SqlValue {
    fn from(id: UserId) -> Self {
        match id {
            UserId::Serial(v) => SqlValue::BigInt(v),
            UserId::Uuid(v) => SqlValue::Uuid(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

#[derive(Default)]
struct Columns {
    names: Vec<&'static str>,
    slots: Vec<String>,
    params: Vec<SqlValue>,
}

impl Columns {
    fn bind(&mut self, column: &'static str, value: SqlValue) {
        self.params.push(value);
        self.names.push(column);
        self.slots.push(format!("${}", self.params.len()));
    }

    fn column_default(&mut self, column: &'static str) {
        self.names.push(column);
        self.slots.push("DEFAULT".to_string());
    }

    /// Placeholder for a value that is not tied to a listed column (WHERE clauses).
    fn param(&mut self, value: SqlValue) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }
}

/// `id` followed by the active optional columns.
pub fn user_columns(policy: &SchemaPolicy) -> String {
    std::iter::once("id")
        .chain(policy.active_fields().map(|spec| spec.column))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn insert_user(
    policy: &SchemaPolicy,
    user: &NewUser,
    digest: &PasswordDigest,
    created_at: OffsetDateTime,
    id: Option<UserId>,
) -> Statement {
    let mut cols = Columns::default();
    match id {
        Some(id) => cols.bind("id", id.into()),
        None => cols.column_default("id"),
    }
    for spec in policy.active_fields() {
        let value = user.field(spec.field).unwrap_or_default().to_string();
        cols.bind(spec.column, SqlValue::Text(value));
    }
    cols.bind("password_hash", SqlValue::Text(digest.as_str().to_string()));
    cols.bind("created_at", SqlValue::Timestamp(created_at));

    Statement {
        sql: format!(
            "INSERT INTO users ({}) VALUES ({}) RETURNING {}",
            cols.names.join(", "),
            cols.slots.join(", "),
            user_columns(policy)
        ),
        params: cols.params,
    }
}

pub fn select_user_by_id(policy: &SchemaPolicy, id: UserId) -> Statement {
    let mut cols = Columns::default();
    let slot = cols.param(id.into());
    Statement {
        sql: format!(
            "SELECT {} FROM users WHERE id = {slot}",
            user_columns(policy)
        ),
        params: cols.params,
    }
}

pub fn select_users(policy: &SchemaPolicy) -> Statement {
    Statement {
        sql: format!(
            "SELECT {} FROM users ORDER BY created_at, id",
            user_columns(policy)
        ),
        params: Vec::new(),
    }
}

/// Public columns plus `password_hash`, looked up by the login column.
pub fn select_credentials(policy: &SchemaPolicy, login: &str) -> Statement {
    let mut cols = Columns::default();
    let slot = cols.param(SqlValue::Text(login.to_string()));
    Statement {
        sql: format!(
            "SELECT {}, password_hash FROM users WHERE {} = {slot}",
            user_columns(policy),
            policy.login_field().spec().column
        ),
        params: cols.params,
    }
}

pub fn update_user(policy: &SchemaPolicy, id: UserId, patch: &UserPatch) -> Statement {
    let mut cols = Columns::default();
    for spec in policy.active_fields() {
        if let Some(value) = patch.field(spec.field) {
            cols.bind(spec.column, SqlValue::Text(value.to_string()));
        }
    }
    let assignments = cols
        .names
        .iter()
        .zip(&cols.slots)
        .map(|(name, slot)| format!("{name} = {slot}"))
        .collect::<Vec<_>>()
        .join(", ");
    let id_slot = cols.param(id.into());

    Statement {
        sql: format!(
            "UPDATE users SET {assignments} WHERE id = {id_slot} RETURNING {}",
            user_columns(policy)
        ),
        params: cols.params,
    }
}

pub fn delete_user(id: UserId) -> Statement {
    Statement {
        sql: "DELETE FROM users WHERE id = $1".to_string(),
        params: vec![id.into()],
    }
}

/// Active fields that appear in `RETURNING`/`SELECT` lists, in order.
pub fn returned_fields(policy: &SchemaPolicy) -> impl Iterator<Item = Field> + '_ {
    policy.active_fields().map(|spec| spec.field)
}
