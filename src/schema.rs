use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Optional identity fields a deployment may switch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Username,
    Email,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec().column)
    }
}

/// Column descriptor for an optional identity field.
#[derive(Debug)]
pub struct FieldSpec {
    pub field: Field,
    pub column: &'static str,
    pub sql_type: &'static str,
    pub max_len: usize,
    pub unique_constraint: &'static str,
}

/// Descriptor table, in column order. Every statement walks this table.
pub static FIELDS: [FieldSpec; 2] = [
    FieldSpec {
        field: Field::Username,
        column: "username",
        sql_type: "VARCHAR(50)",
        max_len: 50,
        unique_constraint: "users_username_key",
    },
    FieldSpec {
        field: Field::Email,
        column: "email",
        sql_type: "VARCHAR(255)",
        max_len: 255,
        unique_constraint: "users_email_key",
    },
];

impl Field {
    pub fn spec(self) -> &'static FieldSpec {
        match self {
            Field::Username => &FIELDS[0],
            Field::Email => &FIELDS[1],
        }
    }

    /// Maps a violated unique constraint back to its field.
    pub fn from_constraint(name: &str) -> Option<Field> {
        FIELDS
            .iter()
            .find(|spec| spec.unique_constraint == name)
            .map(|spec| spec.field)
    }
}

/// Declared type of the `id` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Serial,
    Uuid,
}

impl IdKind {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "serial" | "bigserial" => Ok(IdKind::Serial),
            "uuid" => Ok(IdKind::Uuid),
            other => anyhow::bail!("unsupported ID_FIELD {other:?} (expected serial or uuid)"),
        }
    }

    pub fn sql_type(self) -> &'static str {
        match self {
            IdKind::Serial => "BIGSERIAL",
            IdKind::Uuid => "UUID",
        }
    }

    /// Identifier to bind on insert; `None` leaves it to the column default.
    pub fn generate(self) -> Option<UserId> {
        match self {
            IdKind::Serial => None,
            IdKind::Uuid => Some(UserId::Uuid(Uuid::new_v4())),
        }
    }

    pub fn parse_id(self, raw: &str) -> Option<UserId> {
        match self {
            IdKind::Serial => raw.parse::<i64>().ok().filter(|v| *v > 0).map(UserId::Serial),
            IdKind::Uuid => Uuid::parse_str(raw).ok().map(UserId::Uuid),
        }
    }
}

/// User identifier, numeric or UUID depending on the deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Serial(i64),
    Uuid(Uuid),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Serial(id) => write!(f, "{id}"),
            UserId::Uuid(id) => write!(f, "{id}"),
        }
    }
}

/// Which identity fields exist in this deployment. Loaded once, read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaPolicy {
    require_username: bool,
    require_email: bool,
    id_kind: IdKind,
}

impl SchemaPolicy {
    pub fn new(require_username: bool, require_email: bool, id_kind: IdKind) -> anyhow::Result<Self> {
        if !require_username && !require_email {
            anyhow::bail!("at least one of REQUIRE_USERNAME or REQUIRE_EMAIL must be enabled");
        }
        Ok(Self {
            require_username,
            require_email,
            id_kind,
        })
    }

    pub fn id_kind(&self) -> IdKind {
        self.id_kind
    }

    pub fn is_active(&self, field: Field) -> bool {
        match field {
            Field::Username => self.require_username,
            Field::Email => self.require_email,
        }
    }

    pub fn active_fields(&self) -> impl Iterator<Item = &'static FieldSpec> + '_ {
        FIELDS.iter().filter(move |spec| self.is_active(spec.field))
    }

    /// Column used to look up credentials on login.
    pub fn login_field(&self) -> Field {
        if self.require_email {
            Field::Email
        } else {
            Field::Username
        }
    }

    pub fn create_table_sql(&self) -> String {
        let mut columns = vec![
            format!("id {} PRIMARY KEY", self.id_kind.sql_type()),
            "password_hash TEXT NOT NULL".to_string(),
            "created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP".to_string(),
        ];
        for spec in self.active_fields() {
            columns.push(format!(
                "{} {} CONSTRAINT {} UNIQUE",
                spec.column, spec.sql_type, spec.unique_constraint
            ));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS users (\n    {}\n)",
            columns.join(",\n    ")
        )
    }
}
