use std::fmt;

use anyhow::Context;

use crate::schema::{IdKind, SchemaPolicy};

/// A year; keeps `exp` well inside the timestamp range.
const MAX_TTL_MINUTES: i64 = 365 * 24 * 60;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 3600;

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("ttl_minutes", &self.ttl_minutes)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub schema: SchemaPolicy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            format!(
                "postgres://{}:{}@{}:{}/{}",
                env_or("DB_USER", "admin"),
                env_or("DB_PASS", "password"),
                env_or("DB_HOST", "localhost"),
                env_or("DB_PORT", "5432"),
                env_or("DB_NAME", "myapp"),
            )
        });

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: env_or("JWT_ISSUER", "identity-records"),
            audience: env_or("JWT_AUDIENCE", "identity-records-users"),
            ttl_minutes: within(
                "JWT_TTL_MINUTES",
                parsed_or("JWT_TTL_MINUTES", 24 * 60),
                1,
                MAX_TTL_MINUTES,
            )?,
        };

        let schema = SchemaPolicy::new(
            bool_env("REQUIRE_USERNAME", true),
            bool_env("REQUIRE_EMAIL", true),
            IdKind::parse(&env_or("ID_FIELD", "serial"))?,
        )?;

        let port = std::env::var("APP_PORT")
            .or_else(|_| std::env::var("PORT"))
            .unwrap_or_else(|_| "8080".into())
            .parse::<u16>()
            .context("APP_PORT must be a port number")?;

        Ok(Self {
            database_url,
            db_max_connections: parsed_or("DB_MAX_CONNECTIONS", 10),
            host: env_or("APP_HOST", "0.0.0.0"),
            port,
            request_timeout_secs: within(
                "REQUEST_TIMEOUT_SECS",
                parsed_or("REQUEST_TIMEOUT_SECS", 30),
                1,
                MAX_REQUEST_TIMEOUT_SECS,
            )?,
            jwt,
            schema,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn within<T>(key: &str, value: T, min: T, max: T) -> anyhow::Result<T>
where
    T: PartialOrd + fmt::Display,
{
    if value < min || value > max {
        anyhow::bail!("{key} must be between {min} and {max}, got {value}");
    }
    Ok(value)
}

fn bool_env(key: &str, default: bool) -> bool {
    parse_flag(std::env::var(key).ok().as_deref(), default)
}

// Unset or empty keeps the default; otherwise only "true" enables.
fn parse_flag(raw: Option<&str>, default: bool) -> bool {
    match raw {
        None | Some("") => default,
        Some(v) => v == "true",
    }
}
