use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use dotenvy::dotenv;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Store
    pub db_max_connections: u32,
    pub store_timeout: Duration,
    pub run_migrations: bool,

    // Logging
    pub log_level: tracing::Level,
    pub log_dir: String,

    /// Allowed browser origins; empty allows any origin.
    pub cors_origins: Vec<String>,

    // Profile images
    pub upload_dir: String,
    pub max_upload_bytes: usize,

    /// First administrator, created at start-up when missing.
    pub admin_seed: Option<AdminSeed>,
}

#[derive(Clone)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
    pub name: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let config = Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parse_var("ACCESS_TOKEN_TTL", "900")?, // default 15 min
            refresh_token_ttl: parse_var("REFRESH_TOKEN_TTL", "604800")?, // default 7 days

            rate_login_per_min: parse_var("RATE_LOGIN_PER_MIN", "60")?,
            rate_refresh_per_min: parse_var("RATE_REFRESH_PER_MIN", "30")?,
            rate_protected_per_min: parse_var("RATE_PROTECTED_PER_MIN", "1000")?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            db_max_connections: parse_var("DB_MAX_CONNECTIONS", "10")?,
            store_timeout: Duration::from_millis(parse_var("STORE_TIMEOUT_MS", "5000")?),
            run_migrations: parse_var("RUN_MIGRATIONS", "true")?,

            log_level: parse_var("LOG_LEVEL", "debug")?,
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),

            cors_origins: origin_list(env::var("CORS_ORIGINS").ok().as_deref()),

            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "public/uploads".to_string()),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", "2097152")?, // default 2 MiB

            admin_seed: admin_seed()?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.jwt_secret.len() < 16 {
            bail!("JWT_SECRET must be at least 16 characters");
        }
        for (key, rate) in [
            ("RATE_LOGIN_PER_MIN", self.rate_login_per_min),
            ("RATE_REFRESH_PER_MIN", self.rate_refresh_per_min),
            ("RATE_PROTECTED_PER_MIN", self.rate_protected_per_min),
        ] {
            if rate == 0 {
                bail!("{key} must be greater than zero");
            }
        }
        if self.store_timeout.is_zero() {
            bail!("STORE_TIMEOUT_MS must be greater than zero");
        }
        if !self.api_prefix.starts_with('/') {
            bail!("API_PREFIX must start with '/'");
        }
        if self.max_upload_bytes == 0 {
            bail!("MAX_UPLOAD_BYTES must be greater than zero");
        }
        Ok(())
    }

    /// Pool acquire deadline, kept inside the request-level store timeout.
    pub fn acquire_timeout(&self) -> Duration {
        self.store_timeout * 4 / 5
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parse_var<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    parse_value(key, env::var(key).ok(), default)
}

/// Parses `raw`, falling back to `default` when the variable is unset.
fn parse_value<T>(key: &str, raw: Option<String>, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = raw.unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid {key} value {raw:?}: {e}"))
}

/// Comma-separated origins; unset, blank or `*` means any origin.
fn origin_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty() && *o != "*")
        .map(str::to_string)
        .collect()
}

fn admin_seed() -> Result<Option<AdminSeed>> {
    match (env::var("ADMIN_USERNAME").ok(), env::var("ADMIN_PASSWORD").ok()) {
        (Some(username), Some(password)) => Ok(Some(AdminSeed {
            name: env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string()),
            username,
            password,
        })),
        (None, None) => Ok(None),
        _ => bail!("ADMIN_USERNAME and ADMIN_PASSWORD must be set together"),
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://localhost/ems_test".into(),
            jwt_secret: "test-secret-0123456789".into(),
            server_addr: "127.0.0.1:0".into(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            rate_login_per_min: 60,
            rate_refresh_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".into(),
            db_max_connections: 1,
            store_timeout: Duration::from_secs(5),
            run_migrations: false,
            log_level: tracing::Level::DEBUG,
            log_dir: "logs".into(),
            cors_origins: Vec::new(),
            upload_dir: "public/uploads".into(),
            max_upload_bytes: 1024,
            admin_seed: None,
        }
    }
}
