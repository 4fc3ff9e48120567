//! Configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Storage
//! - `DEALBIRD_STORAGE` - `sqlite` (default) or `postgres`
//! - `DEALBIRD_SQLITE_PATH` - database file path (default: `./data/dealbird.db`)
//! - `DEALBIRD_DATABASE_URL` - `PostgreSQL` connection string, required for
//!   the `postgres` backend (falls back to generic `DATABASE_URL`)
//!
//! ## Email
//! - `DEALBIRD_EMAIL_PROVIDER` - `console` (default) or `smtp`
//! - `DEALBIRD_SMTP_HOST` - SMTP relay host, required for `smtp`
//! - `DEALBIRD_SMTP_PORT` - SMTP port (default: 587)
//! - `DEALBIRD_SMTP_USERNAME` - SMTP username, required for `smtp`
//! - `DEALBIRD_SMTP_PASSWORD` - SMTP password, required for `smtp`
//! - `DEALBIRD_FROM_EMAIL` - sender address (default: `deals@dealbird.app`)
//!
//! ## Brand
//! - `DEALBIRD_BRAND_NAME` - name shown in the email header (default: `Dealbird`)
//!
//! A configuration error is fatal at startup: the run aborts before any
//! ingestion or sending happens.

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub email: EmailConfig,
    pub brand: BrandConfig,
}

/// Which storage backend to open, and how.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// Embedded file-based database.
    Sqlite { path: PathBuf },
    /// Hosted relational database.
    Postgres { database_url: SecretString },
}

/// Which delivery channel to use, and how.
#[derive(Debug, Clone)]
pub enum EmailConfig {
    /// Print rendered digests to the operator console instead of sending.
    Console,
    /// Deliver via an SMTP relay.
    Smtp(SmtpConfig),
}

/// SMTP relay settings.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Name and palette used by the email templates.
#[derive(Debug, Clone)]
pub struct BrandConfig {
    pub name: String,
    pub primary: String,
    pub dark: String,
    pub background: String,
}

impl Default for BrandConfig {
    fn default() -> Self {
        Self {
            name: "Dealbird".to_owned(),
            primary: "#0E8A5F".to_owned(),
            dark: "#0B4A36".to_owned(),
            background: "#F3FAF7".to_owned(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a selected backend or channel is missing its
    /// required variables, or a variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let storage = StorageConfig::from_env()?;
        let email = EmailConfig::from_env()?;
        let brand = BrandConfig::from_env();

        Ok(Self {
            storage,
            email,
            brand,
        })
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let backend = get_env_or_default("DEALBIRD_STORAGE", "sqlite");
        match backend.as_str() {
            "sqlite" => Ok(Self::Sqlite {
                path: PathBuf::from(get_env_or_default(
                    "DEALBIRD_SQLITE_PATH",
                    "./data/dealbird.db",
                )),
            }),
            "postgres" => Ok(Self::Postgres {
                database_url: get_database_url("DEALBIRD_DATABASE_URL")?,
            }),
            other => Err(ConfigError::InvalidEnvVar(
                "DEALBIRD_STORAGE".to_owned(),
                format!("unknown backend '{other}' (expected sqlite or postgres)"),
            )),
        }
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let provider = get_env_or_default("DEALBIRD_EMAIL_PROVIDER", "console");
        match provider.as_str() {
            "console" => Ok(Self::Console),
            "smtp" => Ok(Self::Smtp(SmtpConfig {
                host: get_required_env("DEALBIRD_SMTP_HOST")?,
                port: get_env_or_default("DEALBIRD_SMTP_PORT", "587")
                    .parse::<u16>()
                    .map_err(|e| {
                        ConfigError::InvalidEnvVar("DEALBIRD_SMTP_PORT".to_owned(), e.to_string())
                    })?,
                username: get_required_env("DEALBIRD_SMTP_USERNAME")?,
                password: get_required_env("DEALBIRD_SMTP_PASSWORD").map(SecretString::from)?,
                from_address: get_env_or_default("DEALBIRD_FROM_EMAIL", "deals@dealbird.app"),
            })),
            other => Err(ConfigError::InvalidEnvVar(
                "DEALBIRD_EMAIL_PROVIDER".to_owned(),
                format!("unknown provider '{other}' (expected console or smtp)"),
            )),
        }
    }
}

impl BrandConfig {
    fn from_env() -> Self {
        let mut brand = Self::default();
        if let Ok(name) = std::env::var("DEALBIRD_BRAND_NAME") {
            brand.name = name;
        }
        brand
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get the Postgres URL with fallback to generic `DATABASE_URL` (set by most
/// hosted-Postgres attach flows).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}
