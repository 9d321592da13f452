//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honoured for local development.

use chrono::{FixedOffset, Offset, Utc};
use std::env;
use std::str::FromStr;

/// Longest accepted login session: one year.
const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Server ---
    /// Server port
    pub port: u16,
    /// Frontend URL (CORS origin, cookie security)
    pub frontend_url: String,
    /// sqlx connection string, e.g. `sqlite://noticeboard.db?mode=rwc`
    pub database_url: String,

    // --- Site ---
    pub site_name: String,
    pub site_description: String,
    /// Offset from UTC used to decide calendar dates ("today", notice groups)
    pub site_tz_offset_minutes: i32,

    // --- Uploads ---
    /// Directory where uploaded files are written and served from
    pub upload_dir: String,
    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: usize,

    // --- Auth ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Lifetime of a login session
    pub session_ttl_hours: i64,
    pub login_rate_limit_per_minute: u32,
    pub public_rate_limit_per_minute: u32,

    // --- Bootstrap admin (only used when no users exist) ---
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub admin_email: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_signing_key = env::var("JWT_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
            .trim()
            .as_bytes()
            .to_vec();
        if jwt_signing_key.len() < 32 {
            return Err(ConfigError::Invalid(
                "JWT_SIGNING_KEY",
                "must be at least 32 bytes".to_string(),
            ));
        }

        let site_tz_offset_minutes = parse_or("SITE_TZ_OFFSET_MINUTES", 0)?;
        if FixedOffset::east_opt(site_tz_offset_minutes * 60).is_none() {
            return Err(ConfigError::Invalid(
                "SITE_TZ_OFFSET_MINUTES",
                "offset out of range".to_string(),
            ));
        }

        let session_ttl_hours = check_session_ttl(parse_or("SESSION_TTL_HOURS", 24)?)?;

        let admin_username = non_empty_var("ADMIN_USERNAME");
        if let Some(username) = &admin_username {
            if !crate::models::is_valid_username(username) {
                return Err(ConfigError::Invalid(
                    "ADMIN_USERNAME",
                    "must be 3-50 characters of letters, digits, '_', '.' or '-'".to_string(),
                ));
            }
        }

        Ok(Self {
            port: parse_or("PORT", 8080)?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://noticeboard.db?mode=rwc".to_string()),
            site_name: env::var("SITE_NAME").unwrap_or_else(|_| "Notice Board".to_string()),
            site_description: env::var("SITE_DESCRIPTION")
                .unwrap_or_else(|_| "Official notices and announcements".to_string()),
            site_tz_offset_minutes,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            jwt_signing_key,
            session_ttl_hours,
            login_rate_limit_per_minute: parse_or("LOGIN_RATE_LIMIT_PER_MINUTE", 5)?,
            public_rate_limit_per_minute: parse_or("PUBLIC_RATE_LIMIT_PER_MINUTE", 120)?,
            admin_username,
            admin_password: non_empty_var("ADMIN_PASSWORD"),
            admin_email: non_empty_var("ADMIN_EMAIL"),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            database_url: "sqlite::memory:".to_string(),
            site_name: "Test Notice Board".to_string(),
            site_description: "Notices for tests".to_string(),
            site_tz_offset_minutes: 0,
            upload_dir: std::env::temp_dir()
                .join("noticeboard-test-uploads")
                .to_string_lossy()
                .into_owned(),
            max_upload_bytes: 1024 * 1024,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!!".to_vec(),
            session_ttl_hours: 24,
            login_rate_limit_per_minute: 5,
            public_rate_limit_per_minute: 1000,
            admin_username: None,
            admin_password: None,
            admin_email: None,
        }
    }

    /// Fixed offset for the site's calendar.
    pub fn site_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.site_tz_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }

    /// Whether cookies must carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.frontend_url.starts_with("https://")
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_session_ttl(hours: i64) -> Result<i64, ConfigError> {
    if (1..=MAX_SESSION_TTL_HOURS).contains(&hours) {
        Ok(hours)
    } else {
        Err(ConfigError::Invalid(
            "SESSION_TTL_HOURS",
            format!("must be between 1 and {}", MAX_SESSION_TTL_HOURS),
        ))
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::Invalid(key, e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
