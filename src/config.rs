// src/config.rs

use std::{env, fmt, str::FromStr};

use dotenvy::dotenv;

/// Lifetime of a session bearer token. Tokens are never refreshed.
pub const TOKEN_TTL_SECONDS: u64 = 3600;

/// Inclusive upper bound for a submitted quiz score.
pub const MAX_QUIZ_SCORE: i32 = 1000;

/// Error raised while reading configuration from the environment.
#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{key} must be set"),
            ConfigError::Invalid { key, reason } => write!(f, "invalid {key}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Credentials for the JSON transactional mail API.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

/// Google OAuth client registration.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL URL. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    /// Base URL used when composing password reset links.
    pub public_base_url: String,
    /// Maximum retained quiz attempts per user.
    pub quiz_attempt_cap: usize,
    pub otp_ttl_seconds: i64,
    pub verification_ttl_seconds: i64,
    pub reset_token_ttl_seconds: i64,
    pub sweep_interval_seconds: u64,
    pub mail: Option<MailConfig>,
    pub google: Option<GoogleConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = optional("DATABASE_URL");

        let jwt_secret = optional("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let rust_log = optional("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let public_base_url = optional("PUBLIC_BASE_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let mail = match (
            optional("MAIL_API_URL"),
            optional("MAIL_API_KEY"),
            optional("MAIL_FROM"),
        ) {
            (Some(api_url), Some(api_key), Some(from)) => Some(MailConfig {
                api_url,
                api_key,
                from,
            }),
            _ => None,
        };

        let google = match (
            optional("GOOGLE_CLIENT_ID"),
            optional("GOOGLE_CLIENT_SECRET"),
            optional("GOOGLE_REDIRECT_URL"),
        ) {
            (Some(client_id), Some(client_secret), Some(redirect_url)) => Some(GoogleConfig {
                client_id,
                client_secret,
                redirect_url,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration: TOKEN_TTL_SECONDS,
            rust_log,
            port: parse_or("PORT", 3000)?,
            public_base_url,
            quiz_attempt_cap: parse_or("QUIZ_ATTEMPT_CAP", 20)?,
            otp_ttl_seconds: parse_or("OTP_TTL_SECONDS", 300)?,
            verification_ttl_seconds: parse_or("VERIFICATION_TTL_SECONDS", 900)?,
            reset_token_ttl_seconds: parse_or("RESET_TOKEN_TTL_SECONDS", 900)?,
            sweep_interval_seconds: parse_or("SWEEP_INTERVAL_SECONDS", 60)?,
            mail,
            google,
        })
    }
}

/// Reads a variable, treating empty values as unset.
fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match optional(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}
