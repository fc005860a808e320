//! Runtime configuration read from the environment (and `.env` via dotenvy)

use std::env;
use std::str::FromStr;

use thiserror::Error;

use crate::slug::{DEFAULT_MAX_ATTEMPTS, DEFAULT_SLUG_LENGTH};

const DEV_JWT_SECRET: &str = "dev-only-secret-change-me";

#[derive(Error, Debug)]
#[error("invalid value {value:?} for {key}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Path of the redb database file
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,
    pub bcrypt_cost: u32,
    pub slug_length: usize,
    /// Generated-slug draws before giving up
    pub slug_max_attempts: u32,
    pub rate_limit_window_secs: u64,
    pub rate_limit_default: u32,
    pub rate_limit_auth: u32,
    pub rate_limit_create: u32,
    /// Frontend origins allowed by CORS
    pub cors_origins: Vec<String>,
}

fn parsed<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError { key, value }),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// # Environment Variables
    /// - `PORT`: Server port (default: 3000)
    /// - `DATABASE_URL`: Path to the database file (default: "data.db")
    /// - `JWT_SECRET`: HS256 signing secret (default: a development secret)
    /// - `JWT_TTL_SECS`: Access token lifetime (default: 3600)
    /// - `BCRYPT_COST`: Password hashing cost (default: 10)
    /// - `SLUG_LENGTH`: Length of generated slugs (default: 7)
    /// - `SLUG_MAX_ATTEMPTS`: Collision retries for generated slugs (default: 32)
    /// - `RATE_LIMIT_WINDOW_SECS`: Throttling window (default: 60)
    /// - `RATE_LIMIT_DEFAULT` / `RATE_LIMIT_AUTH` / `RATE_LIMIT_CREATE`:
    ///   requests per window (defaults: 100 / 5 / 20)
    /// - `CORS_ORIGINS`: Comma separated allowed origins
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!("JWT_SECRET is not set, using the development secret");
                defaults.jwt_secret
            }
        };

        let cors_origins = match env::var("CORS_ORIGINS") {
            Ok(list) => list
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => defaults.cors_origins,
        };

        Ok(Self {
            port: parsed("PORT", defaults.port)?,
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            jwt_secret,
            jwt_ttl_secs: parsed("JWT_TTL_SECS", defaults.jwt_ttl_secs)?,
            bcrypt_cost: parsed("BCRYPT_COST", defaults.bcrypt_cost)?,
            slug_length: parsed("SLUG_LENGTH", defaults.slug_length)?,
            slug_max_attempts: parsed("SLUG_MAX_ATTEMPTS", defaults.slug_max_attempts)?,
            rate_limit_window_secs: parsed("RATE_LIMIT_WINDOW_SECS", defaults.rate_limit_window_secs)?,
            rate_limit_default: parsed("RATE_LIMIT_DEFAULT", defaults.rate_limit_default)?,
            rate_limit_auth: parsed("RATE_LIMIT_AUTH", defaults.rate_limit_auth)?,
            rate_limit_create: parsed("RATE_LIMIT_CREATE", defaults.rate_limit_create)?,
            cors_origins,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "data.db".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_ttl_secs: 3600,
            bcrypt_cost: 10,
            slug_length: DEFAULT_SLUG_LENGTH,
            slug_max_attempts: DEFAULT_MAX_ATTEMPTS,
            rate_limit_window_secs: 60,
            rate_limit_default: 100,
            rate_limit_auth: 5,
            rate_limit_create: 20,
            cors_origins: vec![
                "http://localhost:3200".to_string(),
                "http://localhost:3001".to_string(),
                "http://localhost:5173".to_string(),
            ],
        }
    }
}
