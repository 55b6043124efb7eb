use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::AppError;
use crate::services::reminder::{MAX_INTERVAL_SECS, MAX_LOOKAHEAD_HOURS};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub reminder_interval_secs: u64,
    pub reminder_lookahead_hours: i64,
}

impl AppConfig {
    /// Reads the configuration from the process environment. Call
    /// `dotenvy::dotenv()` first to pick up a local `.env` file.
    pub fn new_from_env() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://mentorship.db?mode=rwc".to_string());

        Ok(Self {
            database_url,
            bind_addr: parse_or("BIND_ADDR", env::var("BIND_ADDR").ok(), SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            max_connections: parse_or("DB_MAX_CONNECTIONS", env::var("DB_MAX_CONNECTIONS").ok(), 5)?,
            reminder_interval_secs: parse_in_range(
                "REMINDER_INTERVAL_SECS",
                env::var("REMINDER_INTERVAL_SECS").ok(),
                3600,
                1..=MAX_INTERVAL_SECS,
            )?,
            reminder_lookahead_hours: parse_in_range(
                "REMINDER_LOOKAHEAD_HOURS",
                env::var("REMINDER_LOOKAHEAD_HOURS").ok(),
                24,
                1..=MAX_LOOKAHEAD_HOURS,
            )?,
        })
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, AppError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| AppError::validation(format!("{} has an invalid value: {}", key, value))),
    }
}

fn parse_in_range<T>(key: &str, raw: Option<String>, default: T, range: RangeInclusive<T>) -> Result<T, AppError>
where
    T: FromStr + PartialOrd + Display,
{
    let value = parse_or(key, raw, default)?;
    if !range.contains(&value) {
        return Err(AppError::validation(format!(
            "{} must be between {} and {}, got {}",
            key,
            range.start(),
            range.end(),
            value
        )));
    }
    Ok(value)
}
