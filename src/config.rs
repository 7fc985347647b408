use anyhow::{Context, Result};
use chrono::NaiveTime;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

/// Tunables for the attendance reconciliation job.
#[derive(Clone, Debug)]
pub struct SyncSettings {
    /// Minutes after shift start before a time-in counts as late
    pub grace_minutes: i64,
    /// Punches closer than this to the previous one are treated as duplicates
    pub debounce_minutes: i64,
    /// Hours around a night shift in which punches still belong to it
    pub night_window_hours: i64,
    pub max_sync_days: i64,

    // Fallback shift for employees without a time schedule
    pub default_start: NaiveTime,
    pub default_end: NaiveTime,
    pub default_break_start: NaiveTime,
    pub default_break_end: NaiveTime,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            grace_minutes: 5,
            debounce_minutes: 2,
            night_window_hours: 4,
            max_sync_days: 62,
            default_start: hm(8, 0),
            default_end: hm(17, 0),
            default_break_start: hm(12, 0),
            default_break_end: hm(13, 0),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    pub log_dir: String,
    pub log_level: tracing::Level,

    /// 0 disables the background cutoff sync
    pub sync_interval_secs: u64,
    pub sync: SyncSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let defaults = SyncSettings::default();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10)?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parse_or("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: parse_or("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: parse_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: parse_or("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: parse_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: parse_or("LOG_LEVEL", tracing::Level::DEBUG)?,

            sync_interval_secs: parse_or("SYNC_INTERVAL_SECS", 0)?,
            sync: SyncSettings {
                grace_minutes: parse_or("GRACE_MINUTES", defaults.grace_minutes)?,
                debounce_minutes: parse_or("PUNCH_DEBOUNCE_MINUTES", defaults.debounce_minutes)?,
                night_window_hours: parse_or("NIGHT_WINDOW_HOURS", defaults.night_window_hours)?,
                max_sync_days: parse_or("MAX_SYNC_DAYS", defaults.max_sync_days)?,
                default_start: time_or("DEFAULT_SHIFT_START", defaults.default_start)?,
                default_end: time_or("DEFAULT_SHIFT_END", defaults.default_end)?,
                default_break_start: time_or("DEFAULT_BREAK_START", defaults.default_break_start)?,
                default_break_end: time_or("DEFAULT_BREAK_END", defaults.default_break_end)?,
            },
        })
    }
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} has an invalid value {raw:?}: {e}")),
        Err(_) => Ok(default),
    }
}

fn time_or(key: &str, default: NaiveTime) -> Result<NaiveTime> {
    match env::var(key) {
        Ok(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M")
            .with_context(|| format!("{key} must be HH:MM, got {raw:?}")),
        Err(_) => Ok(default),
    }
}
