use anyhow::{anyhow, Result};
use chrono::Utc;
use cron::Schedule;
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub app_mode: String,
    pub database_url: String,
    pub redis_url: String,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub notification_ttl_days: i64,
    pub cleanup: CleanupConfig,
}

/// Timing for the notification cleanup run in worker mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CleanupConfig {
    /// Seconds-first cron expression, e.g. `0 0 3 * * *` for daily at 03:00 UTC.
    pub cron: String,
    pub lock_at_most_seconds: u64,
    pub max_execution_seconds: u64,
}

impl CleanupConfig {
    pub fn schedule(&self) -> Result<Schedule> {
        Schedule::from_str(&self.cron)
            .map_err(|err| anyhow!("invalid NOTIFICATION_CLEANUP_CRON '{}': {}", self.cron, err))
    }

    pub fn validate(&self) -> Result<()> {
        if self.schedule()?.upcoming(Utc).next().is_none() {
            return Err(anyhow!(
                "invalid NOTIFICATION_CLEANUP_CRON '{}': no upcoming run",
                self.cron
            ));
        }
        if self.max_execution_seconds == 0 {
            return Err(anyhow!(
                "invalid NOTIFICATION_CLEANUP_MAX_EXECUTION_SECONDS: must be greater than 0"
            ));
        }
        // A run must never outlive the lock that guards it.
        if self.max_execution_seconds > self.lock_at_most_seconds {
            return Err(anyhow!(
                "invalid NOTIFICATION_CLEANUP_MAX_EXECUTION_SECONDS: {} exceeds lock lifetime of {} seconds",
                self.max_execution_seconds,
                self.lock_at_most_seconds
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;
        let app_mode = env_or("APP_MODE", "api");

        let notification_ttl_days: i64 = env_or_parse("NOTIFICATION_TTL_DAYS", "30")?;
        if notification_ttl_days <= 0 {
            return Err(anyhow!("invalid NOTIFICATION_TTL_DAYS: must be greater than 0"));
        }

        let cleanup = CleanupConfig {
            cron: env_or("NOTIFICATION_CLEANUP_CRON", "0 0 * * * *"),
            lock_at_most_seconds: env_or_parse("NOTIFICATION_CLEANUP_LOCK_AT_MOST_SECONDS", "300")?,
            max_execution_seconds: env_or_parse(
                "NOTIFICATION_CLEANUP_MAX_EXECUTION_SECONDS",
                "120",
            )?,
        };
        cleanup.validate()?;

        Ok(Self {
            http_addr,
            app_mode,
            database_url: env_or_err("DATABASE_URL")?,
            redis_url: env_or("REDIS_URL", "redis://127.0.0.1/"),
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env_or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            notification_ttl_days,
            cleanup,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleanup(cron: &str, lock: u64, max: u64) -> CleanupConfig {
        CleanupConfig {
            cron: cron.to_string(),
            lock_at_most_seconds: lock,
            max_execution_seconds: max,
        }
    }

    #[test]
    fn default_cleanup_window_is_valid() {
        assert!(cleanup("0 0 * * * *", 300, 120).validate().is_ok());
    }

    #[test]
    fn execution_may_equal_lock_lifetime() {
        assert!(cleanup("0 * * * * *", 30, 30).validate().is_ok());
    }

    #[test]
    fn execution_longer_than_lock_is_rejected() {
        let err = cleanup("0 * * * * *", 30, 31).validate().unwrap_err();
        assert!(err
            .to_string()
            .contains("NOTIFICATION_CLEANUP_MAX_EXECUTION_SECONDS"));
    }

    #[test]
    fn daily_cron_expression_is_accepted() {
        let config = cleanup("0 0 3 * * *", 300, 120);
        assert!(config.validate().is_ok());
        assert!(config.schedule().is_ok());
    }

    #[test]
    fn malformed_cron_expression_is_rejected() {
        let err = cleanup("every hour", 300, 120).validate().unwrap_err();
        assert!(err.to_string().contains("NOTIFICATION_CLEANUP_CRON"));
    }

    #[test]
    fn cron_without_upcoming_run_is_rejected() {
        let err = cleanup("0 0 0 1 1 * 2001", 300, 120).validate().unwrap_err();
        assert!(err.to_string().contains("no upcoming run"));
    }
}
