use std::env;
use std::fmt;

use rust_decimal::Decimal;

use crate::billing::DebtPolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub policy: DebtPolicy,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let mut policy = DebtPolicy::default();
        if let Ok(raw) = env::var("BURSAR_GRACE_PERIOD_DAYS") {
            policy.default_grace_period_days = raw
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidGracePeriod { value: raw.clone() })?;
        }
        if let Ok(raw) = env::var("BURSAR_PRICE_PER_CREDIT") {
            let price = raw
                .trim()
                .parse::<Decimal>()
                .map_err(|source| ConfigError::InvalidPricePerCredit {
                    value: raw.clone(),
                    source: Some(source),
                })?;
            if price < Decimal::ZERO {
                return Err(ConfigError::InvalidPricePerCredit {
                    value: raw,
                    source: None,
                });
            }
            policy.default_price_per_credit = price;
        }

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            policy,
        })
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidGracePeriod {
        value: String,
    },
    InvalidPricePerCredit {
        value: String,
        source: Option<rust_decimal::Error>,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidGracePeriod { value } => write!(
                f,
                "BURSAR_GRACE_PERIOD_DAYS must be a non-negative integer (got '{value}')"
            ),
            ConfigError::InvalidPricePerCredit { value, .. } => write!(
                f,
                "BURSAR_PRICE_PER_CREDIT must be a non-negative decimal amount (got '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidGracePeriod { .. } => None,
            ConfigError::InvalidPricePerCredit { source, .. } => source
                .as_ref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("BURSAR_GRACE_PERIOD_DAYS");
        env::remove_var("BURSAR_PRICE_PER_CREDIT");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.policy.default_grace_period_days, 15);
        assert_eq!(config.policy.default_price_per_credit, dec!(50.00));
    }

    #[test]
    fn reads_policy_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "ci");
        env::set_var("BURSAR_GRACE_PERIOD_DAYS", "30");
        env::set_var("BURSAR_PRICE_PER_CREDIT", "62.75");
        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.environment, AppEnvironment::Test);
        assert_eq!(config.policy.default_grace_period_days, 30);
        assert_eq!(config.policy.default_price_per_credit, dec!(62.75));
    }

    #[test]
    fn rejects_negative_price() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("BURSAR_PRICE_PER_CREDIT", "-1");
        let err = AppConfig::load().expect_err("negative price rejected");
        reset_env();

        assert!(matches!(err, ConfigError::InvalidPricePerCredit { .. }));
    }
}
