//! Engine configuration.
//!
//! Defaults reproduce the storefront's behaviour; every value can be
//! overridden from the environment.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use nexus_commission::{Percentage, PlatformSettings};
use nexus_core::DomainError;

pub const ENV_PAYMENT_LATENCY_MS: &str = "NEXUS_PAYMENT_LATENCY_MS";
pub const ENV_PAYMENT_TIMEOUT_MS: &str = "NEXUS_PAYMENT_TIMEOUT_MS";
pub const ENV_DELIVERY_OFFSET_DAYS: &str = "NEXUS_DELIVERY_OFFSET_DAYS";
pub const ENV_COMMISSION_PCT: &str = "NEXUS_COMMISSION_PCT";
pub const ENV_GST_PCT: &str = "NEXUS_GST_PCT";
pub const ENV_ADVISOR_TIMEOUT_MS: &str = "NEXUS_ADVISOR_TIMEOUT_MS";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key}: cannot parse {value:?}: {reason}")]
    Malformed {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{key}: {reason}")]
    OutOfRange { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Simulated gateway round-trip.
    pub payment_latency_ms: u64,
    /// Upper bound on waiting for an authorization.
    pub payment_timeout_ms: u64,
    /// Days from logistics assignment to estimated delivery.
    pub delivery_offset_days: u32,
    pub default_commission_percentage: f64,
    pub default_gst_percentage: f64,
    pub advisor_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            payment_latency_ms: 1_500,
            payment_timeout_ms: 30_000,
            delivery_offset_days: 5,
            default_commission_percentage: 12.0,
            default_gst_percentage: 18.0,
            advisor_timeout_ms: 10_000,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            payment_latency_ms: read(&lookup, ENV_PAYMENT_LATENCY_MS, defaults.payment_latency_ms)?,
            payment_timeout_ms: read(&lookup, ENV_PAYMENT_TIMEOUT_MS, defaults.payment_timeout_ms)?,
            delivery_offset_days: read(
                &lookup,
                ENV_DELIVERY_OFFSET_DAYS,
                defaults.delivery_offset_days,
            )?,
            default_commission_percentage: read(
                &lookup,
                ENV_COMMISSION_PCT,
                defaults.default_commission_percentage,
            )?,
            default_gst_percentage: read(&lookup, ENV_GST_PCT, defaults.default_gst_percentage)?,
            advisor_timeout_ms: read(&lookup, ENV_ADVISOR_TIMEOUT_MS, defaults.advisor_timeout_ms)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.payment_timeout_ms == 0 {
            return Err(ConfigError::OutOfRange {
                key: ENV_PAYMENT_TIMEOUT_MS,
                reason: "must be positive".to_string(),
            });
        }
        self.platform_settings().map(|_| ())
    }

    pub fn payment_latency(&self) -> Duration {
        Duration::from_millis(self.payment_latency_ms)
    }

    pub fn payment_timeout(&self) -> Duration {
        Duration::from_millis(self.payment_timeout_ms)
    }

    pub fn delivery_offset(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.delivery_offset_days))
    }

    pub fn advisor_timeout(&self) -> Duration {
        Duration::from_millis(self.advisor_timeout_ms)
    }

    /// Starting platform rates.
    pub fn platform_settings(&self) -> Result<PlatformSettings, ConfigError> {
        let out_of_range = |key: &'static str| {
            move |e: DomainError| ConfigError::OutOfRange {
                key,
                reason: e.to_string(),
            }
        };
        Ok(PlatformSettings {
            commission_percentage: Percentage::from_percent(self.default_commission_percentage)
                .map_err(out_of_range(ENV_COMMISSION_PCT))?,
            gst_percentage: Percentage::from_percent(self.default_gst_percentage)
                .map_err(out_of_range(ENV_GST_PCT))?,
        })
    }
}

fn read<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + std::fmt::Debug,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Malformed {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => {
            warn!(key, default = ?default, "config value not set; using default");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.payment_latency(), Duration::from_millis(1_500));
        assert_eq!(config.delivery_offset(), chrono::Duration::days(5));
    }

    #[test]
    fn overrides_are_applied() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_PAYMENT_LATENCY_MS, "0"),
            (ENV_COMMISSION_PCT, "7.5"),
        ]))
        .unwrap();
        assert_eq!(config.payment_latency_ms, 0);
        assert_eq!(
            config.platform_settings().unwrap().commission_percentage.basis_points(),
            750
        );
    }

    #[test]
    fn malformed_value_is_an_error() {
        let err = EngineConfig::from_lookup(lookup(&[(ENV_DELIVERY_OFFSET_DAYS, "five")])).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { key: ENV_DELIVERY_OFFSET_DAYS, .. }));
    }

    #[test]
    fn out_of_range_commission_is_rejected() {
        let err = EngineConfig::from_lookup(lookup(&[(ENV_GST_PCT, "140")])).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { key: ENV_GST_PCT, .. }));
    }
}
