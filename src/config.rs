use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::pricing::FeeSchedule;
use crate::domain::AgentTier;
use crate::error::{ConfigError, Result};

/// Environment variable that overrides the configured database URL.
pub const DATABASE_URL_ENV: &str = "WAYBILL_DATABASE_URL";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub holds: HoldsConfig,
    pub slots: SlotsConfig,
    pub pricing: FeeSchedule,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    /// How long a writer waits on the storage lock before the operation
    /// fails with a retryable contention error.
    pub busy_timeout_ms: u32,
    pub max_connections: u32,
}

/// Collateral percentages withheld from an agent's balance when they
/// take an order, keyed by verification tier and applied to the order's
/// delivery fees.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HoldsConfig {
    pub internal_agent_percentage: Decimal,
    pub verified_agent_percentage: Decimal,
    pub unverified_agent_percentage: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SlotsConfig {
    /// Minimum lead time before a slot's start for it to be bookable.
    pub min_lead_minutes: i64,
    /// Offset of the marketplace's local time from UTC, used when
    /// comparing slot start times against the clock.
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;

        let mut config: Config = toml::from_str(&content).map_err(ConfigError::Parse)?;

        // Environment wins over the file for the database location.
        dotenvy::dotenv().ok();
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            config.database.url = url;
        }

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "database.url",
            }
            .into());
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "database.max_connections",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        for (field, value) in [
            (
                "holds.internal_agent_percentage",
                self.holds.internal_agent_percentage,
            ),
            (
                "holds.verified_agent_percentage",
                self.holds.verified_agent_percentage,
            ),
            (
                "holds.unverified_agent_percentage",
                self.holds.unverified_agent_percentage,
            ),
        ] {
            if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("percentage must be within 0..=100, got {value}"),
                }
                .into());
            }
        }
        if self.slots.min_lead_minutes < 0 {
            return Err(ConfigError::InvalidValue {
                field: "slots.min_lead_minutes",
                reason: "must be non-negative".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            holds: HoldsConfig::default(),
            slots: SlotsConfig::default(),
            pricing: FeeSchedule::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "waybill.db".into(),
            busy_timeout_ms: 5_000,
            max_connections: 5,
        }
    }
}

impl Default for HoldsConfig {
    fn default() -> Self {
        Self {
            internal_agent_percentage: Decimal::ZERO,
            verified_agent_percentage: Decimal::new(80, 0),
            unverified_agent_percentage: Decimal::ONE_HUNDRED,
        }
    }
}

impl HoldsConfig {
    /// Collateral percentage for an agent of the given tier.
    #[must_use]
    pub fn percentage_for(&self, tier: AgentTier) -> Decimal {
        match tier {
            AgentTier::Internal => self.internal_agent_percentage,
            AgentTier::Verified => self.verified_agent_percentage,
            AgentTier::Unverified => self.unverified_agent_percentage,
        }
    }
}

impl Default for SlotsConfig {
    fn default() -> Self {
        Self {
            min_lead_minutes: 120,
            // Africa/Libreville, the marketplace's home timezone.
            utc_offset_minutes: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn tier_percentages_follow_verification_level() {
        let holds = HoldsConfig::default();
        assert_eq!(holds.percentage_for(AgentTier::Internal), dec!(0));
        assert_eq!(holds.percentage_for(AgentTier::Verified), dec!(80));
        assert_eq!(holds.percentage_for(AgentTier::Unverified), dec!(100));
    }

    #[test]
    fn out_of_range_percentage_is_rejected() {
        let config = Config {
            holds: HoldsConfig {
                verified_agent_percentage: dec!(180),
                ..HoldsConfig::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [database]
            url = "orders.db"

            [holds]
            verified_agent_percentage = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.database.url, "orders.db");
        assert_eq!(config.holds.verified_agent_percentage, dec!(50));
        assert_eq!(config.slots.min_lead_minutes, 120);
    }
}
