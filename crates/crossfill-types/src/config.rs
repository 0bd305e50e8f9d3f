//! Configuration types for the escrow factory, fee bank and substrate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::asset::ensure_non_negative;
use crate::constants;
use crate::error::{CrossfillError, Result};

/// Whether deposits and withdrawals move the credit allowance with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CreditLink {
    /// Deposits grant matching credit; withdrawals reduce it, saturating at zero.
    #[default]
    Linked,
    /// Credit changes only through explicit grants, revokes and charges.
    Independent,
}

/// Escrow factory parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryConfig {
    /// Native value each escrow keeps on top of amount and safety deposit.
    pub min_operating_reserve: Decimal,
    /// Fraction of a validated fill's making amount charged to the taker's
    /// fee credit. Zero disables partial-fill fees.
    pub fill_fee_rate: Decimal,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            min_operating_reserve: constants::DEFAULT_MIN_OPERATING_RESERVE,
            fill_fee_rate: Decimal::ZERO,
        }
    }
}

/// Fee bank parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBankConfig {
    /// Smallest accepted deposit.
    pub min_deposit: Decimal,
    pub credit_link: CreditLink,
}

impl Default for FeeBankConfig {
    fn default() -> Self {
        Self {
            min_deposit: constants::DEFAULT_MIN_DEPOSIT,
            credit_link: CreditLink::Linked,
        }
    }
}

/// In-memory substrate parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Delivery cap per `run_until_idle`, guards against message loops.
    pub max_deliveries: usize,
    /// Clock value at startup, seconds since the UNIX epoch.
    pub genesis_unix_secs: i64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_deliveries: constants::RUNTIME_MAX_DELIVERIES,
            genesis_unix_secs: constants::GENESIS_UNIX_SECS,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolConfig {
    pub factory: FactoryConfig,
    pub fee_bank: FeeBankConfig,
    pub runtime: RuntimeConfig,
}

impl ProtocolConfig {
    /// Parse and validate a JSON configuration. Missing sections fall back
    /// to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| CrossfillError::Configuration(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let non_negative = |name: &str, v: Decimal| {
            ensure_non_negative(v)
                .map(|_| ())
                .map_err(|_| CrossfillError::Configuration(format!("{name} must be >= 0, got {v}")))
        };
        non_negative("factory.min_operating_reserve", self.factory.min_operating_reserve)?;
        non_negative("factory.fill_fee_rate", self.factory.fill_fee_rate)?;
        non_negative("fee_bank.min_deposit", self.fee_bank.min_deposit)?;
        if self.factory.fill_fee_rate > Decimal::ONE {
            return Err(CrossfillError::Configuration(format!(
                "factory.fill_fee_rate must be <= 1, got {}",
                self.factory.fill_fee_rate
            )));
        }
        if self.runtime.max_deliveries == 0 {
            return Err(CrossfillError::Configuration(
                "runtime.max_deliveries must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_come_from_constants() {
        let cfg = ProtocolConfig::default();
        assert_eq!(cfg.factory.min_operating_reserve, Decimal::new(5, 2));
        assert_eq!(cfg.fee_bank.min_deposit, Decimal::new(1, 3));
        assert_eq!(cfg.fee_bank.credit_link, CreditLink::Linked);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg = ProtocolConfig::from_json_str(
            r#"{"fee_bank": {"min_deposit": "0.5", "credit_link": "Independent"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.fee_bank.min_deposit, Decimal::new(5, 1));
        assert_eq!(cfg.fee_bank.credit_link, CreditLink::Independent);
        assert_eq!(cfg.factory, FactoryConfig::default());
    }

    #[test]
    fn unknown_section_rejected() {
        let err = ProtocolConfig::from_json_str(r#"{"network": {}}"#).unwrap_err();
        assert!(matches!(err, CrossfillError::Configuration(_)));
    }

    #[test]
    fn negative_reserve_rejected() {
        let err = ProtocolConfig::from_json_str(
            r#"{"factory": {"min_operating_reserve": "-1", "fill_fee_rate": "0"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CrossfillError::Configuration(_)));
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = ProtocolConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back = ProtocolConfig::from_json_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
