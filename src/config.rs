//! Environment-driven configuration.
//!
//! Loaded once at startup and immutable afterwards. A missing required
//! variable is a fatal configuration error: the process never starts.

use std::collections::BTreeSet;
use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CoordinatorError;

/// Modules the scheduler may register. Controlled via `COORDINATOR_MODULES`
/// (comma-separated), defaulting to all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Core,
    Pump,
    Staker,
    ValidatorsStats,
    Splitter,
    MoveLiquidityProvider,
}

impl FromStr for ModuleKind {
    type Err = CoordinatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "core" => Ok(ModuleKind::Core),
            "pump" => Ok(ModuleKind::Pump),
            "staker" => Ok(ModuleKind::Staker),
            "validators_stats" => Ok(ModuleKind::ValidatorsStats),
            "splitter" => Ok(ModuleKind::Splitter),
            "move_liquidity_provider" => Ok(ModuleKind::MoveLiquidityProvider),
            other => Err(CoordinatorError::config(format!(
                "unknown module '{other}' in COORDINATOR_MODULES"
            ))),
        }
    }
}

impl ModuleKind {
    pub fn all() -> BTreeSet<ModuleKind> {
        [
            ModuleKind::Core,
            ModuleKind::Pump,
            ModuleKind::Staker,
            ModuleKind::ValidatorsStats,
            ModuleKind::Splitter,
            ModuleKind::MoveLiquidityProvider,
        ]
        .into_iter()
        .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Chain endpoints
    pub hub_rpc: String,
    pub target_rpc: String,
    pub hub_chain_id: String,

    // Signer
    #[serde(skip_serializing)]
    pub mnemonic: String,
    pub address_prefix: String,

    // Protocol entry point
    pub factory_contract: String,

    // Denoms
    pub hub_fee_denom: String,
    pub hub_bond_denom: String,
    pub target_denom: String,

    // Gas
    pub gas_price: f64,
    pub gas_limit: u64,

    // Scheduling
    pub checks_period_secs: u64,
    pub rpc_timeout_secs: u64,

    // Module thresholds
    pub pump_min_balance: u128,
    pub staker_min_balance: u128,
    pub splitter_min_balance: u128,
    pub validators_info_period_secs: u64,

    // Enabled modules
    pub modules: BTreeSet<ModuleKind>,
}

fn default_address_prefix() -> String {
    "neutron".to_string()
}
fn default_hub_fee_denom() -> String {
    "untrn".to_string()
}
fn default_gas_price() -> f64 {
    0.025
}
fn default_gas_limit() -> u64 {
    2_000_000
}
fn default_checks_period_secs() -> u64 {
    30
}
fn default_rpc_timeout_secs() -> u64 {
    15
}
fn default_min_balance() -> u128 {
    1_000
}
fn default_validators_info_period_secs() -> u64 {
    3_600
}

fn required(name: &str) -> Result<String, CoordinatorError> {
    env::var(name)
        .map_err(|_| CoordinatorError::config(format!("required variable {name} is not set")))
}

fn optional_parsed<T: FromStr>(name: &str, default: T) -> Result<T, CoordinatorError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| CoordinatorError::config(format!("invalid {name}: {e}"))),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Required: `COORDINATOR_MNEMONIC`, `COORDINATOR_FACTORY_CONTRACT`,
    /// `COORDINATOR_HUB_RPC`, `COORDINATOR_HUB_CHAIN_ID`,
    /// `COORDINATOR_TARGET_RPC`, `COORDINATOR_HUB_BOND_DENOM`,
    /// `COORDINATOR_TARGET_DENOM`. Everything else has defaults.
    pub fn from_env() -> Result<Self, CoordinatorError> {
        let modules = match env::var("COORDINATOR_MODULES") {
            Ok(raw) => raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(ModuleKind::from_str)
                .collect::<Result<BTreeSet<_>, _>>()?,
            Err(_) => ModuleKind::all(),
        };

        let cfg = Self {
            hub_rpc: required("COORDINATOR_HUB_RPC")?,
            target_rpc: required("COORDINATOR_TARGET_RPC")?,
            hub_chain_id: required("COORDINATOR_HUB_CHAIN_ID")?,
            mnemonic: required("COORDINATOR_MNEMONIC")?,
            address_prefix: env::var("COORDINATOR_ADDRESS_PREFIX")
                .unwrap_or_else(|_| default_address_prefix()),
            factory_contract: required("COORDINATOR_FACTORY_CONTRACT")?,
            hub_fee_denom: env::var("COORDINATOR_HUB_FEE_DENOM")
                .unwrap_or_else(|_| default_hub_fee_denom()),
            hub_bond_denom: required("COORDINATOR_HUB_BOND_DENOM")?,
            target_denom: required("COORDINATOR_TARGET_DENOM")?,
            gas_price: optional_parsed("COORDINATOR_GAS_PRICE", default_gas_price())?,
            gas_limit: optional_parsed("COORDINATOR_GAS_LIMIT", default_gas_limit())?,
            checks_period_secs: optional_parsed(
                "COORDINATOR_CHECKS_PERIOD",
                default_checks_period_secs(),
            )?,
            rpc_timeout_secs: optional_parsed(
                "COORDINATOR_RPC_TIMEOUT",
                default_rpc_timeout_secs(),
            )?,
            pump_min_balance: optional_parsed(
                "COORDINATOR_PUMP_MIN_BALANCE",
                default_min_balance(),
            )?,
            staker_min_balance: optional_parsed(
                "COORDINATOR_STAKER_MIN_BALANCE",
                default_min_balance(),
            )?,
            splitter_min_balance: optional_parsed(
                "COORDINATOR_SPLITTER_MIN_BALANCE",
                default_min_balance(),
            )?,
            validators_info_period_secs: optional_parsed(
                "COORDINATOR_VALIDATORS_INFO_PERIOD",
                default_validators_info_period_secs(),
            )?,
            modules,
        };

        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration consistency and constraints.
    pub fn validate(&self) -> Result<(), CoordinatorError> {
        if self.checks_period_secs == 0 {
            return Err(CoordinatorError::config(
                "checks_period_secs must be greater than 0",
            ));
        }

        if self.rpc_timeout_secs == 0 {
            return Err(CoordinatorError::config(
                "rpc_timeout_secs must be greater than 0",
            ));
        }

        if self.gas_limit == 0 {
            return Err(CoordinatorError::config("gas_limit must be greater than 0"));
        }

        if !(self.gas_price > 0.0) {
            return Err(CoordinatorError::config("gas_price must be positive"));
        }

        if self.mnemonic.split_whitespace().count() < 12 {
            return Err(CoordinatorError::config(
                "mnemonic must contain at least 12 words",
            ));
        }

        if self.factory_contract.is_empty() {
            return Err(CoordinatorError::config("factory_contract must be set"));
        }

        if self.modules.is_empty() {
            return Err(CoordinatorError::config(
                "at least one module must be enabled",
            ));
        }

        Ok(())
    }

    /// The fee charged for one transaction, in the hub fee denom.
    pub fn fee_amount(&self) -> u128 {
        (self.gas_price * self.gas_limit as f64).ceil() as u128
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Config {
    /// A config suitable for tests; never reads the environment.
    pub fn for_tests() -> Self {
        Self {
            hub_rpc: "http://127.0.0.1:26657".to_string(),
            target_rpc: "http://127.0.0.1:26658".to_string(),
            hub_chain_id: "neutron-1".to_string(),
            mnemonic: "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about".to_string(),
            address_prefix: default_address_prefix(),
            factory_contract: "neutron1factory".to_string(),
            hub_fee_denom: default_hub_fee_denom(),
            hub_bond_denom: "ibc/uatom".to_string(),
            target_denom: "uatom".to_string(),
            gas_price: default_gas_price(),
            gas_limit: default_gas_limit(),
            checks_period_secs: default_checks_period_secs(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
            pump_min_balance: default_min_balance(),
            staker_min_balance: default_min_balance(),
            splitter_min_balance: default_min_balance(),
            validators_info_period_secs: default_validators_info_period_secs(),
            modules: ModuleKind::all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_test_config_passes_validation() {
        Config::for_tests().validate().expect("test config is valid");
    }

    #[test]
    fn zero_checks_period_is_rejected() {
        let cfg = Config {
            checks_period_secs: 0,
            ..Config::for_tests()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("checks_period_secs"));
    }

    #[test]
    fn short_mnemonic_is_rejected() {
        let cfg = Config {
            mnemonic: "too short".to_string(),
            ..Config::for_tests()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn module_kind_parsing() {
        assert_eq!("core".parse::<ModuleKind>().unwrap(), ModuleKind::Core);
        assert_eq!(
            " validators_stats ".parse::<ModuleKind>().unwrap(),
            ModuleKind::ValidatorsStats
        );
        assert!("frobnicator".parse::<ModuleKind>().is_err());
        assert_eq!(ModuleKind::all().len(), 6);
    }

    #[test]
    fn fee_amount_rounds_up() {
        let cfg = Config {
            gas_price: 0.025,
            gas_limit: 1_000_001,
            ..Config::for_tests()
        };
        assert_eq!(cfg.fee_amount(), 25_001);
    }
}
