//! Module registry.
//!
//! Each module is an independent unit the scheduler polls once per tick:
//! query one or two pieces of chain state, apply a static condition, and if
//! it holds issue exactly one signed transaction. Modules are stateless
//! across ticks apart from lazily resolved ICA addresses and the stats
//! module's last-push stamp.

pub mod core;
pub mod liquidity;
pub mod pump;
pub mod splitter;
pub mod staker;
pub mod validators_stats;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::chain::ChainOps;
use crate::config::{Config, ModuleKind};
use crate::errors::CoordinatorError;
use crate::factory::FactoryState;

pub use self::core::{verify_core_config, CoreModule, CoreModuleConfig};
pub use self::liquidity::{
    verify_liquidity_config, MoveLiquidityProviderModule, MoveLiquidityProviderConfig,
};
pub use self::pump::{verify_pump_config, PumpModule, PumpModuleConfig};
pub use self::splitter::{verify_splitter_config, SplitterModule, SplitterModuleConfig};
pub use self::staker::{verify_staker_config, StakerModule, StakerModuleConfig};
pub use self::validators_stats::{
    verify_validators_stats_config, ValidatorsStatsModule, ValidatorsStatsConfig,
};

/// Outcome of one module run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The trigger condition held and one transaction was broadcast.
    Executed { tx_hash: String },
    /// Nothing to do this tick; the reason is logged.
    Idle(&'static str),
}

/// A schedulable unit of coordinator work.
#[async_trait]
pub trait ManagerModule: Send {
    fn name(&self) -> &str;

    async fn run(&mut self) -> Result<RunOutcome, CoordinatorError>;
}

/// Build the module registry for the enabled module set, validating each
/// module's config up front. Registration order is execution order.
pub fn build_registry(
    cfg: &Config,
    factory_state: &FactoryState,
    hub: Arc<dyn ChainOps>,
    target: Arc<dyn ChainOps>,
) -> Result<Vec<Box<dyn ManagerModule>>, CoordinatorError> {
    let mut registry: Vec<Box<dyn ManagerModule>> = Vec::new();

    if cfg.modules.contains(&ModuleKind::Core) {
        let module_cfg = CoreModuleConfig {
            core_address: factory_state.core_contract.clone(),
            puppeteer_address: factory_state.puppeteer_contract.clone(),
        };
        verify_core_config(&module_cfg)?;
        registry.push(Box::new(CoreModule::new(hub.clone(), module_cfg)));
    }

    if cfg.modules.contains(&ModuleKind::Pump) {
        // One instance per configured pump
        let pumps = [
            ("rewards-pump", factory_state.rewards_pump_contract.as_ref()),
            (
                "unbonding-pump",
                factory_state.unbonding_pump_contract.as_ref(),
            ),
        ];
        for (name, address) in pumps {
            if let Some(address) = address {
                let module_cfg = PumpModuleConfig {
                    pump_address: address.clone(),
                    target_denom: cfg.target_denom.clone(),
                    min_balance: cfg.pump_min_balance,
                };
                verify_pump_config(&module_cfg)?;
                registry.push(Box::new(PumpModule::new(
                    name,
                    hub.clone(),
                    target.clone(),
                    module_cfg,
                )));
            }
        }
    }

    if cfg.modules.contains(&ModuleKind::Staker) {
        let module_cfg = StakerModuleConfig {
            staker_address: factory_state.native_bond_provider_contract.clone(),
            bond_denom: cfg.hub_bond_denom.clone(),
            min_balance: cfg.staker_min_balance,
        };
        verify_staker_config(&module_cfg)?;
        registry.push(Box::new(StakerModule::new(hub.clone(), module_cfg)));
    }

    if cfg.modules.contains(&ModuleKind::ValidatorsStats) {
        let module_cfg = ValidatorsStatsConfig {
            validators_set_address: factory_state.validators_set_contract.clone(),
            info_period: Duration::from_secs(cfg.validators_info_period_secs),
        };
        verify_validators_stats_config(&module_cfg)?;
        registry.push(Box::new(ValidatorsStatsModule::new(
            hub.clone(),
            target.clone(),
            module_cfg,
        )));
    }

    if cfg.modules.contains(&ModuleKind::Splitter) {
        let module_cfg = SplitterModuleConfig {
            splitter_address: factory_state.splitter_contract.clone(),
            denom: cfg.hub_bond_denom.clone(),
            min_balance: cfg.splitter_min_balance,
        };
        verify_splitter_config(&module_cfg)?;
        registry.push(Box::new(SplitterModule::new(hub.clone(), module_cfg)));
    }

    if cfg.modules.contains(&ModuleKind::MoveLiquidityProvider) {
        let module_cfg = MoveLiquidityProviderConfig {
            provider_address: factory_state.native_bond_provider_contract.clone(),
        };
        verify_liquidity_config(&module_cfg)?;
        registry.push(Box::new(MoveLiquidityProviderModule::new(
            hub.clone(),
            module_cfg,
        )));
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::MockChain;

    fn factory_state() -> FactoryState {
        serde_json::from_value(serde_json::json!({
            "token_contract": "neutron1token",
            "core_contract": "neutron1core",
            "puppeteer_contract": "neutron1puppeteer",
            "withdrawal_voucher_contract": "neutron1voucher",
            "withdrawal_manager_contract": "neutron1wmanager",
            "strategy_contract": "neutron1strategy",
            "validators_set_contract": "neutron1valset",
            "distribution_contract": "neutron1distribution",
            "rewards_manager_contract": "neutron1rmanager",
            "splitter_contract": "neutron1splitter",
            "native_bond_provider_contract": "neutron1provider",
            "rewards_pump_contract": "neutron1rpump",
            "unbonding_pump_contract": "neutron1upump"
        }))
        .unwrap()
    }

    #[test]
    fn registry_includes_one_pump_instance_per_configured_pump() {
        let cfg = Config::for_tests();
        let hub: Arc<dyn ChainOps> = Arc::new(MockChain::new());
        let target: Arc<dyn ChainOps> = Arc::new(MockChain::new());

        let registry = build_registry(&cfg, &factory_state(), hub, target).unwrap();
        let names: Vec<&str> = registry.iter().map(|m| m.name()).collect();
        assert_eq!(
            names,
            vec![
                "core",
                "rewards-pump",
                "unbonding-pump",
                "staker",
                "validators-stats",
                "splitter",
                "move-liquidity-provider"
            ]
        );
    }

    #[test]
    fn registry_respects_enabled_module_set() {
        let mut cfg = Config::for_tests();
        cfg.modules = [ModuleKind::Core, ModuleKind::Splitter].into_iter().collect();
        let hub: Arc<dyn ChainOps> = Arc::new(MockChain::new());
        let target: Arc<dyn ChainOps> = Arc::new(MockChain::new());

        let registry = build_registry(&cfg, &factory_state(), hub, target).unwrap();
        let names: Vec<&str> = registry.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["core", "splitter"]);
    }

    #[test]
    fn pump_modules_skipped_when_factory_has_no_pumps() {
        let cfg = Config::for_tests();
        let mut state = factory_state();
        state.rewards_pump_contract = None;
        state.unbonding_pump_contract = None;
        let hub: Arc<dyn ChainOps> = Arc::new(MockChain::new());
        let target: Arc<dyn ChainOps> = Arc::new(MockChain::new());

        let registry = build_registry(&cfg, &state, hub, target).unwrap();
        assert!(registry.iter().all(|m| !m.name().contains("pump")));
    }
}
