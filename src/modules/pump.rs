//! Pump module: sweeps a pump contract's ICA balance home.
//!
//! The ICA address is resolved once and cached for the process lifetime;
//! registration is (re)triggered when the contract reports no ICA or a
//! timed-out registration.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::chain::ChainOps;
use crate::contracts::pump::PumpContract;
use crate::contracts::{CoinJson, IcaState};
use crate::errors::CoordinatorError;
use crate::modules::{ManagerModule, RunOutcome};

#[derive(Debug, Clone)]
pub struct PumpModuleConfig {
    pub pump_address: String,
    pub target_denom: String,
    /// Sweep only when the ICA balance strictly exceeds this.
    pub min_balance: u128,
}

pub fn verify_pump_config(cfg: &PumpModuleConfig) -> Result<(), CoordinatorError> {
    if cfg.pump_address.is_empty() {
        return Err(CoordinatorError::config("pump module: pump_address empty"));
    }
    if cfg.target_denom.is_empty() {
        return Err(CoordinatorError::config("pump module: target_denom empty"));
    }
    Ok(())
}

pub struct PumpModule {
    name: String,
    hub: Arc<dyn ChainOps>,
    target: Arc<dyn ChainOps>,
    cfg: PumpModuleConfig,
    ica_address: Option<String>,
}

impl PumpModule {
    pub fn new(
        name: &str,
        hub: Arc<dyn ChainOps>,
        target: Arc<dyn ChainOps>,
        cfg: PumpModuleConfig,
    ) -> Self {
        Self {
            name: name.to_string(),
            hub,
            target,
            cfg,
            ica_address: None,
        }
    }

    async fn resolve_ica(&mut self) -> Result<Option<RunOutcome>, CoordinatorError> {
        if self.ica_address.is_some() {
            return Ok(None);
        }
        let pump = PumpContract::new(&*self.hub, &self.cfg.pump_address);
        match pump.ica().await? {
            IcaState::Registered { ica_address } => {
                info!(module = %self.name, ica = %ica_address, "resolved pump ICA");
                self.ica_address = Some(ica_address);
                Ok(None)
            }
            IcaState::None => {
                let outcome = pump.register_ica().await?;
                info!(module = %self.name, tx_hash = %outcome.tx_hash, "ICA registration requested");
                Ok(Some(RunOutcome::Executed {
                    tx_hash: outcome.tx_hash,
                }))
            }
            IcaState::Timeout => {
                warn!(module = %self.name, "ICA registration timed out, retrying");
                let outcome = pump.register_ica().await?;
                Ok(Some(RunOutcome::Executed {
                    tx_hash: outcome.tx_hash,
                }))
            }
            IcaState::InProgress => Ok(Some(RunOutcome::Idle("ICA registration in progress"))),
        }
    }
}

#[async_trait]
impl ManagerModule for PumpModule {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&mut self) -> Result<RunOutcome, CoordinatorError> {
        if let Some(outcome) = self.resolve_ica().await? {
            return Ok(outcome);
        }
        let ica = match self.ica_address.clone() {
            Some(ica) => ica,
            None => return Ok(RunOutcome::Idle("ICA not resolved")),
        };

        let balance = self
            .target
            .bank_balance(&ica, &self.cfg.target_denom)
            .await?;
        if balance <= self.cfg.min_balance {
            debug!(module = %self.name, balance, min = self.cfg.min_balance, "nothing to sweep");
            return Ok(RunOutcome::Idle("balance below threshold"));
        }

        let outcome = PumpContract::new(&*self.hub, &self.cfg.pump_address)
            .push(vec![CoinJson::new(&self.cfg.target_denom, balance)])
            .await?;
        info!(module = %self.name, balance, tx_hash = %outcome.tx_hash, "sweep broadcast");
        Ok(RunOutcome::Executed {
            tx_hash: outcome.tx_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::MockChain;
    use serde_json::json;

    fn module(hub: &Arc<MockChain>, target: &Arc<MockChain>, min: u128) -> PumpModule {
        PumpModule::new(
            "rewards-pump",
            hub.clone(),
            target.clone(),
            PumpModuleConfig {
                pump_address: "neutron1pump".to_string(),
                target_denom: "uatom".to_string(),
                min_balance: min,
            },
        )
    }

    #[tokio::test]
    async fn registers_ica_when_missing() {
        let hub = Arc::new(MockChain::new());
        let target = Arc::new(MockChain::new());
        hub.stub_query("neutron1pump", "ica", json!("none"));

        let outcome = module(&hub, &target, 100).run().await.unwrap();
        assert!(matches!(outcome, RunOutcome::Executed { .. }));
        assert_eq!(hub.executed()[0].msg, json!({"register_i_c_a": {}}));
    }

    #[tokio::test]
    async fn waits_while_registration_in_progress() {
        let hub = Arc::new(MockChain::new());
        let target = Arc::new(MockChain::new());
        hub.stub_query("neutron1pump", "ica", json!("in_progress"));

        let outcome = module(&hub, &target, 100).run().await.unwrap();
        assert_eq!(outcome, RunOutcome::Idle("ICA registration in progress"));
        assert!(hub.executed().is_empty());
    }

    #[tokio::test]
    async fn sweeps_above_threshold_and_caches_ica() {
        let hub = Arc::new(MockChain::new());
        let target = Arc::new(MockChain::new());
        hub.stub_query(
            "neutron1pump",
            "ica",
            json!({"registered": {"ica_address": "cosmos1ica"}}),
        );
        target.set_balance("cosmos1ica", "uatom", 5_000);

        let mut m = module(&hub, &target, 1_000);
        let outcome = m.run().await.unwrap();
        assert!(matches!(outcome, RunOutcome::Executed { .. }));
        assert_eq!(
            hub.executed()[0].msg,
            json!({"push": {"coins": [{"denom": "uatom", "amount": "5000"}]}})
        );

        // Second run uses the cached ICA and idles below threshold
        target.set_balance("cosmos1ica", "uatom", 10);
        let outcome = m.run().await.unwrap();
        assert_eq!(outcome, RunOutcome::Idle("balance below threshold"));
        assert_eq!(hub.executed().len(), 1);
    }

    #[tokio::test]
    async fn threshold_is_strict() {
        let hub = Arc::new(MockChain::new());
        let target = Arc::new(MockChain::new());
        hub.stub_query(
            "neutron1pump",
            "ica",
            json!({"registered": {"ica_address": "cosmos1ica"}}),
        );
        target.set_balance("cosmos1ica", "uatom", 1_000);

        let outcome = module(&hub, &target, 1_000).run().await.unwrap();
        assert_eq!(outcome, RunOutcome::Idle("balance below threshold"));
    }

    #[test]
    fn config_validation() {
        let bad = PumpModuleConfig {
            pump_address: String::new(),
            target_denom: "uatom".to_string(),
            min_balance: 0,
        };
        assert!(verify_pump_config(&bad).is_err());
    }
}
