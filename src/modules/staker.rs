//! Staker module: pushes the staker contract's hub-side bond-denom balance
//! over IBC to its target-chain ICA.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::chain::ChainOps;
use crate::contracts::staker::StakerContract;
use crate::contracts::IcaState;
use crate::errors::CoordinatorError;
use crate::modules::{ManagerModule, RunOutcome};

#[derive(Debug, Clone)]
pub struct StakerModuleConfig {
    pub staker_address: String,
    /// IBC denom of the bonded asset on the hub chain.
    pub bond_denom: String,
    pub min_balance: u128,
}

pub fn verify_staker_config(cfg: &StakerModuleConfig) -> Result<(), CoordinatorError> {
    if cfg.staker_address.is_empty() {
        return Err(CoordinatorError::config(
            "staker module: staker_address empty",
        ));
    }
    if cfg.bond_denom.is_empty() {
        return Err(CoordinatorError::config("staker module: bond_denom empty"));
    }
    Ok(())
}

pub struct StakerModule {
    hub: Arc<dyn ChainOps>,
    cfg: StakerModuleConfig,
    ica_resolved: bool,
}

impl StakerModule {
    pub fn new(hub: Arc<dyn ChainOps>, cfg: StakerModuleConfig) -> Self {
        Self {
            hub,
            cfg,
            ica_resolved: false,
        }
    }
}

#[async_trait]
impl ManagerModule for StakerModule {
    fn name(&self) -> &str {
        "staker"
    }

    async fn run(&mut self) -> Result<RunOutcome, CoordinatorError> {
        let staker = StakerContract::new(&*self.hub, &self.cfg.staker_address);

        if !self.ica_resolved {
            match staker.ica().await? {
                IcaState::Registered { ica_address } => {
                    info!(ica = %ica_address, "resolved staker ICA");
                    self.ica_resolved = true;
                }
                IcaState::None => {
                    let outcome = staker.register_ica().await?;
                    info!(tx_hash = %outcome.tx_hash, "staker ICA registration requested");
                    return Ok(RunOutcome::Executed {
                        tx_hash: outcome.tx_hash,
                    });
                }
                IcaState::Timeout => {
                    warn!("staker ICA registration timed out, retrying");
                    let outcome = staker.register_ica().await?;
                    return Ok(RunOutcome::Executed {
                        tx_hash: outcome.tx_hash,
                    });
                }
                IcaState::InProgress => {
                    return Ok(RunOutcome::Idle("ICA registration in progress"))
                }
            }
        }

        let balance = self
            .hub
            .bank_balance(&self.cfg.staker_address, &self.cfg.bond_denom)
            .await?;
        if balance <= self.cfg.min_balance {
            debug!(balance, min = self.cfg.min_balance, "nothing to transfer");
            return Ok(RunOutcome::Idle("balance below threshold"));
        }

        let outcome = staker.ibc_transfer().await?;
        info!(balance, tx_hash = %outcome.tx_hash, "IBC transfer broadcast");
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

    fn module(hub: &Arc<MockChain>) -> StakerModule {
        StakerModule::new(
            hub.clone(),
            StakerModuleConfig {
                staker_address: "neutron1staker".to_string(),
                bond_denom: "ibc/uatom".to_string(),
                min_balance: 1_000,
            },
        )
    }

    #[tokio::test]
    async fn transfers_once_ica_registered_and_balance_high() {
        let hub = Arc::new(MockChain::new());
        hub.stub_query(
            "neutron1staker",
            "ica",
            json!({"registered": {"ica_address": "cosmos1stakerica"}}),
        );
        hub.set_balance("neutron1staker", "ibc/uatom", 50_000);

        let mut m = module(&hub);
        let outcome = m.run().await.unwrap();
        assert!(matches!(outcome, RunOutcome::Executed { .. }));
        assert_eq!(hub.executed()[0].msg, json!({"i_b_c_transfer": {}}));

        // ICA query is not repeated on later runs
        hub.set_balance("neutron1staker", "ibc/uatom", 0);
        let outcome = m.run().await.unwrap();
        assert_eq!(outcome, RunOutcome::Idle("balance below threshold"));
    }

    #[tokio::test]
    async fn reregisters_after_timeout() {
        let hub = Arc::new(MockChain::new());
        hub.stub_query("neutron1staker", "ica", json!("timeout"));

        let outcome = module(&hub).run().await.unwrap();
        assert!(matches!(outcome, RunOutcome::Executed { .. }));
        assert_eq!(hub.executed()[0].msg, json!({"register_i_c_a": {}}));
    }

    #[test]
    fn config_validation() {
        let bad = StakerModuleConfig {
            staker_address: "a".to_string(),
            bond_denom: String::new(),
            min_balance: 0,
        };
        assert!(verify_staker_config(&bad).is_err());
    }
}
