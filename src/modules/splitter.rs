//! Splitter module: distributes the splitter contract's accumulated
//! balance once it exceeds the configured threshold.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::chain::ChainOps;
use crate::contracts::splitter::SplitterContract;
use crate::errors::CoordinatorError;
use crate::modules::{ManagerModule, RunOutcome};

#[derive(Debug, Clone)]
pub struct SplitterModuleConfig {
    pub splitter_address: String,
    pub denom: String,
    pub min_balance: u128,
}

pub fn verify_splitter_config(cfg: &SplitterModuleConfig) -> Result<(), CoordinatorError> {
    if cfg.splitter_address.is_empty() {
        return Err(CoordinatorError::config(
            "splitter module: splitter_address empty",
        ));
    }
    if cfg.denom.is_empty() {
        return Err(CoordinatorError::config("splitter module: denom empty"));
    }
    Ok(())
}

pub struct SplitterModule {
    hub: Arc<dyn ChainOps>,
    cfg: SplitterModuleConfig,
}

impl SplitterModule {
    pub fn new(hub: Arc<dyn ChainOps>, cfg: SplitterModuleConfig) -> Self {
        Self { hub, cfg }
    }
}

#[async_trait]
impl ManagerModule for SplitterModule {
    fn name(&self) -> &str {
        "splitter"
    }

    async fn run(&mut self) -> Result<RunOutcome, CoordinatorError> {
        let balance = self
            .hub
            .bank_balance(&self.cfg.splitter_address, &self.cfg.denom)
            .await?;
        if balance <= self.cfg.min_balance {
            debug!(balance, min = self.cfg.min_balance, "nothing to distribute");
            return Ok(RunOutcome::Idle("balance below threshold"));
        }

        let outcome = SplitterContract::new(&*self.hub, &self.cfg.splitter_address)
            .distribute()
            .await?;
        info!(balance, tx_hash = %outcome.tx_hash, "distribute broadcast");
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

    fn module(hub: &Arc<MockChain>) -> SplitterModule {
        SplitterModule::new(
            hub.clone(),
            SplitterModuleConfig {
                splitter_address: "neutron1splitter".to_string(),
                denom: "ibc/uatom".to_string(),
                min_balance: 1_000,
            },
        )
    }

    #[tokio::test]
    async fn distributes_above_threshold() {
        let hub = Arc::new(MockChain::new());
        hub.set_balance("neutron1splitter", "ibc/uatom", 2_000);

        let outcome = module(&hub).run().await.unwrap();
        assert!(matches!(outcome, RunOutcome::Executed { .. }));
        assert_eq!(hub.executed()[0].msg, json!({"distribute": {}}));
    }

    #[tokio::test]
    async fn idles_at_or_below_threshold() {
        let hub = Arc::new(MockChain::new());
        hub.set_balance("neutron1splitter", "ibc/uatom", 1_000);

        let outcome = module(&hub).run().await.unwrap();
        assert_eq!(outcome, RunOutcome::Idle("balance below threshold"));
        assert!(hub.executed().is_empty());
    }
}
