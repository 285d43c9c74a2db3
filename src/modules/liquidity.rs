//! Move-liquidity module: nudges the native bond provider when it reports
//! processable idle liquidity.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::chain::ChainOps;
use crate::contracts::provider::BondProviderContract;
use crate::errors::CoordinatorError;
use crate::modules::{ManagerModule, RunOutcome};

#[derive(Debug, Clone)]
pub struct MoveLiquidityProviderConfig {
    pub provider_address: String,
}

pub fn verify_liquidity_config(
    cfg: &MoveLiquidityProviderConfig,
) -> Result<(), CoordinatorError> {
    if cfg.provider_address.is_empty() {
        return Err(CoordinatorError::config(
            "move-liquidity module: provider_address empty",
        ));
    }
    Ok(())
}

pub struct MoveLiquidityProviderModule {
    hub: Arc<dyn ChainOps>,
    cfg: MoveLiquidityProviderConfig,
}

impl MoveLiquidityProviderModule {
    pub fn new(hub: Arc<dyn ChainOps>, cfg: MoveLiquidityProviderConfig) -> Self {
        Self { hub, cfg }
    }
}

#[async_trait]
impl ManagerModule for MoveLiquidityProviderModule {
    fn name(&self) -> &str {
        "move-liquidity-provider"
    }

    async fn run(&mut self) -> Result<RunOutcome, CoordinatorError> {
        let provider = BondProviderContract::new(&*self.hub, &self.cfg.provider_address);

        if !provider.can_process_on_idle().await? {
            return Ok(RunOutcome::Idle("provider has nothing to process"));
        }

        let outcome = provider.process_on_idle().await?;
        info!(tx_hash = %outcome.tx_hash, "process_on_idle broadcast");
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

    fn module(hub: &Arc<MockChain>) -> MoveLiquidityProviderModule {
        MoveLiquidityProviderModule::new(
            hub.clone(),
            MoveLiquidityProviderConfig {
                provider_address: "neutron1provider".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn processes_when_provider_ready() {
        let hub = Arc::new(MockChain::new());
        hub.stub_query("neutron1provider", "can_process_on_idle", json!(true));

        let outcome = module(&hub).run().await.unwrap();
        assert!(matches!(outcome, RunOutcome::Executed { .. }));
        assert_eq!(hub.executed()[0].msg, json!({"process_on_idle": {}}));
    }

    #[tokio::test]
    async fn idles_when_provider_has_no_work() {
        let hub = Arc::new(MockChain::new());
        hub.stub_query("neutron1provider", "can_process_on_idle", json!(false));

        let outcome = module(&hub).run().await.unwrap();
        assert_eq!(outcome, RunOutcome::Idle("provider has nothing to process"));
        assert!(hub.executed().is_empty());
    }
}
