//! Core module: drives the core contract's state machine with `tick`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::chain::ChainOps;
use crate::contracts::core::{ContractState, CoreContract};
use crate::contracts::puppeteer::{PuppeteerContract, TxStateStatus};
use crate::errors::CoordinatorError;
use crate::modules::{ManagerModule, RunOutcome};

#[derive(Debug, Clone)]
pub struct CoreModuleConfig {
    pub core_address: String,
    pub puppeteer_address: String,
}

pub fn verify_core_config(cfg: &CoreModuleConfig) -> Result<(), CoordinatorError> {
    if cfg.core_address.is_empty() {
        return Err(CoordinatorError::config("core module: core_address empty"));
    }
    if cfg.puppeteer_address.is_empty() {
        return Err(CoordinatorError::config(
            "core module: puppeteer_address empty",
        ));
    }
    Ok(())
}

pub struct CoreModule {
    hub: Arc<dyn ChainOps>,
    cfg: CoreModuleConfig,
}

impl CoreModule {
    pub fn new(hub: Arc<dyn ChainOps>, cfg: CoreModuleConfig) -> Self {
        Self { hub, cfg }
    }

    /// Log the current unbond batch's status and totals. Read-only and
    /// best-effort: a failed batch read never blocks the tick.
    async fn log_batch_state(&self, core: &CoreContract<'_>) {
        let batch_id = match core.current_unbond_batch().await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "current unbond batch query failed");
                return;
            }
        };
        match core.unbond_batch(batch_id).await {
            Ok(batch) => info!(
                batch_id = %batch_id,
                status = ?batch.status,
                total_amount = %batch.total_amount,
                expected_amount = ?batch.expected_amount,
                "current unbond batch"
            ),
            Err(e) => warn!(batch_id = %batch_id, error = %e, "unbond batch query failed"),
        }
    }
}

#[async_trait]
impl ManagerModule for CoreModule {
    fn name(&self) -> &str {
        "core"
    }

    async fn run(&mut self) -> Result<RunOutcome, CoordinatorError> {
        let core = CoreContract::new(&*self.hub, &self.cfg.core_address);
        let state = core.contract_state().await?;

        // A non-idle core is only tickable once the puppeteer has finished
        // the interchain operation the previous tick started.
        if state != ContractState::Idle {
            let tx_state = PuppeteerContract::new(&*self.hub, &self.cfg.puppeteer_address)
                .tx_state()
                .await?;
            if tx_state.status != TxStateStatus::Idle {
                debug!(?state, status = ?tx_state.status, "puppeteer busy, skipping tick");
                return Ok(RunOutcome::Idle("puppeteer busy"));
            }
        }

        // Logged for operators; the tick itself does not depend on them
        match core.exchange_rate().await {
            Ok(rate) => debug!(%rate, "current exchange rate"),
            Err(e) => warn!(error = %e, "exchange rate query failed"),
        }
        self.log_batch_state(&core).await;

        let outcome = core.tick().await?;
        info!(?state, tx_hash = %outcome.tx_hash, "core tick broadcast");
        Ok(RunOutcome::Executed {
            tx_hash: outcome.tx_hash,
        })
    }
}
