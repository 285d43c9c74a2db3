//! Validators-stats module: relays target-chain validator state to the
//! validators-set contract on the hub.
//!
//! Runs at its own cadence (`info_period`), not every tick: validator
//! state changes slowly and each relay costs one transaction.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::chain::ChainOps;
use crate::contracts::validators::{
    ValidatorInfoUpdate, ValidatorsSetContract, ValidatorsStatsContract,
};
use crate::errors::CoordinatorError;
use crate::modules::{ManagerModule, RunOutcome};

#[derive(Debug, Clone)]
pub struct ValidatorsStatsConfig {
    pub validators_set_address: String,
    pub info_period: Duration,
}

pub fn verify_validators_stats_config(
    cfg: &ValidatorsStatsConfig,
) -> Result<(), CoordinatorError> {
    if cfg.validators_set_address.is_empty() {
        return Err(CoordinatorError::config(
            "validators-stats module: validators_set_address empty",
        ));
    }
    if cfg.info_period.is_zero() {
        return Err(CoordinatorError::config(
            "validators-stats module: info_period must be non-zero",
        ));
    }
    Ok(())
}

pub struct ValidatorsStatsModule {
    hub: Arc<dyn ChainOps>,
    target: Arc<dyn ChainOps>,
    cfg: ValidatorsStatsConfig,
    last_push: Option<Instant>,
}

impl ValidatorsStatsModule {
    pub fn new(
        hub: Arc<dyn ChainOps>,
        target: Arc<dyn ChainOps>,
        cfg: ValidatorsStatsConfig,
    ) -> Self {
        Self {
            hub,
            target,
            cfg,
            last_push: None,
        }
    }
}

#[async_trait]
impl ManagerModule for ValidatorsStatsModule {
    fn name(&self) -> &str {
        "validators-stats"
    }

    async fn run(&mut self) -> Result<RunOutcome, CoordinatorError> {
        if let Some(last) = self.last_push {
            if last.elapsed() < self.cfg.info_period {
                return Ok(RunOutcome::Idle("stats fresh"));
            }
        }

        let entries = ValidatorsSetContract::new(&*self.hub, &self.cfg.validators_set_address)
            .validators()
            .await?;
        if entries.is_empty() {
            return Ok(RunOutcome::Idle("empty validator set"));
        }

        let mut updates = Vec::with_capacity(entries.len());
        for entry in &entries {
            // One unreachable validator must not block the rest of the relay
            match self.target.validator_state(&entry.valoper_address).await {
                Ok(state) => updates.push(ValidatorInfoUpdate {
                    valoper_address: state.valoper_address,
                    jailed: state.jailed,
                    tokens: state.tokens,
                    commission: state.commission_rate,
                }),
                Err(e) => {
                    warn!(valoper = %entry.valoper_address, error = %e, "validator query failed, skipping");
                }
            }
        }

        if updates.is_empty() {
            return Err(CoordinatorError::network(
                "no validator info available from target chain",
            ));
        }

        debug!(total = entries.len(), relayed = updates.len(), "relaying validator info");
        let outcome =
            ValidatorsStatsContract::new(&*self.hub, &self.cfg.validators_set_address)
                .update_validators_info(updates)
                .await?;
        self.last_push = Some(Instant::now());
        info!(tx_hash = %outcome.tx_hash, "validator info relay broadcast");
        Ok(RunOutcome::Executed {
            tx_hash: outcome.tx_hash,
        })
    }
}
