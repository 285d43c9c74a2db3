//! Validators-set and validators-stats contract handles.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::chain::{ChainOps, TxOutcome};
use crate::errors::CoordinatorError;

/// One entry of the validators-set contract's `validators` query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorSetEntry {
    pub valoper_address: String,
    #[serde(default)]
    pub weight: u64,
}

/// Per-validator staking state relayed to the stats contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorInfoUpdate {
    pub valoper_address: String,
    pub jailed: bool,
    pub tokens: String,
    pub commission: String,
}

pub struct ValidatorsSetContract<'a> {
    chain: &'a dyn ChainOps,
    address: &'a str,
}

impl<'a> ValidatorsSetContract<'a> {
    pub fn new(chain: &'a dyn ChainOps, address: &'a str) -> Self {
        Self { chain, address }
    }

    pub async fn validators(&self) -> Result<Vec<ValidatorSetEntry>, CoordinatorError> {
        let raw = self
            .chain
            .query_smart(self.address, json!({"validators": {}}))
            .await?;
        serde_json::from_value(raw).map_err(|e| CoordinatorError::decode(self.address, e))
    }
}

pub struct ValidatorsStatsContract<'a> {
    chain: &'a dyn ChainOps,
    address: &'a str,
}

impl<'a> ValidatorsStatsContract<'a> {
    pub fn new(chain: &'a dyn ChainOps, address: &'a str) -> Self {
        Self { chain, address }
    }

    pub async fn update_validators_info(
        &self,
        validators: Vec<ValidatorInfoUpdate>,
    ) -> Result<TxOutcome, CoordinatorError> {
        self.chain
            .execute(
                self.address,
                json!({"update_validators_info": {"validators": validators}}),
                vec![],
            )
            .await
    }
}
