//! Core contract handle: state machine queries and the `tick` driver.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::chain::{ChainOps, TxOutcome};
use crate::contracts::parse_uint;
use crate::errors::CoordinatorError;

/// The core contract's top-level state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractState {
    Idle,
    Peripheral,
    Claiming,
    Transfering,
    Staking,
    Unbonding,
}

/// Lifecycle of an unbonding batch. Owned by the contract; the coordinator
/// only reads it for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnbondBatchStatus {
    New,
    UnbondRequested,
    UnbondFailed,
    Unbonding,
    Withdrawing,
    Withdrawn,
    WithdrawingEmergency,
    WithdrawnEmergency,
}

/// A grouped set of user unbond requests. Unknown fields are ignored so the
/// coordinator tolerates contract-side schema drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnbondBatch {
    pub status: UnbondBatchStatus,
    pub total_amount: String,
    #[serde(default)]
    pub expected_amount: Option<String>,
}

pub struct CoreContract<'a> {
    chain: &'a dyn ChainOps,
    address: &'a str,
}

impl<'a> CoreContract<'a> {
    pub fn new(chain: &'a dyn ChainOps, address: &'a str) -> Self {
        Self { chain, address }
    }

    pub async fn contract_state(&self) -> Result<ContractState, CoordinatorError> {
        let raw = self
            .chain
            .query_smart(self.address, json!({"contract_state": {}}))
            .await?;
        serde_json::from_value(raw).map_err(|e| CoordinatorError::decode(self.address, e))
    }

    /// Current dAsset/asset exchange rate, decimal string.
    pub async fn exchange_rate(&self) -> Result<String, CoordinatorError> {
        let raw = self
            .chain
            .query_smart(self.address, json!({"exchange_rate": {}}))
            .await?;
        serde_json::from_value(raw).map_err(|e| CoordinatorError::decode(self.address, e))
    }

    /// Id of the batch currently accepting unbond requests, `Uint128` on
    /// the wire.
    pub async fn current_unbond_batch(&self) -> Result<u128, CoordinatorError> {
        let raw = self
            .chain
            .query_smart(self.address, json!({"current_unbond_batch": {}}))
            .await?;
        let id: String =
            serde_json::from_value(raw).map_err(|e| CoordinatorError::decode(self.address, e))?;
        parse_uint(self.address, &id)
    }

    pub async fn unbond_batch(&self, batch_id: u128) -> Result<UnbondBatch, CoordinatorError> {
        let raw = self
            .chain
            .query_smart(
                self.address,
                json!({"unbond_batch": {"batch_id": batch_id.to_string()}}),
            )
            .await?;
        serde_json::from_value(raw).map_err(|e| CoordinatorError::decode(self.address, e))
    }

    /// Advance the contract state machine by one step.
    pub async fn tick(&self) -> Result<TxOutcome, CoordinatorError> {
        self.chain
            .execute(self.address, json!({"tick": {}}), vec![])
            .await
    }
}
