//! Puppeteer contract handle.
//!
//! The puppeteer owns the ICA that performs staking operations on the
//! target chain; the coordinator only inspects its transaction state to
//! decide whether the core contract is unblocked.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::chain::ChainOps;
use crate::errors::CoordinatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStateStatus {
    Idle,
    InProgress,
    WaitingForAck,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxState {
    pub status: TxStateStatus,
    #[serde(default)]
    pub seq_id: Option<u64>,
}

pub struct PuppeteerContract<'a> {
    chain: &'a dyn ChainOps,
    address: &'a str,
}

impl<'a> PuppeteerContract<'a> {
    pub fn new(chain: &'a dyn ChainOps, address: &'a str) -> Self {
        Self { chain, address }
    }

    pub async fn tx_state(&self) -> Result<TxState, CoordinatorError> {
        let raw = self
            .chain
            .query_smart(self.address, json!({"tx_state": {}}))
            .await?;
        serde_json::from_value(raw).map_err(|e| CoordinatorError::decode(self.address, e))
    }
}
