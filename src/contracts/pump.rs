//! Pump contract handle: ICA registration and balance sweeps.

use serde_json::json;

use crate::chain::{ChainOps, TxOutcome};
use crate::contracts::{CoinJson, IcaState};
use crate::errors::CoordinatorError;

pub struct PumpContract<'a> {
    chain: &'a dyn ChainOps,
    address: &'a str,
}

impl<'a> PumpContract<'a> {
    pub fn new(chain: &'a dyn ChainOps, address: &'a str) -> Self {
        Self { chain, address }
    }

    pub async fn ica(&self) -> Result<IcaState, CoordinatorError> {
        let raw = self
            .chain
            .query_smart(self.address, json!({"ica": {}}))
            .await?;
        serde_json::from_value(raw).map_err(|e| CoordinatorError::decode(self.address, e))
    }

    /// Start ICA registration on the target chain. The contract serializes
    /// this variant as `register_i_c_a`.
    pub async fn register_ica(&self) -> Result<TxOutcome, CoordinatorError> {
        self.chain
            .execute(self.address, json!({"register_i_c_a": {}}), vec![])
            .await
    }

    /// Sweep the given coins from the ICA back over IBC.
    pub async fn push(&self, coins: Vec<CoinJson>) -> Result<TxOutcome, CoordinatorError> {
        self.chain
            .execute(self.address, json!({"push": {"coins": coins}}), vec![])
            .await
    }
}
