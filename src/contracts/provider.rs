//! Native bond provider handle.
//!
//! The provider accumulates bonded liquidity; the coordinator asks whether
//! it has work to do while the core is idle and nudges it if so.

use serde_json::json;

use crate::chain::{ChainOps, TxOutcome};
use crate::errors::CoordinatorError;

pub struct BondProviderContract<'a> {
    chain: &'a dyn ChainOps,
    address: &'a str,
}

impl<'a> BondProviderContract<'a> {
    pub fn new(chain: &'a dyn ChainOps, address: &'a str) -> Self {
        Self { chain, address }
    }

    pub async fn can_process_on_idle(&self) -> Result<bool, CoordinatorError> {
        let raw = self
            .chain
            .query_smart(self.address, json!({"can_process_on_idle": {}}))
            .await?;
        serde_json::from_value(raw).map_err(|e| CoordinatorError::decode(self.address, e))
    }

    pub async fn process_on_idle(&self) -> Result<TxOutcome, CoordinatorError> {
        self.chain
            .execute(self.address, json!({"process_on_idle": {}}), vec![])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::MockChain;

    #[tokio::test]
    async fn query_and_execute_shapes() {
        let chain = MockChain::new();
        chain.stub_query("neutron1provider", "can_process_on_idle", json!(true));

        let provider = BondProviderContract::new(&chain, "neutron1provider");
        assert!(provider.can_process_on_idle().await.unwrap());

        provider.process_on_idle().await.unwrap();
        assert_eq!(chain.executed()[0].msg, json!({"process_on_idle": {}}));
    }
}
