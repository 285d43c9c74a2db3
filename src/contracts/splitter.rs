//! Splitter contract handle.

use serde_json::json;

use crate::chain::{ChainOps, TxOutcome};
use crate::errors::CoordinatorError;

pub struct SplitterContract<'a> {
    chain: &'a dyn ChainOps,
    address: &'a str,
}

impl<'a> SplitterContract<'a> {
    pub fn new(chain: &'a dyn ChainOps, address: &'a str) -> Self {
        Self { chain, address }
    }

    /// Distribute the splitter's accumulated balance to its receivers.
    pub async fn distribute(&self) -> Result<TxOutcome, CoordinatorError> {
        self.chain
            .execute(self.address, json!({"distribute": {}}), vec![])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::MockChain;

    #[tokio::test]
    async fn distribute_shape() {
        let chain = MockChain::new();
        SplitterContract::new(&chain, "neutron1splitter")
            .distribute()
            .await
            .unwrap();
        assert_eq!(chain.executed()[0].msg, json!({"distribute": {}}));
    }
}
