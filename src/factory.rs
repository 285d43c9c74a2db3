//! Factory contract handle.
//!
//! The factory is the on-chain registry mapping protocol roles to deployed
//! contract addresses. Its `{"state": {}}` response is fetched once, cached,
//! and re-fetched only through an explicit `reconnect()` after a detected
//! failure.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::chain::ChainOps;
use crate::errors::CoordinatorError;

/// Role → address mapping returned by the factory's `state` query.
///
/// Field names mirror the contract schema and must not be renamed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactoryState {
    pub token_contract: String,
    pub core_contract: String,
    pub puppeteer_contract: String,
    pub withdrawal_voucher_contract: String,
    pub withdrawal_manager_contract: String,
    pub strategy_contract: String,
    pub validators_set_contract: String,
    pub distribution_contract: String,
    pub rewards_manager_contract: String,
    pub splitter_contract: String,
    pub native_bond_provider_contract: String,
    #[serde(default)]
    pub lsm_share_bond_provider_contract: Option<String>,
    #[serde(default)]
    pub val_ref_contract: Option<String>,
    #[serde(default)]
    pub rewards_pump_contract: Option<String>,
    #[serde(default)]
    pub unbonding_pump_contract: Option<String>,
}

/// Cached handle to the factory contract.
#[derive(Debug)]
pub struct FactoryHandle {
    chain: Arc<dyn ChainOps>,
    address: String,
    state: RwLock<Option<FactoryState>>,
}

impl FactoryHandle {
    /// Query the factory and cache its state.
    pub async fn connect(
        chain: Arc<dyn ChainOps>,
        address: &str,
    ) -> Result<Self, CoordinatorError> {
        let handle = Self {
            chain,
            address: address.to_string(),
            state: RwLock::new(None),
        };
        let state = handle.fetch().await?;
        info!(
            factory = %handle.address,
            core = %state.core_contract,
            puppeteer = %state.puppeteer_contract,
            "factory state cached"
        );
        *handle.state.write() = Some(state);
        Ok(handle)
    }

    async fn fetch(&self) -> Result<FactoryState, CoordinatorError> {
        let raw = self
            .chain
            .query_smart(&self.address, json!({"state": {}}))
            .await?;
        serde_json::from_value(raw).map_err(|e| CoordinatorError::decode(&self.address, e))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// The cached role map. Errors only if the handle was never connected.
    pub fn state(&self) -> Result<FactoryState, CoordinatorError> {
        self.state
            .read()
            .clone()
            .ok_or_else(|| CoordinatorError::system("factory state not cached"))
    }

    /// Liveness probe used by the watchdog: re-queries the factory without
    /// touching the cache.
    pub async fn ping(&self) -> Result<(), CoordinatorError> {
        self.fetch().await.map(|_| ())
    }

    /// Drop the cache and re-fetch. Called after a detected failure.
    pub async fn reconnect(&self) -> Result<(), CoordinatorError> {
        warn!(factory = %self.address, "reconnecting factory handle");
        *self.state.write() = None;
        let state = self.fetch().await?;
        *self.state.write() = Some(state);
        info!(factory = %self.address, "factory state re-cached");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::MockChain;

    fn factory_json() -> serde_json::Value {
        json!({
            "token_contract": "neutron1token",
            "core_contract": "neutron1core",
            "puppeteer_contract": "neutron1puppeteer",
            "withdrawal_voucher_contract": "neutron1voucher",
            "withdrawal_manager_contract": "neutron1wmanager",
            "strategy_contract": "neutron1strategy",
            "validators_set_contract": "neutron1valset",
            "distribution_contract": "neutron1distribution",
            "rewards_manager_contract": "neutron1rmanager",
            "splitter_contract": "neutron1splitter",
            "native_bond_provider_contract": "neutron1provider",
            "rewards_pump_contract": "neutron1rpump"
        })
    }

    #[tokio::test]
    async fn connect_caches_state() {
        let chain = Arc::new(MockChain::new());
        chain.stub_query("neutron1factory", "state", factory_json());

        let handle = FactoryHandle::connect(chain, "neutron1factory")
            .await
            .unwrap();
        let state = handle.state().unwrap();
        assert_eq!(state.core_contract, "neutron1core");
        assert_eq!(
            state.rewards_pump_contract.as_deref(),
            Some("neutron1rpump")
        );
        assert!(state.unbonding_pump_contract.is_none());
    }

    #[tokio::test]
    async fn connect_fails_without_factory() {
        let chain = Arc::new(MockChain::new());
        assert!(FactoryHandle::connect(chain, "neutron1factory")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn reconnect_recovers_after_failure() {
        let chain = Arc::new(MockChain::new());
        chain.stub_query("neutron1factory", "state", factory_json());

        let handle = FactoryHandle::connect(chain.clone(), "neutron1factory")
            .await
            .unwrap();

        chain.set_fail_queries(true);
        assert!(handle.ping().await.is_err());
        assert!(handle.reconnect().await.is_err());

        chain.set_fail_queries(false);
        handle.reconnect().await.unwrap();
        assert_eq!(handle.state().unwrap().core_contract, "neutron1core");
    }
}
