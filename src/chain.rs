//! Chain access layer.
//!
//! All wire traffic goes through `cosmrs`/`tendermint-rpc`; the coordinator
//! never assembles raw bytes beyond the protobuf request messages handed to
//! `abci_query`. The [`ChainOps`] trait is the seam for injecting mock
//! implementations in tests.

use std::time::Duration;

use async_trait::async_trait;
use cosmrs::cosmwasm::MsgExecuteContract;
use cosmrs::proto::cosmos::auth::v1beta1::{BaseAccount, QueryAccountRequest, QueryAccountResponse};
use cosmrs::proto::cosmos::bank::v1beta1::{QueryBalanceRequest, QueryBalanceResponse};
use cosmrs::proto::cosmos::staking::v1beta1::{QueryValidatorRequest, QueryValidatorResponse};
use cosmrs::proto::cosmwasm::wasm::v1::{
    QuerySmartContractStateRequest, QuerySmartContractStateResponse,
};
use cosmrs::rpc::{Client, HttpClient};
use cosmrs::tendermint::chain::Id as ChainId;
use cosmrs::tx::{Body, Fee, Msg, SignDoc, SignerInfo};
use cosmrs::{AccountId, Coin};
use prost::Message;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::errors::CoordinatorError;
use crate::wallet::Wallet;

const SMART_QUERY_PATH: &str = "/cosmwasm.wasm.v1.Query/SmartContractState";
const BALANCE_QUERY_PATH: &str = "/cosmos.bank.v1beta1.Query/Balance";
const ACCOUNT_QUERY_PATH: &str = "/cosmos.auth.v1beta1.Query/Account";
const VALIDATOR_QUERY_PATH: &str = "/cosmos.staking.v1beta1.Query/Validator";

/// `BondStatus::Bonded` in the staking protobuf.
const BOND_STATUS_BONDED: i32 = 3;

/// One coin attached to an execute message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinSpec {
    pub amount: u128,
    pub denom: String,
}

/// Result of a broadcast execute.
#[derive(Debug, Clone)]
pub struct TxOutcome {
    pub tx_hash: String,
}

/// Validator state read from the target chain's staking module.
#[derive(Debug, Clone)]
pub struct ValidatorState {
    pub valoper_address: String,
    pub jailed: bool,
    pub bonded: bool,
    /// Total bonded tokens, decimal string as returned by the chain.
    pub tokens: String,
    /// Current commission rate, fixed-point decimal string.
    pub commission_rate: String,
}

/// Chain operations used by the factory handle and the modules.
///
/// One implementation signs and broadcasts (hub chain); the target-chain
/// client is query-only and reports no sender.
#[async_trait]
pub trait ChainOps: Send + Sync + std::fmt::Debug {
    /// Smart-query a contract; `msg` is the JSON query shape.
    async fn query_smart(&self, contract: &str, msg: Value) -> Result<Value, CoordinatorError>;

    async fn bank_balance(&self, address: &str, denom: &str) -> Result<u128, CoordinatorError>;

    async fn block_height(&self) -> Result<u64, CoordinatorError>;

    async fn validator_state(&self, valoper: &str) -> Result<ValidatorState, CoordinatorError>;

    /// Sign and broadcast one `MsgExecuteContract`.
    async fn execute(
        &self,
        contract: &str,
        msg: Value,
        funds: Vec<CoinSpec>,
    ) -> Result<TxOutcome, CoordinatorError>;

    /// Signing address, if this client carries a signer.
    fn sender(&self) -> Option<String>;
}

struct Signer {
    wallet: Arc<Wallet>,
    chain_id: ChainId,
    fee_denom: String,
    fee_amount: u128,
    gas_limit: u64,
}

/// Production chain client over a single CometBFT RPC endpoint.
pub struct ChainClient {
    rpc: HttpClient,
    endpoint: String,
    signer: Option<Signer>,
    timeout: Duration,
    dry_run: bool,
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient")
            .field("endpoint", &self.endpoint)
            .field("signing", &self.signer.is_some())
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl ChainClient {
    /// Query-only client.
    pub fn connect(endpoint: &str, rpc_timeout: Duration) -> Result<Self, CoordinatorError> {
        let rpc = HttpClient::new(endpoint).map_err(|e| {
            CoordinatorError::network_with_source(
                format!("cannot build RPC client for {endpoint}"),
                anyhow::Error::new(e),
            )
        })?;
        info!(endpoint, "connected chain client");
        Ok(Self {
            rpc,
            endpoint: endpoint.to_string(),
            signer: None,
            timeout: rpc_timeout,
            dry_run: false,
        })
    }

    /// Attach a signer so this client can broadcast transactions.
    pub fn with_signer(
        mut self,
        wallet: Arc<Wallet>,
        chain_id: &str,
        fee_denom: &str,
        fee_amount: u128,
        gas_limit: u64,
    ) -> Result<Self, CoordinatorError> {
        let chain_id: ChainId = chain_id
            .parse()
            .map_err(|_| CoordinatorError::config(format!("invalid chain id '{chain_id}'")))?;
        self.signer = Some(Signer {
            wallet,
            chain_id,
            fee_denom: fee_denom.to_string(),
            fee_amount,
            gas_limit,
        });
        Ok(self)
    }

    /// In dry-run mode transactions are logged instead of broadcast.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    async fn abci_query(&self, path: &str, data: Vec<u8>) -> Result<Vec<u8>, CoordinatorError> {
        let fut = self
            .rpc
            .abci_query(Some(path.to_string()), data, None, false);
        let res = timeout(self.timeout, fut)
            .await
            .map_err(|_| {
                CoordinatorError::network(format!(
                    "{path} on {} timed out after {:?}",
                    self.endpoint, self.timeout
                ))
            })?
            .map_err(|e| {
                CoordinatorError::network_with_source(
                    format!("{path} on {} failed", self.endpoint),
                    anyhow::Error::new(e),
                )
            })?;

        if res.code.is_err() {
            return Err(CoordinatorError::network(format!(
                "{path} returned code {}: {}",
                res.code.value(),
                res.log
            )));
        }
        Ok(res.value)
    }

    async fn account_info(&self, address: &str) -> Result<(u64, u64), CoordinatorError> {
        let req = QueryAccountRequest {
            address: address.to_string(),
        };
        let raw = self
            .abci_query(ACCOUNT_QUERY_PATH, req.encode_to_vec())
            .await?;
        let resp = QueryAccountResponse::decode(raw.as_slice()).map_err(|e| {
            CoordinatorError::network(format!("undecodable account response: {e}"))
        })?;
        let any = resp
            .account
            .ok_or_else(|| CoordinatorError::network(format!("account {address} not found")))?;
        let base = BaseAccount::decode(any.value.as_slice()).map_err(|e| {
            CoordinatorError::network(format!("undecodable base account: {e}"))
        })?;
        Ok((base.account_number, base.sequence))
    }
}

#[async_trait]
impl ChainOps for ChainClient {
    async fn query_smart(&self, contract: &str, msg: Value) -> Result<Value, CoordinatorError> {
        let query_data = serde_json::to_vec(&msg)
            .map_err(|e| CoordinatorError::system(format!("unencodable query: {e}")))?;
        let req = QuerySmartContractStateRequest {
            address: contract.to_string(),
            query_data,
        };
        let raw = self
            .abci_query(SMART_QUERY_PATH, req.encode_to_vec())
            .await?;
        let resp = QuerySmartContractStateResponse::decode(raw.as_slice()).map_err(|e| {
            CoordinatorError::contract(contract, format!("undecodable wasm response: {e}"))
        })?;
        serde_json::from_slice(&resp.data).map_err(|e| CoordinatorError::decode(contract, e))
    }

    async fn bank_balance(&self, address: &str, denom: &str) -> Result<u128, CoordinatorError> {
        let req = QueryBalanceRequest {
            address: address.to_string(),
            denom: denom.to_string(),
        };
        let raw = self
            .abci_query(BALANCE_QUERY_PATH, req.encode_to_vec())
            .await?;
        let resp = QueryBalanceResponse::decode(raw.as_slice()).map_err(|e| {
            CoordinatorError::network(format!("undecodable balance response: {e}"))
        })?;
        match resp.balance {
            Some(coin) => coin.amount.parse::<u128>().map_err(|e| {
                CoordinatorError::network(format!("unparsable balance '{}': {e}", coin.amount))
            }),
            None => Ok(0),
        }
    }

    async fn block_height(&self) -> Result<u64, CoordinatorError> {
        let res = timeout(self.timeout, self.rpc.status())
            .await
            .map_err(|_| {
                CoordinatorError::network(format!("status on {} timed out", self.endpoint))
            })?
            .map_err(|e| {
                CoordinatorError::network_with_source(
                    format!("status on {} failed", self.endpoint),
                    anyhow::Error::new(e),
                )
            })?;
        Ok(res.sync_info.latest_block_height.value())
    }

    async fn validator_state(&self, valoper: &str) -> Result<ValidatorState, CoordinatorError> {
        let req = QueryValidatorRequest {
            validator_addr: valoper.to_string(),
        };
        let raw = self
            .abci_query(VALIDATOR_QUERY_PATH, req.encode_to_vec())
            .await?;
        let resp = QueryValidatorResponse::decode(raw.as_slice()).map_err(|e| {
            CoordinatorError::network(format!("undecodable validator response: {e}"))
        })?;
        let validator = resp
            .validator
            .ok_or_else(|| CoordinatorError::network(format!("validator {valoper} not found")))?;

        let commission_rate = validator
            .commission
            .and_then(|c| c.commission_rates)
            .map(|r| r.rate)
            .unwrap_or_default();

        Ok(ValidatorState {
            valoper_address: validator.operator_address,
            jailed: validator.jailed,
            bonded: validator.status == BOND_STATUS_BONDED,
            tokens: validator.tokens,
            commission_rate,
        })
    }

    async fn execute(
        &self,
        contract: &str,
        msg: Value,
        funds: Vec<CoinSpec>,
    ) -> Result<TxOutcome, CoordinatorError> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            CoordinatorError::transaction(format!(
                "no signer configured on {}; cannot execute",
                self.endpoint
            ))
        })?;

        let sender = signer.wallet.address().clone();
        let contract_id: AccountId = contract.parse().map_err(|_| {
            CoordinatorError::contract(contract, "invalid bech32 contract address")
        })?;

        let msg_bytes = serde_json::to_vec(&msg)
            .map_err(|e| CoordinatorError::system(format!("unencodable execute msg: {e}")))?;

        let mut attached = Vec::with_capacity(funds.len());
        for f in &funds {
            let denom = f.denom.parse().map_err(|_| {
                CoordinatorError::transaction(format!("invalid denom '{}'", f.denom))
            })?;
            attached.push(Coin {
                denom,
                amount: f.amount,
            });
        }

        if self.dry_run {
            warn!(contract, msg = %msg, "dry-run: skipping broadcast");
            return Ok(TxOutcome {
                tx_hash: "DRY-RUN".to_string(),
            });
        }

        let (account_number, sequence) = self.account_info(sender.as_ref()).await?;

        let execute_msg = MsgExecuteContract {
            sender,
            contract: contract_id,
            msg: msg_bytes,
            funds: attached,
        };
        let any = execute_msg
            .to_any()
            .map_err(|e| CoordinatorError::transaction_with_source("msg encoding failed", anyhow::anyhow!(e)))?;

        let fee_denom = signer.fee_denom.parse().map_err(|_| {
            CoordinatorError::config(format!("invalid fee denom '{}'", signer.fee_denom))
        })?;
        let fee = Fee::from_amount_and_gas(
            Coin {
                denom: fee_denom,
                amount: signer.fee_amount,
            },
            signer.gas_limit,
        );

        let body = Body::new(vec![any], "", 0u32);
        let auth_info =
            SignerInfo::single_direct(Some(signer.wallet.public_key()), sequence).auth_info(fee);
        let sign_doc = SignDoc::new(&body, &auth_info, &signer.chain_id, account_number)
            .map_err(|e| CoordinatorError::transaction_with_source("sign doc failed", anyhow::anyhow!(e)))?;
        let raw = sign_doc
            .sign(signer.wallet.signing_key())
            .map_err(|e| CoordinatorError::transaction_with_source("signing failed", anyhow::anyhow!(e)))?;
        let tx_bytes = raw
            .to_bytes()
            .map_err(|e| CoordinatorError::transaction_with_source("tx encoding failed", anyhow::anyhow!(e)))?;

        let resp = timeout(self.timeout, self.rpc.broadcast_tx_sync(tx_bytes))
            .await
            .map_err(|_| CoordinatorError::network("broadcast timed out"))?
            .map_err(|e| {
                CoordinatorError::network_with_source("broadcast failed", anyhow::Error::new(e))
            })?;

        if resp.code.is_err() {
            return Err(CoordinatorError::transaction(format!(
                "tx rejected with code {}: {}",
                resp.code.value(),
                resp.log
            )));
        }

        debug!(contract, tx_hash = %resp.hash, "broadcast accepted");
        Ok(TxOutcome {
            tx_hash: resp.hash.to_string(),
        })
    }

    fn sender(&self) -> Option<String> {
        self.signer
            .as_ref()
            .map(|s| s.wallet.address().to_string())
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    //! Mock chain used by unit and integration tests.

    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    use parking_lot::Mutex;

    use super::*;

    /// One recorded execute call.
    #[derive(Debug, Clone)]
    pub struct ExecuteRecord {
        pub contract: String,
        pub msg: Value,
        pub funds: Vec<CoinSpec>,
    }

    /// In-memory [`ChainOps`] with stubbed query responses and an
    /// execute log. Stubs are keyed by `(contract, top-level msg key)`;
    /// multiple stubs for one key are consumed in order, with the last
    /// one sticky.
    #[derive(Debug, Default)]
    pub struct MockChain {
        sender: Option<String>,
        height: AtomicU64,
        responses: Mutex<HashMap<(String, String), VecDeque<Value>>>,
        balances: Mutex<HashMap<(String, String), u128>>,
        validators: Mutex<HashMap<String, ValidatorState>>,
        executes: Mutex<Vec<ExecuteRecord>>,
        fail_queries: AtomicBool,
        tx_counter: AtomicU64,
    }

    impl MockChain {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_sender(mut self, sender: &str) -> Self {
            self.sender = Some(sender.to_string());
            self
        }

        pub fn stub_query(&self, contract: &str, key: &str, response: Value) {
            self.responses
                .lock()
                .entry((contract.to_string(), key.to_string()))
                .or_default()
                .push_back(response);
        }

        pub fn set_balance(&self, address: &str, denom: &str, amount: u128) {
            self.balances
                .lock()
                .insert((address.to_string(), denom.to_string()), amount);
        }

        pub fn set_validator(&self, state: ValidatorState) {
            self.validators
                .lock()
                .insert(state.valoper_address.clone(), state);
        }

        pub fn set_height(&self, height: u64) {
            self.height.store(height, Ordering::Relaxed);
        }

        /// Make every query fail with a network error.
        pub fn set_fail_queries(&self, fail: bool) {
            self.fail_queries.store(fail, Ordering::Relaxed);
        }

        pub fn executed(&self) -> Vec<ExecuteRecord> {
            self.executes.lock().clone()
        }
    }

    #[async_trait]
    impl ChainOps for MockChain {
        async fn query_smart(
            &self,
            contract: &str,
            msg: Value,
        ) -> Result<Value, CoordinatorError> {
            if self.fail_queries.load(Ordering::Relaxed) {
                return Err(CoordinatorError::network("mock: query failure injected"));
            }
            let key = msg
                .as_object()
                .and_then(|o| o.keys().next().cloned())
                .unwrap_or_default();
            let mut responses = self.responses.lock();
            let queue = responses
                .get_mut(&(contract.to_string(), key.clone()))
                .ok_or_else(|| {
                    CoordinatorError::contract(
                        contract,
                        format!("mock: no stubbed response for '{key}'"),
                    )
                })?;
            if queue.len() > 1 {
                Ok(queue.pop_front().expect("non-empty queue"))
            } else {
                queue
                    .front()
                    .cloned()
                    .ok_or_else(|| CoordinatorError::contract(contract, "mock: stub exhausted"))
            }
        }

        async fn bank_balance(&self, address: &str, denom: &str) -> Result<u128, CoordinatorError> {
            if self.fail_queries.load(Ordering::Relaxed) {
                return Err(CoordinatorError::network("mock: query failure injected"));
            }
            Ok(self
                .balances
                .lock()
                .get(&(address.to_string(), denom.to_string()))
                .copied()
                .unwrap_or(0))
        }

        async fn block_height(&self) -> Result<u64, CoordinatorError> {
            if self.fail_queries.load(Ordering::Relaxed) {
                return Err(CoordinatorError::network("mock: query failure injected"));
            }
            Ok(self.height.load(Ordering::Relaxed))
        }

        async fn validator_state(&self, valoper: &str) -> Result<ValidatorState, CoordinatorError> {
            self.validators
                .lock()
                .get(valoper)
                .cloned()
                .ok_or_else(|| CoordinatorError::network(format!("mock: unknown validator {valoper}")))
        }

        async fn execute(
            &self,
            contract: &str,
            msg: Value,
            funds: Vec<CoinSpec>,
        ) -> Result<TxOutcome, CoordinatorError> {
            self.executes.lock().push(ExecuteRecord {
                contract: contract.to_string(),
                msg,
                funds,
            });
            let n = self.tx_counter.fetch_add(1, Ordering::Relaxed);
            Ok(TxOutcome {
                tx_hash: format!("MOCKTX{n}"),
            })
        }

        fn sender(&self) -> Option<String> {
            self.sender.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockChain;
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn mock_stub_order_and_stickiness() {
        let chain = MockChain::new();
        chain.stub_query("neutron1core", "contract_state", json!("claiming"));
        chain.stub_query("neutron1core", "contract_state", json!("idle"));

        let first = chain
            .query_smart("neutron1core", json!({"contract_state": {}}))
            .await
            .unwrap();
        assert_eq!(first, json!("claiming"));

        // Last stub stays sticky
        for _ in 0..2 {
            let v = chain
                .query_smart("neutron1core", json!({"contract_state": {}}))
                .await
                .unwrap();
            assert_eq!(v, json!("idle"));
        }
    }

    #[tokio::test]
    async fn mock_records_executes() {
        let chain = MockChain::new().with_sender("neutron1coordinator");
        let outcome = chain
            .execute("neutron1core", json!({"tick": {}}), vec![])
            .await
            .unwrap();
        assert!(outcome.tx_hash.starts_with("MOCKTX"));

        let records = chain.executed();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].contract, "neutron1core");
        assert_eq!(records[0].msg, json!({"tick": {}}));
        assert_eq!(chain.sender().as_deref(), Some("neutron1coordinator"));
    }

    #[tokio::test]
    async fn mock_injected_failure_hits_all_queries() {
        let chain = MockChain::new();
        chain.set_fail_queries(true);
        assert!(chain
            .query_smart("addr", json!({"state": {}}))
            .await
            .is_err());
        assert!(chain.bank_balance("addr", "untrn").await.is_err());
        assert!(chain.block_height().await.is_err());
    }
}
