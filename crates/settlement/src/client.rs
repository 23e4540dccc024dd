//! Settlement client for the reward contract
//!
//! Supports two modes:
//! - **Mock Mode**: For development/testing without a node. Chain id, root,
//!   withdrawn amounts and claim outcomes are tracked in-memory, and `claim`
//!   enforces the same rules as the contract.
//! - **Live Mode**: Ethereum JSON-RPC calls against a deployed contract.
//!   Signing is left to the endpoint (wallet bridge or unlocked account).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use rewardcraft_core::{
    encode_address, encode_hash, Address, Amount, ClaimRequest, Hash, OnchainState, Result,
    RewardsError, TxHash,
};
use rewardcraft_merkle::{keccak256, verify_leaf};

use crate::rpc::{EthRpcClient, RpcError};
use crate::{abi, ChainStateReader, ClaimSubmitter};

/// Settlement mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementMode {
    /// Mock mode for development - state is in-memory
    Mock,
    /// Live mode against an Ethereum JSON-RPC endpoint
    Live,
}

/// Settlement client configuration
#[derive(Debug, Clone)]
pub struct SettlementConfig {
    /// Settlement mode (Mock or Live)
    pub mode: SettlementMode,
    /// JSON-RPC endpoint (only used in Live mode)
    pub rpc_url: String,
    /// Reward contract that receives claims
    pub contract_address: Address,
    /// Account that sends claim transactions. Defaults to the claimant.
    pub sender: Option<Address>,
    /// How long to wait for a receipt before giving up
    pub confirmation_timeout: Duration,
    /// Receipt polling interval
    pub poll_interval: Duration,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            mode: SettlementMode::Mock,
            rpc_url: "http://127.0.0.1:8545".to_string(),
            contract_address: [0u8; 20],
            sender: None,
            confirmation_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(2),
        }
    }
}

impl SettlementConfig {
    /// Create a mock configuration for development
    pub fn mock() -> Self {
        Self {
            mode: SettlementMode::Mock,
            ..Default::default()
        }
    }

    /// Create a live configuration for `rpc_url`
    pub fn live(rpc_url: impl Into<String>, contract_address: Address) -> Self {
        Self {
            mode: SettlementMode::Live,
            rpc_url: rpc_url.into(),
            contract_address,
            ..Default::default()
        }
    }
}

/// In-memory state for mock mode
#[derive(Debug)]
struct MockState {
    chain_id: u64,
    published_root: Option<Hash>,
    /// Cumulative amount paid out per account
    withdrawn: HashMap<Address, Amount>,
    /// Transaction counter for generating mock hashes
    tx_counter: u64,
    /// One-shot failure returned by the next claim
    claim_failure: Option<String>,
    /// Simulated confirmation time
    claim_delay: Option<Duration>,
    claims_sent: usize,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            chain_id: 1,
            published_root: None,
            withdrawn: HashMap::new(),
            tx_counter: 0,
            claim_failure: None,
            claim_delay: None,
            claims_sent: 0,
        }
    }
}

/// Settlement client for on-chain operations
///
/// In mock mode all state is tracked in-memory.
pub struct SettlementClient {
    config: SettlementConfig,
    /// JSON-RPC client (only used in Live mode)
    rpc: Option<EthRpcClient>,
    /// Mock state (only used in Mock mode)
    mock_state: Arc<RwLock<MockState>>,
}

impl SettlementClient {
    pub fn new(config: SettlementConfig) -> Self {
        let rpc = match config.mode {
            SettlementMode::Live => Some(EthRpcClient::new(config.rpc_url.clone())),
            SettlementMode::Mock => None,
        };
        info!(
            "Settlement client ({:?}) for contract {}",
            config.mode,
            encode_address(&config.contract_address)
        );
        Self {
            config,
            rpc,
            mock_state: Arc::new(RwLock::new(MockState::default())),
        }
    }

    pub fn is_mock(&self) -> bool {
        self.config.mode == SettlementMode::Mock
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    fn rpc(&self) -> Result<&EthRpcClient> {
        self.rpc.as_ref().ok_or_else(|| {
            RewardsError::InvalidInput("live RPC client not configured".to_string())
        })
    }

    fn generate_mock_hash(state: &mut MockState) -> TxHash {
        state.tx_counter += 1;
        keccak256(&[b"mock-claim", &state.tx_counter.to_be_bytes()])
    }

    /// Chain id of the connected network
    pub async fn chain_id(&self) -> Result<u64> {
        if self.is_mock() {
            let state = self.mock_state.read().unwrap_or_else(|e| e.into_inner());
            return Ok(state.chain_id);
        }
        self.rpc()?.chain_id().await.map_err(|e| e.into_read_error())
    }

    async fn ensure_chain(&self, required_chain_id: u64) -> Result<u64> {
        let actual = self.chain_id().await?;
        if actual != required_chain_id {
            warn!(
                "Connected to chain {}, contract is on chain {}",
                actual, required_chain_id
            );
            return Err(RewardsError::WrongNetwork {
                expected: required_chain_id,
                actual,
            });
        }
        Ok(actual)
    }

    async fn live_claim(&self, request: &ClaimRequest) -> Result<TxHash> {
        let rpc = self.rpc()?;
        let sender = self.config.sender.unwrap_or(request.address);
        let data = abi::claim_call(&request.address, request.cumulative_amount, &request.proof);

        let tx = rpc
            .send_transaction(&sender, &self.config.contract_address, &data)
            .await
            .map_err(|e| e.into_send_error())?;
        info!("Claim transaction sent: {}", encode_hash(&tx));

        let poll = async {
            loop {
                match rpc.transaction_receipt(&tx).await {
                    Ok(Some(receipt)) => return Ok(receipt),
                    Ok(None) => debug!("Transaction {} pending", encode_hash(&tx)),
                    Err(e) => return Err(e.into_send_error()),
                }
                tokio::time::sleep(self.config.poll_interval).await;
            }
        };

        let receipt = tokio::time::timeout(self.config.confirmation_timeout, poll)
            .await
            .map_err(|_| {
                RewardsError::TransactionFailed(format!(
                    "transaction {} not confirmed within {}s",
                    encode_hash(&tx),
                    self.config.confirmation_timeout.as_secs()
                ))
            })??;

        if !receipt.succeeded() {
            let reason = self
                .revert_reason(rpc, &sender, &data, receipt.block_number.as_deref())
                .await;
            return Err(RewardsError::TransactionFailed(format!(
                "transaction {} reverted: {}",
                encode_hash(&tx),
                reason
            )));
        }
        info!(
            "Claim confirmed: {} (block {})",
            encode_hash(&tx),
            receipt.block_number.as_deref().unwrap_or("?")
        );
        Ok(tx)
    }

    /// Replay a reverted claim at its block to recover the node's revert
    /// message.
    async fn revert_reason(
        &self,
        rpc: &EthRpcClient,
        sender: &Address,
        data: &[u8],
        block: Option<&str>,
    ) -> String {
        let block = block.unwrap_or("latest");
        match rpc
            .eth_call_at(Some(sender), &self.config.contract_address, data, block)
            .await
        {
            Err(RpcError::Node { message, .. }) => message,
            Err(e) => {
                debug!("Revert replay failed: {}", e);
                "reason unavailable".to_string()
            }
            Ok(_) => "reason unavailable".to_string(),
        }
    }

    async fn mock_claim(&self, request: &ClaimRequest) -> Result<TxHash> {
        let delay = {
            let mut state = self.mock_state.write().unwrap_or_else(|e| e.into_inner());
            state.claims_sent += 1;
            state.claim_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.mock_state.write().unwrap_or_else(|e| e.into_inner());

        if let Some(reason) = state.claim_failure.take() {
            return Err(RewardsError::TransactionFailed(reason));
        }

        let root = state.published_root.ok_or_else(|| {
            RewardsError::TransactionFailed("execution reverted: no root published".to_string())
        })?;

        let leaf = rewardcraft_core::LeafEntry::new(
            request.address,
            request.cumulative_amount,
            request.proof.clone(),
        );
        if !verify_leaf(&leaf, &root) {
            return Err(RewardsError::TransactionFailed(
                "execution reverted: invalid proof".to_string(),
            ));
        }

        let withdrawn = state.withdrawn.get(&request.address).copied().unwrap_or(0);
        if request.cumulative_amount <= withdrawn {
            return Err(RewardsError::TransactionFailed(
                "execution reverted: nothing to claim".to_string(),
            ));
        }

        state.withdrawn.insert(request.address, request.cumulative_amount);
        let tx = Self::generate_mock_hash(&mut state);
        info!(
            "[MOCK] {} claimed {} (cumulative {}), tx {}",
            encode_address(&request.address),
            request.cumulative_amount - withdrawn,
            request.cumulative_amount,
            encode_hash(&tx)
        );
        Ok(tx)
    }

    // ==================== Mock helpers ====================

    pub fn set_mock_chain_id(&self, chain_id: u64) {
        self.mock_state.write().unwrap_or_else(|e| e.into_inner()).chain_id = chain_id;
    }

    /// Publish `root` on the mock contract. `None` clears it.
    pub fn set_mock_root(&self, root: Option<Hash>) {
        self.mock_state.write().unwrap_or_else(|e| e.into_inner()).published_root = root;
        info!("[MOCK] Root set to {:?}", root.map(|r| encode_hash(&r)));
    }

    pub fn set_mock_withdrawn(&self, account: Address, amount: Amount) {
        let mut state = self.mock_state.write().unwrap_or_else(|e| e.into_inner());
        state.withdrawn.insert(account, amount);
    }

    /// Make the next claim fail with `reason`.
    pub fn fail_next_claim(&self, reason: impl Into<String>) {
        self.mock_state.write().unwrap_or_else(|e| e.into_inner()).claim_failure =
            Some(reason.into());
    }

    /// Hold every claim for `delay` before it settles.
    pub fn set_mock_claim_delay(&self, delay: Option<Duration>) {
        self.mock_state.write().unwrap_or_else(|e| e.into_inner()).claim_delay = delay;
    }

    /// Number of claim transactions dispatched so far.
    pub fn mock_claim_count(&self) -> usize {
        self.mock_state.read().unwrap_or_else(|e| e.into_inner()).claims_sent
    }
}

#[async_trait]
impl ChainStateReader for SettlementClient {
    async fn read_published_root(
        &self,
        contract: &Address,
        required_chain_id: u64,
    ) -> Result<OnchainState> {
        let chain_id = self.ensure_chain(required_chain_id).await?;

        let root = if self.is_mock() {
            self.mock_state
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .published_root
        } else {
            let ret = self
                .rpc()?
                .eth_call(contract, &abi::merkle_root_call())
                .await
                .map_err(|e| e.into_read_error())?;
            Some(abi::decode_hash(&ret)?)
        };

        let state = match root.filter(|r| *r != [0u8; 32]) {
            Some(root) => OnchainState::published(chain_id, root),
            None => OnchainState::unpublished(chain_id),
        };
        debug!(
            "Contract {} on chain {}: root {:?}",
            encode_address(contract),
            chain_id,
            state.published_root.map(|r| encode_hash(&r))
        );
        Ok(state)
    }

    async fn claimed_amount(&self, contract: &Address, account: &Address) -> Result<Amount> {
        if self.is_mock() {
            let state = self.mock_state.read().unwrap_or_else(|e| e.into_inner());
            return Ok(state.withdrawn.get(account).copied().unwrap_or(0));
        }
        let ret = self
            .rpc()?
            .eth_call(contract, &abi::withdrawn_call(account))
            .await
            .map_err(|e| e.into_read_error())?;
        abi::decode_amount(&ret)
    }
}

#[async_trait]
impl ClaimSubmitter for SettlementClient {
    async fn submit_claim(&self, request: &ClaimRequest) -> Result<TxHash> {
        info!("Submitting claim: {}", request.describe());
        self.ensure_chain(request.chain_id).await?;
        if self.is_mock() {
            self.mock_claim(request).await
        } else {
            self.live_claim(request).await
        }
    }
}
