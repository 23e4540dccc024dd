//! RewardCraft Settlement
//!
//! Client for the on-chain reward contract.
//!
//! ## Contract surface
//!
//! 1. **Read root**: `merkleRoot()` returns the root claims are checked
//!    against. A zero word means nothing has been published yet.
//! 2. **Read withdrawn**: `withdrawn(address)` returns the cumulative amount
//!    already paid out to an account.
//! 3. **Claim**: `claim(account, totalAmount, proof)` pays
//!    `totalAmount - withdrawn[account]` when the proof rebuilds the
//!    current root.
//!
//! Every read first checks the connected chain id, so a root from one
//! network is never applied to another.

pub mod abi;
mod client;
mod rpc;

pub use client::{SettlementClient, SettlementConfig, SettlementMode};
pub use rpc::{EthRpcClient, RpcError, TxReceipt};

use async_trait::async_trait;

use rewardcraft_core::{Address, Amount, ClaimRequest, OnchainState, Result, TxHash};

/// Read side of the reward contract.
#[async_trait]
pub trait ChainStateReader: Send + Sync {
    /// Read the published root, failing with `WrongNetwork` when the
    /// connected chain is not `required_chain_id`.
    async fn read_published_root(
        &self,
        contract: &Address,
        required_chain_id: u64,
    ) -> Result<OnchainState>;

    /// Cumulative amount already disbursed to `account`.
    async fn claimed_amount(&self, contract: &Address, account: &Address) -> Result<Amount>;

    /// Published root plus the account's disbursed amount.
    async fn read_state(
        &self,
        contract: &Address,
        required_chain_id: u64,
        account: &Address,
    ) -> Result<OnchainState> {
        let state = self.read_published_root(contract, required_chain_id).await?;
        let claimed = self.claimed_amount(contract, account).await?;
        Ok(state.with_already_claimed(claimed))
    }
}

/// Dispatches a claim transaction and waits for its outcome.
#[async_trait]
pub trait ClaimSubmitter: Send + Sync {
    async fn submit_claim(&self, request: &ClaimRequest) -> Result<TxHash>;
}
