//! RewardCraft Client
//!
//! Claimant-facing orchestration on top of the store, settlement and
//! engine crates.
//!
//! ## Overview
//!
//! - [`RewardsSession`] refreshes a claimant's position: it reads the latest
//!   root document and the contract state concurrently, then reconciles them.
//! - [`ClaimCoordinator`] owns the claim lifecycle
//!   (`Idle -> Submitting -> Confirmed | Failed`) and allows one outstanding
//!   claim at a time.
//!
//! ## Example
//!
//! ```ignore
//! use rewardcraft_client::{RewardsSession, SessionConfig};
//! use rewardcraft_settlement::{SettlementClient, SettlementConfig};
//!
//! let chain = SettlementClient::new(SettlementConfig::live(rpc_url, contract));
//! let session = RewardsSession::http(config, chain);
//!
//! let snapshot = session.refresh().await?;
//! println!("Claimable: {}", snapshot.result.claimable_amount);
//!
//! if snapshot.result.claimable_amount > 0 {
//!     let tx = session.claim(&snapshot)?.wait().await?;
//! }
//! ```

mod coordinator;
mod session;

pub use coordinator::{ClaimCoordinator, ClaimHandle, ClaimState};
pub use session::{RewardsSession, SessionConfig, Snapshot};
