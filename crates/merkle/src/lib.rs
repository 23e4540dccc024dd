//! RewardCraft Merkle
//!
//! Proof verification for cumulative reward roots, ported from the EVM
//! verifier the reward contract uses.
//!
//! Leaf formula: `keccak256(address || uint256_be(cumulative_amount))`
//! (Solidity `abi.encodePacked(address, uint256)`).
//! Internal nodes: `keccak256(min(a, b) || max(a, b))` (sorted pairs).
//!
//! Siblings are consumed strictly in the order they were delivered. The
//! sorted-pair rule decides left/right at each level, so there is no leaf
//! index in a proof.

mod proof;
#[cfg(any(test, feature = "test-utils"))]
mod tree;

pub use proof::{hash_pair, keccak256, leaf_hash, process_proof, verify_leaf, verify_proof};
#[cfg(any(test, feature = "test-utils"))]
pub use tree::MerkleTree;
