use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::encoding::{
    encode_address, encode_hash, serde_address, serde_amount, serde_hash, serde_hash_vec,
    serde_leaves, serde_option_hash,
};
use crate::{Result, RewardsError};

/// 32-byte Merkle hash (root, leaf or proof sibling)
pub type Hash = [u8; 32];

/// 20-byte claimant / contract address
pub type Address = [u8; 20];

/// Token amount in base units.
///
/// Contracts store `uint256`, but every real reward allocation fits in
/// 128 bits; larger values are rejected at parse time.
pub type Amount = u128;

/// Transaction hash returned by the chain
pub type TxHash = [u8; 32];

/// One claimant's allocation within a [`RootDocument`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafEntry {
    #[serde(with = "serde_address")]
    pub address: Address,
    /// Total ever allocated to `address` as of this root, not a delta.
    #[serde(with = "serde_amount")]
    pub cumulative_amount: Amount,
    /// Sibling hashes, in the order the verifier consumes them.
    #[serde(with = "serde_hash_vec")]
    pub proof: Vec<Hash>,
}

impl LeafEntry {
    pub fn new(address: Address, cumulative_amount: Amount, proof: Vec<Hash>) -> Self {
        Self { address, cumulative_amount, proof }
    }
}

/// One published distribution snapshot, identified by `root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootDocument {
    #[serde(with = "serde_hash")]
    pub root: Hash,
    #[serde(with = "serde_amount")]
    pub total_amount: Amount,
    /// Unix seconds of on-chain publication, absent until published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at_epoch: Option<u64>,
    #[serde(with = "serde_leaves")]
    pub leaves: BTreeMap<Address, LeafEntry>,
}

impl RootDocument {
    /// Parse a document from its JSON wire form.
    ///
    /// Malformed input is `DataUnavailable`: the caller could not check
    /// eligibility, which is different from having none.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| RewardsError::DataUnavailable(format!("malformed root document: {e}")))
    }

    pub fn leaf(&self, address: &Address) -> Option<&LeafEntry> {
        self.leaves.get(address)
    }

    /// Sum of all leaf amounts, `None` on overflow.
    pub fn leaf_sum(&self) -> Option<Amount> {
        self.leaves
            .values()
            .try_fold(0 as Amount, |acc, leaf| acc.checked_add(leaf.cumulative_amount))
    }

    pub fn root_hex(&self) -> String {
        encode_hash(&self.root)
    }
}

/// Reward contract state as read from the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnchainState {
    /// Root the contract accepts claims against; `None` before the first publication.
    pub published_root: Option<Hash>,
    /// Network the state was read from
    pub chain_id: u64,
    /// Cumulative amount already disbursed to the claimant (`withdrawn(address)`)
    pub already_claimed: Amount,
}

impl OnchainState {
    pub fn unpublished(chain_id: u64) -> Self {
        Self { published_root: None, chain_id, already_claimed: 0 }
    }

    pub fn published(chain_id: u64, root: Hash) -> Self {
        Self { published_root: Some(root), chain_id, already_claimed: 0 }
    }

    pub fn with_already_claimed(mut self, amount: Amount) -> Self {
        self.already_claimed = amount;
        self
    }
}

/// Outcome of one reconciliation for one claimant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityResult {
    #[serde(with = "serde_address")]
    pub address: Address,
    /// Claimable right now against the published root, net of withdrawals.
    #[serde(with = "serde_amount")]
    pub claimable_amount: Amount,
    /// Allocated in the latest root but not yet published on-chain.
    #[serde(with = "serde_amount")]
    pub unclaimable_amount: Amount,
    #[serde(with = "serde_amount")]
    pub latest_root_total: Amount,
    #[serde(with = "serde_hash")]
    pub latest_root: Hash,
    #[serde(with = "serde_option_hash")]
    pub onchain_root: Option<Hash>,
    /// Chain the on-chain state was read from.
    pub chain_id: u64,
    /// Cumulative amount under the published root (what `claim` submits).
    #[serde(with = "serde_amount")]
    pub published_amount: Amount,
    #[serde(with = "serde_amount")]
    pub already_claimed: Amount,
    /// Verified leaf under the published root, if the claimant has one.
    #[serde(skip)]
    pub claim_leaf: Option<LeafEntry>,
}

impl EligibilityResult {
    pub fn has_pending(&self) -> bool {
        self.unclaimable_amount > 0
    }

    /// Build the claim request for this result.
    ///
    /// Fails with `NothingToClaim` when there is no published leaf to claim
    /// against. A zero `amount` is still returned so the coordinator can
    /// reject it locally.
    pub fn claim_request(&self, generation: u64) -> Result<ClaimRequest> {
        let (root, leaf) = match (self.onchain_root, self.claim_leaf.as_ref()) {
            (Some(root), Some(leaf)) => (root, leaf),
            _ => return Err(RewardsError::NothingToClaim),
        };

        Ok(ClaimRequest {
            address: self.address,
            amount: self.claimable_amount,
            cumulative_amount: leaf.cumulative_amount,
            proof: leaf.proof.clone(),
            root,
            chain_id: self.chain_id,
            generation,
        })
    }
}

/// A single claim submission. Consumed by the coordinator; never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRequest {
    pub address: Address,
    /// Net amount this claim will disburse
    pub amount: Amount,
    /// Cumulative amount passed to the contract's `claim`
    pub cumulative_amount: Amount,
    pub proof: Vec<Hash>,
    /// Root the proof was verified against
    pub root: Hash,
    /// Chain the root was read from; the claim is only sent there
    pub chain_id: u64,
    /// Coordinator generation of the snapshot this request came from
    pub generation: u64,
}

impl ClaimRequest {
    pub fn describe(&self) -> String {
        format!(
            "{} claims {} (cumulative {}) under {} on chain {}",
            encode_address(&self.address),
            self.amount,
            self.cumulative_amount,
            encode_hash(&self.root),
            self.chain_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> String {
        format!(
            r#"{{
                "root": "0x{root}",
                "totalAmount": "1000",
                "publishedAtEpoch": 1700000000,
                "leaves": {{
                    "0x{addr}": {{
                        "address": "0x{addr}",
                        "cumulativeAmount": "0x3e8",
                        "proof": ["0x{sib}"]
                    }}
                }}
            }}"#,
            root = "11".repeat(32),
            addr = "AA".repeat(20),
            sib = "22".repeat(32),
        )
    }

    #[test]
    fn test_root_document_from_json() {
        let doc = RootDocument::from_json(sample_json().as_bytes()).unwrap();
        assert_eq!(doc.root, [0x11; 32]);
        assert_eq!(doc.total_amount, 1000);
        assert_eq!(doc.published_at_epoch, Some(1_700_000_000));

        let leaf = doc.leaf(&[0xAA; 20]).expect("leaf present");
        assert_eq!(leaf.cumulative_amount, 1000);
        assert_eq!(leaf.proof, vec![[0x22; 32]]);
        assert_eq!(doc.leaf_sum(), Some(1000));
    }

    #[test]
    fn test_root_document_numeric_amounts() {
        let json = format!(
            r#"{{"root":"0x{}","totalAmount":5,"leaves":{{}}}}"#,
            "00".repeat(32)
        );
        let doc = RootDocument::from_json(json.as_bytes()).unwrap();
        assert_eq!(doc.total_amount, 5);
        assert!(doc.published_at_epoch.is_none());
        assert!(doc.leaves.is_empty());
    }

    #[test]
    fn test_root_document_malformed_is_data_unavailable() {
        let err = RootDocument::from_json(b"{\"root\": \"0x12\"}").unwrap_err();
        assert!(matches!(err, RewardsError::DataUnavailable(_)));
    }

    #[test]
    fn test_root_document_key_mismatch_rejected() {
        let json = sample_json().replacen(&format!("\"0x{}\":", "AA".repeat(20)), &format!("\"0x{}\":", "BB".repeat(20)), 1);
        let err = RootDocument::from_json(json.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_root_document_json_roundtrip_writes_decimal() {
        let doc = RootDocument::from_json(sample_json().as_bytes()).unwrap();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"cumulativeAmount\":\"1000\""));
        assert_eq!(RootDocument::from_json(json.as_bytes()).unwrap(), doc);
    }

    #[test]
    fn test_leaf_sum_overflow() {
        let mut leaves = BTreeMap::new();
        leaves.insert([1u8; 20], LeafEntry::new([1u8; 20], Amount::MAX, vec![]));
        leaves.insert([2u8; 20], LeafEntry::new([2u8; 20], 1, vec![]));
        let doc = RootDocument { root: [0; 32], total_amount: 0, published_at_epoch: None, leaves };
        assert_eq!(doc.leaf_sum(), None);
    }

    #[test]
    fn test_claim_request_requires_published_leaf() {
        let result = EligibilityResult {
            address: [0xAA; 20],
            claimable_amount: 0,
            unclaimable_amount: 100,
            latest_root_total: 100,
            latest_root: [1; 32],
            onchain_root: None,
            chain_id: 1,
            published_amount: 0,
            already_claimed: 0,
            claim_leaf: None,
        };
        assert_eq!(result.claim_request(0), Err(RewardsError::NothingToClaim));
        assert!(result.has_pending());
    }

    #[test]
    fn test_claim_request_carries_leaf() {
        let leaf = LeafEntry::new([0xAA; 20], 600, vec![[9; 32]]);
        let result = EligibilityResult {
            address: [0xAA; 20],
            claimable_amount: 450,
            unclaimable_amount: 400,
            latest_root_total: 1000,
            latest_root: [2; 32],
            onchain_root: Some([1; 32]),
            chain_id: 137,
            published_amount: 600,
            already_claimed: 150,
            claim_leaf: Some(leaf),
        };
        let req = result.claim_request(3).unwrap();
        assert_eq!(req.amount, 450);
        assert_eq!(req.cumulative_amount, 600);
        assert_eq!(req.proof, vec![[9; 32]]);
        assert_eq!(req.root, [1; 32]);
        assert_eq!(req.generation, 3);
        assert_eq!(req.chain_id, 137);
    }
}
