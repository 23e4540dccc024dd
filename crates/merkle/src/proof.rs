use sha3::{Digest, Keccak256};

use rewardcraft_core::{Address, Amount, Hash, LeafEntry};

/// Keccak-256 over the concatenation of `parts`.
pub fn keccak256(parts: &[&[u8]]) -> Hash {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

/// Compute the leaf hash for a claimant's cumulative allocation.
///
/// The amount is widened to a 32-byte big-endian `uint256`. This MUST match
/// the contract's `keccak256(abi.encodePacked(account, totalAmount))`.
pub fn leaf_hash(address: &Address, cumulative_amount: Amount) -> Hash {
    let mut amount = [0u8; 32];
    amount[16..].copy_from_slice(&cumulative_amount.to_be_bytes());
    keccak256(&[address, &amount])
}

/// Hash two nodes, smaller one first.
pub fn hash_pair(a: &Hash, b: &Hash) -> Hash {
    if a <= b {
        keccak256(&[a, b])
    } else {
        keccak256(&[b, a])
    }
}

/// Rebuild the root implied by `leaf` and `proof`.
pub fn process_proof(leaf: &Hash, proof: &[Hash]) -> Hash {
    proof
        .iter()
        .fold(*leaf, |current, sibling| hash_pair(&current, sibling))
}

/// Verify a Merkle proof against a given root and leaf hash.
pub fn verify_proof(root: &Hash, leaf: &Hash, proof: &[Hash]) -> bool {
    process_proof(leaf, proof) == *root
}

/// Verify a leaf entry's own proof against `root`.
pub fn verify_leaf(entry: &LeafEntry, root: &Hash) -> bool {
    let leaf = leaf_hash(&entry.address, entry.cumulative_amount);
    verify_proof(root, &leaf, &entry.proof)
}
