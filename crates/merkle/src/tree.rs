//! Fixture tree builder.
//!
//! Mirrors how the off-chain publisher lays out a distribution: leaves in
//! the given order, sorted-pair hashing, and an odd node at the end of a
//! layer promoted unchanged (no duplication, no padding). Proofs skip the
//! levels where a node was promoted.

use rewardcraft_core::{Address, Amount, Hash, LeafEntry};

use crate::{hash_pair, leaf_hash};

/// A binary Merkle tree.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// All nodes stored level by level, bottom-up. `layers[0]` = leaves.
    layers: Vec<Vec<Hash>>,
}

impl MerkleTree {
    /// Build a tree from `(address, cumulative_amount)` entries.
    pub fn from_entries(entries: &[(Address, Amount)]) -> Self {
        let leaves = entries
            .iter()
            .map(|(address, amount)| leaf_hash(address, *amount))
            .collect();
        Self::from_leaves(leaves)
    }

    /// Build a tree from pre-hashed leaves.
    pub fn from_leaves(leaves: Vec<Hash>) -> Self {
        if leaves.is_empty() {
            return Self {
                layers: vec![vec![[0u8; 32]]],
            };
        }

        let mut layers = vec![leaves];
        loop {
            let prev = &layers[layers.len() - 1];
            if prev.len() <= 1 {
                break;
            }
            let next: Vec<Hash> = prev
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair(left, right),
                    [single] => *single,
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            layers.push(next);
        }

        Self { layers }
    }

    /// Get the Merkle root.
    pub fn root(&self) -> Hash {
        self.layers[self.layers.len() - 1][0]
    }

    /// Proof for the leaf at `index`, `None` when out of range.
    pub fn proof(&self, index: usize) -> Option<Vec<Hash>> {
        if index >= self.layers[0].len() {
            return None;
        }

        let mut siblings = Vec::with_capacity(self.layers.len() - 1);
        let mut idx = index;
        for layer in &self.layers[..self.layers.len() - 1] {
            let sibling = idx ^ 1;
            if sibling < layer.len() {
                siblings.push(layer[sibling]);
            }
            idx /= 2;
        }
        Some(siblings)
    }

    /// Leaf entries (address, amount, proof) for every input entry.
    pub fn leaf_entries(entries: &[(Address, Amount)]) -> (Hash, Vec<LeafEntry>) {
        let tree = Self::from_entries(entries);
        let leaves = entries
            .iter()
            .enumerate()
            .map(|(i, (address, amount))| {
                LeafEntry::new(*address, *amount, tree.proof(i).unwrap_or_default())
            })
            .collect();
        (tree.root(), leaves)
    }

    pub fn leaf_count(&self) -> usize {
        self.layers[0].len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{verify_leaf, verify_proof};
    use rand::Rng;
    use rewardcraft_core::parse_hash;

    #[test]
    fn test_single_leaf() {
        let tree = MerkleTree::from_entries(&[([1u8; 20], 100)]);
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.root(), leaf_hash(&[1u8; 20], 100));
        assert_eq!(tree.proof(0), Some(vec![]));
    }

    #[test]
    fn test_matches_published_vector() {
        let tree = MerkleTree::from_entries(&[
            ([0x11; 20], 1000),
            ([0x22; 20], 250),
            ([0x33; 20], 300),
            ([0x44; 20], 50),
        ]);
        assert_eq!(
            tree.root(),
            parse_hash("0xd52981b9620dd00d4b43f6f100cff12d7127b291bd646ae06658629e4f3eb83f")
                .unwrap()
        );
    }

    #[test]
    fn test_odd_node_promoted() {
        let entries = [([1u8; 20], 10), ([2u8; 20], 20), ([3u8; 20], 30)];
        let tree = MerkleTree::from_entries(&entries);

        let l0 = leaf_hash(&[1u8; 20], 10);
        let l1 = leaf_hash(&[2u8; 20], 20);
        let l2 = leaf_hash(&[3u8; 20], 30);
        assert_eq!(tree.root(), hash_pair(&hash_pair(&l0, &l1), &l2));
        assert_eq!(tree.proof(2).unwrap().len(), 1);
    }

    #[test]
    fn test_every_leaf_verifies() {
        let entries: Vec<_> = (0..17u8).map(|i| ([i; 20], i as Amount * 100)).collect();
        let (root, leaves) = MerkleTree::leaf_entries(&entries);
        for leaf in &leaves {
            assert!(verify_leaf(leaf, &root));
        }
    }

    #[test]
    fn test_corrupting_any_sibling_fails() {
        let mut rng = rand::thread_rng();
        let entries: Vec<_> = (0..9u8)
            .map(|i| ([i; 20], rng.gen_range(1..1_000_000u64) as Amount))
            .collect();
        let (root, leaves) = MerkleTree::leaf_entries(&entries);

        for leaf in &leaves {
            let hash = leaf_hash(&leaf.address, leaf.cumulative_amount);
            for i in 0..leaf.proof.len() {
                let mut corrupted = leaf.proof.clone();
                corrupted[i][rng.gen_range(0..32)] ^= 1 << rng.gen_range(0..8);
                assert!(!verify_proof(&root, &hash, &corrupted));
            }
        }
    }

    #[test]
    fn test_proof_out_of_range() {
        let tree = MerkleTree::from_entries(&[([1u8; 20], 10), ([2u8; 20], 20)]);
        assert!(tree.proof(5).is_none());
    }

    #[test]
    fn test_empty_entries() {
        let tree = MerkleTree::from_entries(&[]);
        assert_eq!(tree.root(), [0u8; 32]);
    }
}
