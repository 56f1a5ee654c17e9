//! Merkle tree for claim commitments
//!
//! # Design
//!
//! - Binary Merkle tree with Keccak-256 hashing
//! - Leaves are taken as-is (they are already hashes of the leaf encoding)
//! - Sibling pairs are sorted before hashing, so proofs carry no left/right
//!   direction bits
//! - A trailing odd node is promoted to the next level unchanged
//!
//! These rules reproduce the tree an EVM verifier using sorted-pair
//! `keccak256` proofs expects.

use crate::crypto::hash_sorted_pair;
use crate::types::Hash;

/// Merkle tree with all levels materialized
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// `levels[0]` holds the leaves, the last level holds the root
    levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    /// Build a tree from leaf hashes
    pub fn from_leaves(leaves: Vec<Hash>) -> Self {
        let mut levels = vec![leaves];

        while levels.last().map_or(false, |level| level.len() > 1) {
            let current = &levels[levels.len() - 1];
            let next: Vec<Hash> = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_sorted_pair(left, right),
                    [single] => *single,
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            levels.push(next);
        }

        Self { levels }
    }

    /// Number of leaves
    pub fn len(&self) -> usize {
        self.levels[0].len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    /// Leaf hashes
    pub fn leaves(&self) -> &[Hash] {
        &self.levels[0]
    }

    /// Merkle root (all zeros for an empty tree)
    pub fn root(&self) -> Hash {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or([0u8; 32])
    }

    /// Sibling hashes from the leaf at `leaf_index` up to the root
    pub fn proof(&self, leaf_index: usize) -> Option<Vec<Hash>> {
        if leaf_index >= self.len() {
            return None;
        }

        let mut proof = Vec::with_capacity(self.levels.len());
        let mut index = leaf_index;

        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = if index % 2 == 0 { index + 1 } else { index - 1 };
            // Promoted nodes have no sibling at this level
            if let Some(hash) = level.get(sibling) {
                proof.push(*hash);
            }
            index /= 2;
        }

        Some(proof)
    }
}

/// Fold a proof over a leaf and compare with the expected root
pub fn verify(proof: &[Hash], root: &Hash, leaf: &Hash) -> bool {
    compute_root(proof, leaf) == *root
}

/// Root implied by a leaf and its proof
pub fn compute_root(proof: &[Hash], leaf: &Hash) -> Hash {
    proof
        .iter()
        .fold(*leaf, |current, sibling| hash_sorted_pair(&current, sibling))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keccak256;

    fn leaves(n: usize) -> Vec<Hash> {
        (0..n).map(|i| keccak256(format!("leaf{}", i).as_bytes())).collect()
    }

    #[test]
    fn test_empty_tree() {
        let tree = MerkleTree::from_leaves(vec![]);
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.root(), [0u8; 32]);
        assert!(tree.proof(0).is_none());
    }

    #[test]
    fn test_single_leaf() {
        let leaf = leaves(1)[0];
        let tree = MerkleTree::from_leaves(vec![leaf]);

        assert_eq!(tree.root(), leaf);
        let proof = tree.proof(0).unwrap();
        assert!(proof.is_empty());
        assert!(verify(&proof, &tree.root(), &leaf));
    }

    #[test]
    fn test_two_leaves() {
        let l = leaves(2);
        let tree = MerkleTree::from_leaves(l.clone());

        assert_eq!(tree.root(), hash_sorted_pair(&l[0], &l[1]));
        assert_eq!(tree.proof(0).unwrap(), vec![l[1]]);
        assert_eq!(tree.proof(1).unwrap(), vec![l[0]]);
    }

    #[test]
    fn test_odd_number_leaves_promotes_last() {
        let l = leaves(3);
        let tree = MerkleTree::from_leaves(l.clone());

        // Last leaf is carried up, not duplicated
        let h01 = hash_sorted_pair(&l[0], &l[1]);
        let expected_root = hash_sorted_pair(&h01, &l[2]);
        assert_eq!(tree.root(), expected_root);

        assert_eq!(tree.proof(2).unwrap(), vec![h01]);
        assert_eq!(tree.proof(0).unwrap(), vec![l[1], l[2]]);
    }

    #[test]
    fn test_all_proofs_verify() {
        for n in 1..=17 {
            let l = leaves(n);
            let tree = MerkleTree::from_leaves(l.clone());
            let root = tree.root();

            for (i, leaf) in l.iter().enumerate() {
                let proof = tree.proof(i).unwrap();
                assert!(verify(&proof, &root, leaf), "leaf {} of {}", i, n);
            }
        }
    }

    #[test]
    fn test_proof_verification_invalid() {
        let l = leaves(4);
        let tree = MerkleTree::from_leaves(l.clone());
        let root = tree.root();

        let mut proof = tree.proof(0).unwrap();
        proof[1][0] ^= 0x01;
        assert!(!verify(&proof, &root, &l[0]));

        // Right proof, wrong leaf
        let proof = tree.proof(0).unwrap();
        assert!(!verify(&proof, &root, &l[1]));

        // Tampered root
        assert!(!verify(&proof, &keccak256(b"fake_root"), &l[0]));
    }

    #[test]
    fn test_order_sensitive_root() {
        let l = leaves(4);
        let mut swapped = l.clone();
        swapped.swap(1, 2);

        let a = MerkleTree::from_leaves(l);
        let b = MerkleTree::from_leaves(swapped);
        assert_ne!(a.root(), b.root());
    }
}
