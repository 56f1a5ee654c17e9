//! Hashing for claim commitments
//!
//! This module provides:
//! - Keccak-256 hashing of arbitrary bytes
//! - The packed leaf encoding `uint256 entitlement || address depositor`
//! - Order-independent pair hashing used by the Merkle tree
//!
//! The byte layout matches `abi.encodePacked(uint256, address)` so roots and
//! proofs can be checked by an EVM verifier.

use crate::types::{Address, Amount, Hash};
use sha3::{Digest, Keccak256};

/// Width of the entitlement field in a leaf
pub const ENTITLEMENT_WIDTH: usize = 32;

/// Total width of an encoded leaf
pub const LEAF_ENCODING_LEN: usize = ENTITLEMENT_WIDTH + Address::LEN;

/// Hash arbitrary bytes using Keccak-256
pub fn keccak256(data: &[u8]) -> Hash {
    Keccak256::digest(data).into()
}

/// Encode a leaf: 32-byte big-endian entitlement followed by the raw address
pub fn encode_leaf(entitlement: Amount, depositor: &Address) -> [u8; LEAF_ENCODING_LEN] {
    let mut encoded = [0u8; LEAF_ENCODING_LEN];
    // u128 occupies the low 16 bytes of the uint256 word
    encoded[16..ENTITLEMENT_WIDTH].copy_from_slice(&entitlement.to_be_bytes());
    encoded[ENTITLEMENT_WIDTH..].copy_from_slice(depositor.as_bytes());
    encoded
}

/// Leaf hash for an (entitlement, depositor) pair
pub fn leaf_hash(entitlement: Amount, depositor: &Address) -> Hash {
    keccak256(&encode_leaf(entitlement, depositor))
}

/// Hash two nodes after sorting them lexicographically
pub fn hash_sorted_pair(a: &Hash, b: &Hash) -> Hash {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    Keccak256::new()
        .chain_update(first)
        .chain_update(second)
        .finalize()
        .into()
}

/// Render a hash as `0x`-prefixed hex
pub fn to_hex(hash: &Hash) -> String {
    format!("0x{}", hex::encode(hash))
}
