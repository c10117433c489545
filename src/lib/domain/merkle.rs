//! Merkle proofs over the ledger's leaf hashes.
//!
//! Level-0 node `i` is `hash(leaves[i])`; an odd level duplicates its last node.
//! `path[0]` is the leaf, followed by one sibling per level.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use crate::ports::hash::HashFunction;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MerkleError {
    #[error("leaf index {index} out of range (num leaves: {num_leaves})")]
    IndexOutOfRange { index: u64, num_leaves: u64 },

    #[error("cannot build a Merkle tree without leaves")]
    EmptyTree,
}

/// Inclusion proof for one leaf, valid only against the leaf array it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub root: B256,
    /// Leaf value followed by the sibling hashes, leaf level first.
    pub path: Vec<B256>,
    pub leaf_index: u64,
    pub num_leaves: u64,
}

impl MerkleProof {
    /// The proven leaf value (`path[0]`).
    pub fn leaf(&self) -> Option<&B256> {
        self.path.first()
    }

    /// Sibling hashes, leaf level first.
    pub fn siblings(&self) -> &[B256] {
        self.path.get(1..).unwrap_or(&[])
    }

    /// Check this proof against its own recorded root.
    pub fn verify<H: HashFunction>(&self, hasher: &H) -> bool {
        verify_proof(hasher, &self.root, &self.path, self.leaf_index, self.num_leaves)
    }
}

/// Number of sibling levels in a tree of `num_leaves` leaves: `ceil(log2(num_leaves))`.
pub fn tree_depth(num_leaves: u64) -> u32 {
    if num_leaves <= 1 {
        0
    } else {
        u64::BITS - (num_leaves - 1).leading_zeros()
    }
}

fn leaf_node<H: HashFunction>(hasher: &H, leaf: &B256) -> B256 {
    hasher.hash(leaf.as_slice())
}

fn next_level<H: HashFunction>(hasher: &H, level: &mut Vec<B256>) -> Vec<B256> {
    if level.len() % 2 == 1 {
        if let Some(last) = level.last().copied() {
            level.push(last);
        }
    }
    level
        .chunks(2)
        .map(|pair| hasher.hash_pair(&pair[0], &pair[1]))
        .collect()
}

/// Root of the tree over `leaves`.
pub fn compute_root<H: HashFunction>(hasher: &H, leaves: &[B256]) -> Result<B256, MerkleError> {
    if leaves.is_empty() {
        return Err(MerkleError::EmptyTree);
    }

    let mut level: Vec<B256> = leaves.iter().map(|l| leaf_node(hasher, l)).collect();
    while level.len() > 1 {
        level = next_level(hasher, &mut level);
    }
    Ok(level[0])
}

/// Fold `leaves` up to the root, recording the sibling of the node on the path
/// to `index` at every level.
pub fn build_proof<H: HashFunction>(
    hasher: &H,
    leaves: &[B256],
    index: u64,
) -> Result<MerkleProof, MerkleError> {
    let num_leaves = leaves.len() as u64;
    if num_leaves == 0 {
        return Err(MerkleError::EmptyTree);
    }
    if index >= num_leaves {
        return Err(MerkleError::IndexOutOfRange { index, num_leaves });
    }

    let mut path = Vec::with_capacity(1 + tree_depth(num_leaves) as usize);
    path.push(leaves[index as usize]);

    let mut level: Vec<B256> = leaves.iter().map(|l| leaf_node(hasher, l)).collect();
    let mut position = index as usize;

    while level.len() > 1 {
        let parents = next_level(hasher, &mut level);
        // `level` is even-sized after padding, so the sibling always exists.
        path.push(level[position ^ 1]);
        position /= 2;
        level = parents;
    }

    Ok(MerkleProof {
        root: level[0],
        path,
        leaf_index: index,
        num_leaves,
    })
}

/// Recompute the root from `path` and compare it with `root`.
///
/// Returns `false` for any mismatch, including an out-of-range index or a path
/// whose length does not match the depth implied by `num_leaves`.
pub fn verify_proof<H: HashFunction>(
    hasher: &H,
    root: &B256,
    path: &[B256],
    index: u64,
    num_leaves: u64,
) -> bool {
    if num_leaves == 0 || index >= num_leaves {
        return false;
    }
    if path.len() != 1 + tree_depth(num_leaves) as usize {
        return false;
    }

    let mut current = leaf_node(hasher, &path[0]);
    let mut position = index;

    for sibling in &path[1..] {
        current = if position % 2 == 0 {
            hasher.hash_pair(&current, sibling)
        } else {
            hasher.hash_pair(sibling, &current)
        };
        position /= 2;
    }

    current == *root
}
