//! Commutative Merkle proofs over fill secrets.
//!
//! Leaves commit to `(index, secret_hash)`. Interior nodes hash the sorted
//! pair of their children, so a proof is just the list of siblings and
//! carries no left/right flags.

use crossfill_types::Hash32;
use sha2::{Digest, Sha256};

/// Leaf for the secret at `index`: `SHA-256(index_be || secret_hash)`.
#[must_use]
pub fn leaf(index: u64, secret_hash: &Hash32) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(index.to_be_bytes());
    hasher.update(secret_hash.as_bytes());
    Hash32(hasher.finalize().into())
}

/// Parent of two nodes, independent of their order.
#[must_use]
pub fn hash_pair(a: &Hash32, b: &Hash32) -> Hash32 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = Sha256::new();
    hasher.update(lo.as_bytes());
    hasher.update(hi.as_bytes());
    Hash32(hasher.finalize().into())
}

/// Root reconstructed from `leaf` and its sibling path.
#[must_use]
pub fn process_proof(leaf: Hash32, proof: &[Hash32]) -> Hash32 {
    proof.iter().fold(leaf, |node, sibling| hash_pair(&node, sibling))
}

/// Low 240 bits of `root`, with the top 16 bits cleared.
#[must_use]
pub fn shorten(root: &Hash32) -> Hash32 {
    let mut bytes = root.0;
    bytes[0] = 0;
    bytes[1] = 0;
    Hash32(bytes)
}

/// Whether `proof` proves `(index, secret_hash)` under the shortened root.
#[must_use]
pub fn verify(shortened_root: &Hash32, index: u64, secret_hash: &Hash32, proof: &[Hash32]) -> bool {
    shorten(&process_proof(leaf(index, secret_hash), proof)) == *shortened_root
}

// ---------------------------------------------------------------------------
// Tree builder
// ---------------------------------------------------------------------------

/// Full tree over an ordered list of secret hashes, leaf `i` committing to
/// index `i`. A node without a sibling is promoted to the next layer as is.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    layers: Vec<Vec<Hash32>>,
}

impl MerkleTree {
    /// Returns `None` for an empty list.
    #[must_use]
    pub fn build(secret_hashes: &[Hash32]) -> Option<Self> {
        if secret_hashes.is_empty() {
            return None;
        }
        let leaves: Vec<Hash32> = (0u64..)
            .zip(secret_hashes)
            .map(|(i, h)| leaf(i, h))
            .collect();
        let mut layers = vec![leaves];
        while let Some(prev) = layers.last().filter(|l| l.len() > 1) {
            let next = prev
                .chunks(2)
                .map(|pair| match pair.get(1) {
                    Some(b) => hash_pair(&pair[0], b),
                    None => pair[0],
                })
                .collect();
            layers.push(next);
        }
        Some(Self { layers })
    }

    #[must_use]
    pub fn root(&self) -> Hash32 {
        self.layers
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or(Hash32::ZERO)
    }

    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.layers.first().map_or(0, Vec::len)
    }

    /// Sibling path for leaf `index`.
    #[must_use]
    pub fn proof(&self, index: usize) -> Option<Vec<Hash32>> {
        if index >= self.leaf_count() {
            return None;
        }
        let mut proof = Vec::new();
        let mut pos = index;
        for layer in &self.layers[..self.layers.len() - 1] {
            if let Some(sibling) = layer.get(pos ^ 1) {
                proof.push(*sibling);
            }
            pos /= 2;
        }
        Some(proof)
    }
}
