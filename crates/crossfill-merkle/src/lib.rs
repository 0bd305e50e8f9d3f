//! # crossfill-merkle
//!
//! Merkle-gated partial fills.
//!
//! A multi-fill order commits to N+1 secrets through the root of a
//! commutative Merkle tree packed into its extension. Each partial fill
//! reveals one secret hash and an inclusion proof;
//! [`MerkleStorageInvalidator`] verifies it and consumes the index.

pub mod extension;
pub mod invalidator;
pub mod proof;

pub use extension::{Extension, HashlockInfo, TakerData};
pub use invalidator::{Commitment, MerkleStorageInvalidator};
pub use proof::MerkleTree;
