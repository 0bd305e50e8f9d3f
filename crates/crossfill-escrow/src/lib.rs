//! # crossfill-escrow
//!
//! The hash-time-locked half of the settlement engine:
//!
//! - [`Escrow`]: one HTLC leg (source or destination) with time-gated
//!   withdraw, cancel and rescue transitions
//! - [`EscrowFactory`]: derives escrow addresses from swap parameters,
//!   spawns and funds escrows, and records Merkle-validated fills

pub mod escrow;
pub mod factory;

pub use escrow::Escrow;
pub use factory::EscrowFactory;
