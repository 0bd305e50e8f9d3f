//! System-wide constants for the crossfill settlement engine.

use rust_decimal::Decimal;

/// Maximum accepted secret length in bytes.
pub const MAX_SECRET_LEN: usize = 32;

/// Native value an escrow keeps on top of `amount + safety_deposit` (0.05).
pub const DEFAULT_MIN_OPERATING_RESERVE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Smallest deposit the fee bank accepts (0.001).
pub const DEFAULT_MIN_DEPOSIT: Decimal = Decimal::from_parts(1, 0, 0, false, 3);

/// Number of processed message ids each withdrawal guard remembers.
pub const IDEMPOTENCY_CACHE_SIZE: usize = 10_000;

/// Deepest Merkle proof accepted (2^32 parts is far beyond any order).
pub const MAX_PROOF_DEPTH: usize = 32;

/// Byte length of an order extension carrying a Merkle commitment.
pub const EXTENSION_LEN: usize = 148;

/// Width of the shortened Merkle root stored in `hashlock_info`.
pub const ROOT_MASK_BITS: u32 = 240;

/// Upper bound on deliveries processed by one `run_until_idle` call.
pub const RUNTIME_MAX_DELIVERIES: usize = 100_000;

/// Substrate clock at genesis, seconds since the UNIX epoch.
pub const GENESIS_UNIX_SECS: i64 = 1_700_000_000;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "crossfill";
