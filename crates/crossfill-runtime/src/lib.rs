//! # crossfill-runtime
//!
//! In-memory value-transfer substrate for crossfill actors.
//!
//! - [`Runtime`]: actor registry, FIFO delivery, per-(address, asset)
//!   [`Ledger`], clock, delivery trace, redelivery and restart
//! - [`SupplyConservation`]: checked after every delivery
//! - [`Runtime::bootstrap`]: deploys the protocol actors in one call
//! - [`telemetry::init_tracing`]: subscriber setup for binaries and tests

pub mod actors;
pub mod ledger;
pub mod protocol;
pub mod runtime;
pub mod supply_conservation;
pub mod telemetry;

pub use actors::ActorState;
pub use ledger::Ledger;
pub use protocol::{Protocol, ProtocolSetup};
pub use runtime::{Delivery, Outcome, Runtime};
pub use supply_conservation::SupplyConservation;
