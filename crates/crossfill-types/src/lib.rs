//! # crossfill-types
//!
//! Shared types, errors, and configuration for the **crossfill** settlement
//! engine.
//!
//! This crate is the leaf dependency of the workspace. Every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Address`], [`Hash32`], [`MessageId`]
//! - **Assets**: [`Asset`], [`TokenAttachment`]
//! - **Escrow model**: [`EscrowImmutables`], [`Timelocks`], [`Side`], [`Transition`], [`EscrowStatus`], [`FillRef`]
//! - **Messaging**: [`Message`], [`QueryContext`], [`Envelope`], [`Effect`], [`Context`], the [`Actor`] trait
//! - **Derivation**: [`ActorInit`] and its per-kind init records
//! - **Secrets**: hashlock creation and verification
//! - **Configuration**: [`ProtocolConfig`], [`FactoryConfig`], [`FeeBankConfig`], [`RuntimeConfig`]
//! - **Errors**: [`CrossfillError`] with `XF_ERR_` prefix codes, [`ErrorKind`]
//! - **Constants** and wire **opcodes**

pub mod actor;
pub mod asset;
pub mod config;
pub mod constants;
pub mod error;
pub mod escrow;
pub mod ids;
pub mod init;
pub mod message;
pub mod opcodes;
pub mod secret;

pub use actor::*;
pub use asset::*;
pub use config::*;
pub use error::*;
pub use escrow::*;
pub use ids::*;
pub use init::*;
pub use message::*;
pub use secret::*;

// Constants and opcodes are accessed via `crossfill_types::constants::FOO`
// and `crossfill_types::opcodes::FOO` (not re-exported to avoid collisions).
