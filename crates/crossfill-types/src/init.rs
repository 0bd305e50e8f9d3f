//! Actor init data and deterministic address derivation.
//!
//! An actor's address is a pure function of its init data:
//!
//! ```text
//! address = SHA-256("crossfill:actor:v1:" || kind_tag || canonical(init))
//! ```
//!
//! The canonical encoding is written out field by field rather than
//! delegated to serde, so addresses do not move when a serializer changes.
//! Anyone holding the init data can predict the address before deployment,
//! and two deployments with identical init data land on the same instance.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::asset::Asset;
use crate::config::{CreditLink, FactoryConfig, FeeBankConfig};
use crate::escrow::{EscrowImmutables, write_decimal};
use crate::ids::Address;

const DOMAIN_TAG: &[u8] = b"crossfill:actor:v1:";

/// Init data of one HTLC leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowInit {
    pub immutables: EscrowImmutables,
    /// The only sender allowed to fund the escrow.
    pub factory: Address,
    /// Principal allowed to rescue residual funds.
    pub rescuer: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryInit {
    pub owner: Address,
    /// Order-protocol trigger allowed to create escrows and drive the
    /// Merkle invalidator.
    pub trigger: Address,
    /// Fee bank charged for Merkle-validated fills, if any.
    pub fee_bank: Option<Address>,
    pub config: FactoryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargerInit {
    pub owner: Address,
    pub asset: Asset,
    /// Config of the fee bank this charger deploys.
    pub fee_bank_config: FeeBankConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBankInit {
    pub charger: Address,
    pub owner: Address,
    pub asset: Asset,
    pub config: FeeBankConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAccountInit {
    pub owner: Address,
    pub bank: Address,
    pub charger: Address,
    pub asset: Asset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidatorInit {
    pub trigger: Address,
    /// Factory that receives `ValidatedFill` reports.
    pub factory: Option<Address>,
}

/// Init data for every actor kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorInit {
    Escrow(EscrowInit),
    EscrowFactory(FactoryInit),
    FeeBankCharger(ChargerInit),
    FeeBank(FeeBankInit),
    FeeAccount(FeeAccountInit),
    Invalidator(InvalidatorInit),
}

impl ActorInit {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Escrow(_) => "escrow",
            Self::EscrowFactory(_) => "escrow_factory",
            Self::FeeBankCharger(_) => "fee_bank_charger",
            Self::FeeBank(_) => "fee_bank",
            Self::FeeAccount(_) => "fee_account",
            Self::Invalidator(_) => "invalidator",
        }
    }

    /// Canonical field-by-field encoding, without the domain tag.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(256);
        match self {
            Self::Escrow(init) => {
                init.immutables.write_canonical(&mut out);
                out.extend_from_slice(init.factory.as_bytes());
                out.extend_from_slice(init.rescuer.as_bytes());
            }
            Self::EscrowFactory(init) => {
                out.extend_from_slice(init.owner.as_bytes());
                out.extend_from_slice(init.trigger.as_bytes());
                write_optional(&mut out, init.fee_bank);
                write_decimal(&mut out, init.config.min_operating_reserve);
                write_decimal(&mut out, init.config.fill_fee_rate);
            }
            Self::FeeBankCharger(init) => {
                out.extend_from_slice(init.owner.as_bytes());
                init.asset.write_canonical(&mut out);
                write_bank_config(&mut out, &init.fee_bank_config);
            }
            Self::FeeBank(init) => {
                out.extend_from_slice(init.charger.as_bytes());
                out.extend_from_slice(init.owner.as_bytes());
                init.asset.write_canonical(&mut out);
                write_bank_config(&mut out, &init.config);
            }
            Self::FeeAccount(init) => {
                out.extend_from_slice(init.owner.as_bytes());
                out.extend_from_slice(init.bank.as_bytes());
                out.extend_from_slice(init.charger.as_bytes());
                init.asset.write_canonical(&mut out);
            }
            Self::Invalidator(init) => {
                out.extend_from_slice(init.trigger.as_bytes());
                write_optional(&mut out, init.factory);
            }
        }
        out
    }

    /// Address this init data deploys to.
    #[must_use]
    pub fn address(&self) -> Address {
        let mut hasher = Sha256::new();
        hasher.update(DOMAIN_TAG);
        hasher.update(self.kind().as_bytes());
        hasher.update(b":");
        hasher.update(self.canonical_bytes());
        Address(hasher.finalize().into())
    }
}

fn write_optional(out: &mut Vec<u8>, addr: Option<Address>) {
    match addr {
        Some(a) => {
            out.push(1);
            out.extend_from_slice(a.as_bytes());
        }
        None => out.push(0),
    }
}

fn write_bank_config(out: &mut Vec<u8>, cfg: &FeeBankConfig) {
    write_decimal(out, cfg.min_deposit);
    out.push(match cfg.credit_link {
        CreditLink::Linked => 0,
        CreditLink::Independent => 1,
    });
}

// ---------------------------------------------------------------------------
// Convenience derivations
// ---------------------------------------------------------------------------

impl EscrowInit {
    #[must_use]
    pub fn address(&self) -> Address {
        ActorInit::Escrow(self.clone()).address()
    }
}

impl FeeAccountInit {
    #[must_use]
    pub fn address(&self) -> Address {
        ActorInit::FeeAccount(*self).address()
    }
}

impl InvalidatorInit {
    #[must_use]
    pub fn address(&self) -> Address {
        ActorInit::Invalidator(*self).address()
    }
}

impl ChargerInit {
    /// Init data of the fee bank deployed by the charger at `charger`.
    #[must_use]
    pub fn fee_bank_init(&self, charger: Address) -> FeeBankInit {
        FeeBankInit {
            charger,
            owner: self.owner,
            asset: self.asset,
            config: self.fee_bank_config.clone(),
        }
    }
}
