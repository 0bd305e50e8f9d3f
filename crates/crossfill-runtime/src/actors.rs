//! Registry entry for every actor kind the substrate can host.

use chrono::{DateTime, Utc};
use crossfill_escrow::{Escrow, EscrowFactory};
use crossfill_fees::{FeeAccount, FeeBank, FeeBankCharger};
use crossfill_merkle::MerkleStorageInvalidator;
use crossfill_types::{Actor, ActorInit, Context, Envelope, Result};
use serde::{Deserialize, Serialize};

/// Live state of one deployed actor. Serializable as a whole so the
/// substrate can restart any actor from its persisted form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorState {
    Escrow(Escrow),
    Factory(EscrowFactory),
    Charger(FeeBankCharger),
    FeeBank(FeeBank),
    FeeAccount(FeeAccount),
    Invalidator(MerkleStorageInvalidator),
}

impl ActorState {
    /// Fresh actor for `init`, deployed at `now`.
    #[must_use]
    pub fn spawn(init: &ActorInit, now: DateTime<Utc>) -> Self {
        match init {
            ActorInit::Escrow(i) => Self::Escrow(Escrow::new(i.clone(), now)),
            ActorInit::EscrowFactory(i) => Self::Factory(EscrowFactory::new(i.clone())),
            ActorInit::FeeBankCharger(i) => Self::Charger(FeeBankCharger::new(i.clone())),
            ActorInit::FeeBank(i) => Self::FeeBank(FeeBank::new(i.clone())),
            ActorInit::FeeAccount(i) => Self::FeeAccount(FeeAccount::new(*i)),
            ActorInit::Invalidator(i) => Self::Invalidator(MerkleStorageInvalidator::new(*i)),
        }
    }

    fn inner(&self) -> &dyn Actor {
        match self {
            Self::Escrow(a) => a,
            Self::Factory(a) => a,
            Self::Charger(a) => a,
            Self::FeeBank(a) => a,
            Self::FeeAccount(a) => a,
            Self::Invalidator(a) => a,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Actor {
        match self {
            Self::Escrow(a) => a,
            Self::Factory(a) => a,
            Self::Charger(a) => a,
            Self::FeeBank(a) => a,
            Self::FeeAccount(a) => a,
            Self::Invalidator(a) => a,
        }
    }

    #[must_use]
    pub fn as_escrow(&self) -> Option<&Escrow> {
        match self {
            Self::Escrow(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_factory(&self) -> Option<&EscrowFactory> {
        match self {
            Self::Factory(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_charger(&self) -> Option<&FeeBankCharger> {
        match self {
            Self::Charger(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_fee_bank(&self) -> Option<&FeeBank> {
        match self {
            Self::FeeBank(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_fee_account(&self) -> Option<&FeeAccount> {
        match self {
            Self::FeeAccount(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_invalidator(&self) -> Option<&MerkleStorageInvalidator> {
        match self {
            Self::Invalidator(a) => Some(a),
            _ => None,
        }
    }
}

impl Actor for ActorState {
    fn kind(&self) -> &'static str {
        self.inner().kind()
    }

    fn handle(&mut self, env: &Envelope, ctx: &mut Context) -> Result<()> {
        self.inner_mut().handle(env, ctx)
    }
}
