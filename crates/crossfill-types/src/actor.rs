//! Actor execution contract.
//!
//! Each actor handles one [`Envelope`] at a time. A handler never mutates
//! other actors or the ledger directly: it records outgoing [`Effect`]s on
//! its [`Context`], and the substrate commits them only if the handler
//! returns `Ok` and the actor can cover every outgoing transfer.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::asset::{Asset, TokenAttachment};
use crate::error::Result;
use crate::ids::{Address, MessageId};
use crate::init::ActorInit;
use crate::message::Message;

/// One message in flight on the substrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: MessageId,
    pub from: Address,
    pub to: Address,
    /// Native value attached to the message.
    pub value: Decimal,
    /// Token value attached to the message.
    pub tokens: Option<TokenAttachment>,
    /// Deploys `to` on first contact when it derives that address.
    pub init: Option<ActorInit>,
    pub body: Message,
}

impl Envelope {
    /// Attached amount of `asset`.
    #[must_use]
    pub fn attached(&self, asset: &Asset) -> Decimal {
        match asset {
            Asset::Native => self.value,
            Asset::Token(token) => self
                .tokens
                .filter(|t| t.token == *token)
                .map_or(Decimal::ZERO, |t| t.amount),
        }
    }
}

/// Outgoing effect recorded by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Send {
        to: Address,
        value: Decimal,
        tokens: Option<TokenAttachment>,
        init: Option<ActorInit>,
        body: Message,
    },
    /// Plain value transfer to any address, no message.
    Pay {
        to: Address,
        asset: Asset,
        amount: Decimal,
    },
}

impl Effect {
    /// Amounts this effect debits from the sending actor.
    #[must_use]
    pub fn outflows(&self) -> Vec<(Asset, Decimal)> {
        match self {
            Self::Send { value, tokens, .. } => {
                let mut out = Vec::with_capacity(2);
                if !value.is_zero() {
                    out.push((Asset::Native, *value));
                }
                if let Some(t) = tokens {
                    out.push((t.asset(), t.amount));
                }
                out
            }
            Self::Pay { asset, amount, .. } => vec![(*asset, *amount)],
        }
    }
}

/// Per-delivery handler context.
#[derive(Debug)]
pub struct Context {
    self_address: Address,
    now: DateTime<Utc>,
    /// Actor balances at delivery time, attached value included.
    balances: HashMap<Asset, Decimal>,
    effects: Vec<Effect>,
}

impl Context {
    #[must_use]
    pub fn new(self_address: Address, now: DateTime<Utc>, balances: HashMap<Asset, Decimal>) -> Self {
        Self {
            self_address,
            now,
            balances,
            effects: Vec::new(),
        }
    }

    #[must_use]
    pub fn self_address(&self) -> Address {
        self.self_address
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Balance of `asset` after the outflows recorded so far.
    #[must_use]
    pub fn balance(&self, asset: &Asset) -> Decimal {
        let held = self.balances.get(asset).copied().unwrap_or(Decimal::ZERO);
        let spent: Decimal = self
            .effects
            .iter()
            .flat_map(Effect::outflows)
            .filter(|(a, _)| a == asset)
            .map(|(_, amount)| amount)
            .fold(Decimal::ZERO, Decimal::saturating_add);
        held.saturating_sub(spent)
    }

    /// Assets with a recorded balance at delivery time.
    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.balances.keys()
    }

    pub fn send(&mut self, to: Address, body: Message) {
        self.send_value(to, Decimal::ZERO, body);
    }

    pub fn send_value(&mut self, to: Address, value: Decimal, body: Message) {
        self.effects.push(Effect::Send {
            to,
            value,
            tokens: None,
            init: None,
            body,
        });
    }

    pub fn send_tokens(&mut self, to: Address, value: Decimal, tokens: TokenAttachment, body: Message) {
        self.effects.push(Effect::Send {
            to,
            value,
            tokens: Some(tokens),
            init: None,
            body,
        });
    }

    /// Send to the actor `init` derives, deploying it if missing. Returns
    /// the derived address.
    pub fn deploy(
        &mut self,
        init: ActorInit,
        value: Decimal,
        tokens: Option<TokenAttachment>,
        body: Message,
    ) -> Address {
        let to = init.address();
        self.effects.push(Effect::Send {
            to,
            value,
            tokens,
            init: Some(init),
            body,
        });
        to
    }

    /// Send value of any asset without a message. Zero amounts are dropped.
    pub fn pay(&mut self, to: Address, asset: Asset, amount: Decimal) {
        if amount.is_zero() {
            return;
        }
        self.effects.push(Effect::Pay { to, asset, amount });
    }

    #[must_use]
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    #[must_use]
    pub fn into_effects(self) -> Vec<Effect> {
        self.effects
    }
}

/// A message-driven actor.
pub trait Actor {
    /// Short actor-kind name for logs and errors.
    fn kind(&self) -> &'static str;

    /// Handle one message. An `Err` discards every effect recorded on `ctx`
    /// and any state change the handler made.
    fn handle(&mut self, env: &Envelope, ctx: &mut Context) -> Result<()>;
}
