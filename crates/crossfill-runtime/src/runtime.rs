//! In-memory value-transfer substrate.
//!
//! Messages are delivered one at a time from a single FIFO queue, which
//! preserves per-sender ordering. Value attached to a message leaves the
//! sender when the message is queued and reaches the recipient just before
//! its handler runs. If the handler fails, the actor's state is restored
//! from a snapshot, a freshly spawned actor is removed again, no effect is
//! emitted, and the attached value bounces back to the sender.
//!
//! Principals that expect replies open a mailbox; messages addressed to it
//! are recorded instead of handled.

use std::collections::{BTreeMap, HashSet, VecDeque};

use chrono::{DateTime, TimeDelta, Utc};
use crossfill_escrow::{Escrow, EscrowFactory};
use crossfill_fees::{FeeAccount, FeeBank, FeeBankCharger};
use crossfill_merkle::MerkleStorageInvalidator;
use crossfill_types::{
    Actor, ActorInit, Address, Asset, Context, CrossfillError, Effect, Envelope, ErrorKind,
    Message, MessageId, Result, RuntimeConfig, TokenAttachment,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::actors::ActorState;
use crate::ledger::Ledger;
use crate::supply_conservation::SupplyConservation;

/// Result of one delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Delivered { spawned: bool },
    Rejected { kind: ErrorKind, reason: String },
}

impl Outcome {
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Delivered { .. } => None,
            Self::Rejected { kind, .. } => Some(*kind),
        }
    }
}

/// One entry of the delivery trace.
#[derive(Debug, Clone, Serialize)]
pub struct Delivery {
    pub envelope: Envelope,
    /// Message whose handler emitted this one; `None` for external sends.
    pub parent: Option<MessageId>,
    pub at: DateTime<Utc>,
    pub redelivered: bool,
    pub outcome: Outcome,
}

#[derive(Debug, Clone)]
struct Queued {
    envelope: Envelope,
    parent: Option<MessageId>,
    redelivered: bool,
}

pub struct Runtime {
    config: RuntimeConfig,
    now: DateTime<Utc>,
    actors: BTreeMap<Address, ActorState>,
    mailboxes: BTreeMap<Address, Vec<Envelope>>,
    ledger: Ledger,
    queue: VecDeque<Queued>,
    trace: Vec<Delivery>,
    supply: SupplyConservation,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        if config.max_deliveries == 0 {
            return Err(CrossfillError::Configuration(
                "runtime.max_deliveries must be > 0".into(),
            ));
        }
        let now = DateTime::from_timestamp(config.genesis_unix_secs, 0).ok_or_else(|| {
            CrossfillError::Configuration(format!(
                "genesis {} is out of range",
                config.genesis_unix_secs
            ))
        })?;
        Ok(Self {
            config,
            now,
            actors: BTreeMap::new(),
            mailboxes: BTreeMap::new(),
            ledger: Ledger::new(),
            queue: VecDeque::new(),
            trace: Vec::new(),
            supply: SupplyConservation::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Clock
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn advance(&mut self, secs: u32) {
        self.now += TimeDelta::seconds(i64::from(secs));
    }

    pub fn set_time(&mut self, now: DateTime<Utc>) {
        self.now = now;
    }

    // -----------------------------------------------------------------------
    // Value
    // -----------------------------------------------------------------------

    /// Create `amount` of `asset` out of thin air for `to`.
    pub fn mint(&mut self, to: Address, asset: Asset, amount: Decimal) -> Result<()> {
        // Balances never exceed the minted total.
        self.supply.record_mint(asset, amount)?;
        self.ledger.credit(to, asset, amount)
    }

    #[must_use]
    pub fn balance(&self, owner: Address, asset: &Asset) -> Decimal {
        self.ledger.balance(owner, asset)
    }

    /// Value of `asset` attached to queued messages.
    #[must_use]
    pub fn in_flight(&self, asset: &Asset) -> Decimal {
        self.queue.iter().map(|q| q.envelope.attached(asset)).sum()
    }

    /// Check that no value was created or destroyed.
    pub fn check_supply(&self) -> Result<()> {
        for asset in self.supply.tracked_assets() {
            let actual = self.ledger.total(asset) + self.in_flight(asset);
            self.supply.verify(asset, actual)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // External sends
    // -----------------------------------------------------------------------

    /// Queue a message from `from`, debiting any attached value now.
    pub fn submit(
        &mut self,
        from: Address,
        to: Address,
        value: Decimal,
        tokens: Option<TokenAttachment>,
        init: Option<ActorInit>,
        body: Message,
    ) -> Result<MessageId> {
        let envelope = Envelope {
            id: MessageId::new(),
            from,
            to,
            value,
            tokens,
            init,
            body,
        };
        self.ledger.debit(from, Asset::Native, value)?;
        if let Some(t) = tokens {
            if let Err(err) = self.ledger.debit(from, t.asset(), t.amount) {
                self.ledger.credit(from, Asset::Native, value)?;
                return Err(err);
            }
        }
        let id = envelope.id;
        tracing::debug!(msg = %id, from = %from, to = %to, op = envelope.body.name(), "Message submitted");
        self.queue.push_back(Queued {
            envelope,
            parent: None,
            redelivered: false,
        });
        Ok(id)
    }

    pub fn send(&mut self, from: Address, to: Address, body: Message) -> Result<MessageId> {
        self.submit(from, to, Decimal::ZERO, None, None, body)
    }

    pub fn send_value(&mut self, from: Address, to: Address, value: Decimal, body: Message) -> Result<MessageId> {
        self.submit(from, to, value, None, None, body)
    }

    pub fn send_tokens(
        &mut self,
        from: Address,
        to: Address,
        tokens: TokenAttachment,
        body: Message,
    ) -> Result<MessageId> {
        self.submit(from, to, Decimal::ZERO, Some(tokens), None, body)
    }

    /// Send `body` to the actor `init` derives, deploying it on arrival.
    pub fn deploy(&mut self, from: Address, init: ActorInit, value: Decimal, body: Message) -> Result<(Address, MessageId)> {
        let to = init.address();
        let id = self.submit(from, to, value, None, Some(init), body)?;
        Ok((to, id))
    }

    /// Queue a duplicate of an already delivered message, same id. The
    /// duplicate carries no value.
    pub fn redeliver(&mut self, id: MessageId) -> Result<()> {
        let first = self
            .trace
            .iter()
            .find(|d| d.envelope.id == id)
            .ok_or_else(|| CrossfillError::Internal(format!("no delivered message {id}")))?;
        let mut envelope = first.envelope.clone();
        envelope.value = Decimal::ZERO;
        envelope.tokens = None;
        let parent = first.parent;
        self.queue.push_back(Queued {
            envelope,
            parent,
            redelivered: true,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Delivery loop
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Deliver the next queued message. Returns `false` when idle.
    pub fn step(&mut self) -> Result<bool> {
        let Some(queued) = self.queue.pop_front() else {
            return Ok(false);
        };
        let delivery = self.deliver(queued)?;
        self.trace.push(delivery);
        if let Err(err) = self.check_supply() {
            tracing::error!(error = %err, "Supply invariant violated");
            return Err(err);
        }
        Ok(true)
    }

    /// Deliver until the queue is empty. Returns the number of deliveries.
    pub fn run_until_idle(&mut self) -> Result<usize> {
        let mut delivered = 0;
        while self.step()? {
            delivered += 1;
            if delivered >= self.config.max_deliveries && !self.queue.is_empty() {
                return Err(CrossfillError::Internal(format!(
                    "delivery cap of {} reached with {} messages queued",
                    self.config.max_deliveries,
                    self.queue.len()
                )));
            }
        }
        Ok(delivered)
    }

    fn deliver(&mut self, queued: Queued) -> Result<Delivery> {
        let Queued {
            envelope,
            parent,
            redelivered,
        } = queued;
        self.credit_attached(envelope.to, &envelope)?;

        let outcome = match self.dispatch(&envelope) {
            Ok(spawned) => {
                tracing::debug!(
                    msg = %envelope.id,
                    from = %envelope.from,
                    to = %envelope.to,
                    op = envelope.body.name(),
                    spawned,
                    "Delivered"
                );
                Outcome::Delivered { spawned }
            }
            Err(err) => {
                self.bounce(&envelope)?;
                tracing::warn!(
                    msg = %envelope.id,
                    from = %envelope.from,
                    to = %envelope.to,
                    op = envelope.body.name(),
                    error = %err,
                    "Delivery rejected"
                );
                Outcome::Rejected {
                    kind: err.kind(),
                    reason: err.to_string(),
                }
            }
        };
        Ok(Delivery {
            envelope,
            parent,
            at: self.now,
            redelivered,
            outcome,
        })
    }

    /// Run the recipient's handler. Returns whether the actor was spawned.
    fn dispatch(&mut self, env: &Envelope) -> Result<bool> {
        if let Some(init) = &env.init {
            let derived = init.address();
            if derived != env.to {
                return Err(CrossfillError::InitMismatch { to: env.to, derived });
            }
        }
        if env.init.is_none() {
            if let Some(inbox) = self.mailboxes.get_mut(&env.to) {
                inbox.push(env.clone());
                return Ok(false);
            }
        }
        let spawned = match (&env.init, self.actors.contains_key(&env.to)) {
            (_, true) => false,
            (Some(init), false) => {
                self.actors.insert(env.to, ActorState::spawn(init, self.now));
                true
            }
            (None, false) => return Err(CrossfillError::NotDeployed(env.to)),
        };

        let Some(actor) = self.actors.get_mut(&env.to) else {
            return Err(CrossfillError::NotDeployed(env.to));
        };
        let snapshot = actor.clone();
        let mut ctx = Context::new(env.to, self.now, self.ledger.balances_of(env.to));
        let result = actor
            .handle(env, &mut ctx)
            .and_then(|()| self.ledger.check_outflows(env.to, ctx.effects()));

        if let Err(err) = result {
            if spawned {
                self.actors.remove(&env.to);
            } else {
                self.actors.insert(env.to, snapshot);
            }
            return Err(err);
        }
        self.commit(env, ctx.into_effects())?;
        Ok(spawned)
    }

    fn commit(&mut self, env: &Envelope, effects: Vec<Effect>) -> Result<()> {
        let from = env.to;
        for effect in effects {
            for (asset, amount) in effect.outflows() {
                self.ledger.debit(from, asset, amount)?;
            }
            match effect {
                Effect::Send {
                    to,
                    value,
                    tokens,
                    init,
                    body,
                } => self.queue.push_back(Queued {
                    envelope: Envelope {
                        id: MessageId::new(),
                        from,
                        to,
                        value,
                        tokens,
                        init,
                        body,
                    },
                    parent: Some(env.id),
                    redelivered: false,
                }),
                Effect::Pay { to, asset, amount } => self.ledger.credit(to, asset, amount)?,
            }
        }
        Ok(())
    }

    fn credit_attached(&mut self, to: Address, env: &Envelope) -> Result<()> {
        self.ledger.credit(to, Asset::Native, env.value)?;
        if let Some(t) = env.tokens {
            self.ledger.credit(to, t.asset(), t.amount)?;
        }
        Ok(())
    }

    fn bounce(&mut self, env: &Envelope) -> Result<()> {
        self.ledger.transfer(env.to, env.from, Asset::Native, env.value)?;
        if let Some(t) = env.tokens {
            self.ledger.transfer(env.to, env.from, t.asset(), t.amount)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Mailboxes
    // -----------------------------------------------------------------------

    /// Let `principal` receive messages. Idempotent.
    pub fn open_mailbox(&mut self, principal: Address) {
        self.mailboxes.entry(principal).or_default();
    }

    /// Messages received by `principal`, oldest first.
    #[must_use]
    pub fn inbox(&self, principal: Address) -> &[Envelope] {
        self.mailboxes.get(&principal).map_or(&[], Vec::as_slice)
    }

    // -----------------------------------------------------------------------
    // Restart
    // -----------------------------------------------------------------------

    /// Persist the actor at `address` and bring it back from the persisted
    /// form, dropping anything that lived only in memory.
    pub fn restart(&mut self, address: Address) -> Result<()> {
        let state = self
            .actors
            .get(&address)
            .ok_or(CrossfillError::NotDeployed(address))?;
        let persisted = serde_json::to_string(state)?;
        let revived: ActorState = serde_json::from_str(&persisted)?;
        tracing::info!(actor = %address, kind = revived.kind(), bytes = persisted.len(), "Actor restarted");
        self.actors.insert(address, revived);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn trace(&self) -> &[Delivery] {
        &self.trace
    }

    /// Outcome of the first delivery of message `id`.
    #[must_use]
    pub fn outcome(&self, id: MessageId) -> Option<&Outcome> {
        self.trace
            .iter()
            .find(|d| d.envelope.id == id)
            .map(|d| &d.outcome)
    }

    /// Deliveries caused by `root`, directly or transitively, in delivery
    /// order and starting with `root` itself.
    #[must_use]
    pub fn causal_chain(&self, root: MessageId) -> Vec<&Delivery> {
        let mut members = HashSet::from([root]);
        let mut chain = Vec::new();
        for d in &self.trace {
            let linked = d.envelope.id == root || d.parent.is_some_and(|p| members.contains(&p));
            if linked && !d.redelivered {
                members.insert(d.envelope.id);
                chain.push(d);
            }
        }
        chain
    }

    #[must_use]
    pub fn is_deployed(&self, address: Address) -> bool {
        self.actors.contains_key(&address)
    }

    #[must_use]
    pub fn actor(&self, address: Address) -> Option<&ActorState> {
        self.actors.get(&address)
    }

    #[must_use]
    pub fn escrow(&self, address: Address) -> Option<&Escrow> {
        self.actor(address).and_then(ActorState::as_escrow)
    }

    #[must_use]
    pub fn factory(&self, address: Address) -> Option<&EscrowFactory> {
        self.actor(address).and_then(ActorState::as_factory)
    }

    #[must_use]
    pub fn charger(&self, address: Address) -> Option<&FeeBankCharger> {
        self.actor(address).and_then(ActorState::as_charger)
    }

    #[must_use]
    pub fn fee_bank(&self, address: Address) -> Option<&FeeBank> {
        self.actor(address).and_then(ActorState::as_fee_bank)
    }

    #[must_use]
    pub fn fee_account(&self, address: Address) -> Option<&FeeAccount> {
        self.actor(address).and_then(ActorState::as_fee_account)
    }

    #[must_use]
    pub fn invalidator(&self, address: Address) -> Option<&MerkleStorageInvalidator> {
        self.actor(address).and_then(ActorState::as_invalidator)
    }
}

#[cfg(test)]
mod tests {
    use crossfill_types::{ChargerInit, FeeBankConfig, InvalidatorInit};

    use super::*;

    fn runtime() -> Runtime {
        Runtime::new(RuntimeConfig::default()).unwrap()
    }

    fn operator() -> Address {
        Address::from_label("operator")
    }

    fn charger_init() -> ActorInit {
        ActorInit::FeeBankCharger(ChargerInit {
            owner: operator(),
            asset: Asset::Native,
            fee_bank_config: FeeBankConfig::default(),
        })
    }

    #[test]
    fn clock_starts_at_genesis() {
        let mut rt = runtime();
        let genesis = rt.now();
        assert_eq!(genesis.timestamp(), RuntimeConfig::default().genesis_unix_secs);
        rt.advance(90);
        assert_eq!((rt.now() - genesis).num_seconds(), 90);
    }

    #[test]
    fn zero_delivery_cap_rejected() {
        let cfg = RuntimeConfig {
            max_deliveries: 0,
            ..RuntimeConfig::default()
        };
        assert!(matches!(Runtime::new(cfg), Err(CrossfillError::Configuration(_))));
    }

    #[test]
    fn message_to_missing_actor_bounces_value() {
        let mut rt = runtime();
        let alice = Address::from_label("alice");
        rt.mint(alice, Asset::Native, Decimal::TEN).unwrap();
        let id = rt
            .send_value(alice, Address::from_label("nowhere"), Decimal::ONE, Message::Deposit)
            .unwrap();
        assert_eq!(rt.balance(alice, &Asset::Native), Decimal::new(9, 0));
        rt.run_until_idle().unwrap();
        assert_eq!(rt.outcome(id).and_then(Outcome::error_kind), Some(ErrorKind::NotDeployed));
        assert_eq!(rt.balance(alice, &Asset::Native), Decimal::TEN);
        rt.check_supply().unwrap();
    }

    #[test]
    fn submit_without_funds_fails() {
        let mut rt = runtime();
        let err = rt
            .send_value(Address::from_label("alice"), Address::from_label("bob"), Decimal::ONE, Message::Deposit)
            .unwrap_err();
        assert!(matches!(err, CrossfillError::InsufficientBalance { .. }));
        assert_eq!(rt.pending(), 0);
    }

    #[test]
    fn deploy_spawns_and_cascades() {
        let mut rt = runtime();
        let (charger, id) = rt.deploy(operator(), charger_init(), Decimal::ZERO, Message::Deploy).unwrap();
        rt.run_until_idle().unwrap();
        assert_eq!(rt.outcome(id), Some(&Outcome::Delivered { spawned: true }));
        let bank = rt.charger(charger).unwrap().fee_bank();
        assert!(rt.fee_bank(bank).is_some());
        assert_eq!(rt.causal_chain(id).len(), 2);
    }

    #[test]
    fn failed_spawn_is_rolled_back() {
        let mut rt = runtime();
        let (charger, id) = rt
            .deploy(Address::from_label("mallory"), charger_init(), Decimal::ZERO, Message::Deploy)
            .unwrap();
        rt.run_until_idle().unwrap();
        assert_eq!(rt.outcome(id).and_then(Outcome::error_kind), Some(ErrorKind::Unauthorized));
        assert!(!rt.is_deployed(charger));
    }

    #[test]
    fn init_for_other_address_rejected() {
        let mut rt = runtime();
        let id = rt
            .submit(
                operator(),
                Address::from_label("elsewhere"),
                Decimal::ZERO,
                None,
                Some(charger_init()),
                Message::Deploy,
            )
            .unwrap();
        rt.run_until_idle().unwrap();
        assert!(matches!(
            rt.outcome(id),
            Some(Outcome::Rejected { kind: ErrorKind::Unauthorized, .. })
        ));
    }

    #[test]
    fn restart_preserves_state() {
        let mut rt = runtime();
        let init = ActorInit::Invalidator(InvalidatorInit {
            trigger: Address::from_label("lop"),
            factory: None,
        });
        let (addr, _) = rt.deploy(operator(), init, Decimal::ZERO, Message::Deploy).unwrap();
        rt.run_until_idle().unwrap();
        let before = rt.actor(addr).cloned();
        rt.restart(addr).unwrap();
        assert_eq!(rt.actor(addr).cloned(), before);
        assert!(matches!(
            rt.restart(Address::from_label("ghost")),
            Err(CrossfillError::NotDeployed(_))
        ));
    }

    #[test]
    fn mailbox_records_messages_and_value() {
        let mut rt = runtime();
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        rt.mint(alice, Asset::Native, Decimal::TWO).unwrap();
        rt.open_mailbox(bob);
        rt.send_value(alice, bob, Decimal::ONE, Message::Deposit).unwrap();
        rt.run_until_idle().unwrap();
        assert_eq!(rt.inbox(bob).len(), 1);
        assert_eq!(rt.balance(bob, &Asset::Native), Decimal::ONE);
        assert!(rt.inbox(alice).is_empty());
    }

    #[test]
    fn redeliver_unknown_id_fails() {
        let mut rt = runtime();
        assert!(rt.redeliver(MessageId::new()).is_err());
    }
}
