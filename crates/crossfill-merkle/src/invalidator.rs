//! Merkle storage invalidator.
//!
//! Gates partial fills of multi-fill orders. Each fill discloses one secret
//! hash together with its index in the order's secret tree; the invalidator
//! checks the inclusion proof against the root committed in the order
//! extension and consumes the index so it cannot be used twice.
//!
//! Commitment records are scoped by order hash, created on the first
//! accepted proof and never reset.

use std::collections::{BTreeMap, BTreeSet};

use crossfill_types::{
    Actor, ActorInit, Address, Context, CrossfillError, Envelope, Hash32, InvalidatorInit,
    Message, Result, ensure_non_negative,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::extension::{Extension, HashlockInfo, TakerData};
use crate::proof;

/// Per-order commitment and the indices already used against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub shortened_root: Hash32,
    pub parts_count: u16,
    pub consumed: BTreeSet<u64>,
    /// Most recently accepted `(index, secret_hash)`.
    pub last_validated: Option<(u64, Hash32)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleStorageInvalidator {
    init: InvalidatorInit,
    address: Address,
    commitments: BTreeMap<Hash32, Commitment>,
}

fn invalid(reason: impl Into<String>) -> CrossfillError {
    CrossfillError::InvalidProof {
        reason: reason.into(),
    }
}

impl MerkleStorageInvalidator {
    #[must_use]
    pub fn new(init: InvalidatorInit) -> Self {
        Self {
            address: ActorInit::Invalidator(init).address(),
            init,
            commitments: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub fn trigger(&self) -> Address {
        self.init.trigger
    }

    #[must_use]
    pub fn commitment(&self, order_hash: &Hash32) -> Option<&Commitment> {
        self.commitments.get(order_hash)
    }

    #[must_use]
    pub fn is_consumed(&self, order_hash: &Hash32, index: u64) -> bool {
        self.commitments
            .get(order_hash)
            .is_some_and(|c| c.consumed.contains(&index))
    }

    /// Validate one fill without touching state.
    fn check(
        &self,
        order_hash: &Hash32,
        extension: &[u8],
        extra_data: &[u8],
    ) -> Result<(HashlockInfo, TakerData)> {
        let info = Extension::decode(extension)?.commitment();
        let taker = TakerData::decode(extra_data)?;

        if info.parts_count < 2 {
            return Err(invalid(format!(
                "order is not multi-fill (parts_count = {})",
                info.parts_count
            )));
        }
        if taker.index > u64::from(info.parts_count) {
            return Err(invalid(format!(
                "index {} beyond parts_count {}",
                taker.index, info.parts_count
            )));
        }
        if !proof::verify(&info.shortened_root, taker.index, &taker.secret_hash, &taker.proof) {
            return Err(invalid("proof does not reconstruct the committed root"));
        }

        if let Some(stored) = self.commitments.get(order_hash) {
            if stored.shortened_root != info.shortened_root || stored.parts_count != info.parts_count {
                return Err(invalid("commitment differs from the one stored for this order"));
            }
            if stored.consumed.contains(&taker.index) {
                return Err(CrossfillError::ReplayedIndex {
                    order_hash: *order_hash,
                    index: taker.index,
                });
            }
        }
        Ok((info, taker))
    }

    #[allow(clippy::too_many_arguments)]
    fn taker_interaction(
        &mut self,
        env: &Envelope,
        ctx: &mut Context,
        order_hash: Hash32,
        extension: &[u8],
        taker: Address,
        making_amount: Decimal,
        extra_data: &[u8],
    ) -> Result<()> {
        if env.from != self.init.trigger {
            return Err(CrossfillError::Unauthorized {
                role: "order protocol trigger",
                sender: env.from,
            });
        }
        ensure_non_negative(making_amount)?;
        let (info, data) = self.check(&order_hash, extension, extra_data)?;

        let record = self
            .commitments
            .entry(order_hash)
            .or_insert_with(|| Commitment {
                shortened_root: info.shortened_root,
                parts_count: info.parts_count,
                consumed: BTreeSet::new(),
                last_validated: None,
            });
        record.consumed.insert(data.index);
        record.last_validated = Some((data.index, data.secret_hash));

        ctx.send(
            env.from,
            Message::TakerInteractionAccepted {
                order_hash,
                index: data.index,
                secret_hash: data.secret_hash,
            },
        );
        if let Some(factory) = self.init.factory {
            ctx.send(
                factory,
                Message::ValidatedFill {
                    order_hash,
                    index: data.index,
                    secret_hash: data.secret_hash,
                    taker,
                    making_amount,
                },
            );
        }
        tracing::info!(
            invalidator = %self.address,
            order_hash = %order_hash,
            index = data.index,
            secret_hash = %data.secret_hash,
            "Partial fill validated"
        );
        Ok(())
    }
}

impl Actor for MerkleStorageInvalidator {
    fn kind(&self) -> &'static str {
        "merkle invalidator"
    }

    fn handle(&mut self, env: &Envelope, ctx: &mut Context) -> Result<()> {
        match &env.body {
            Message::Deploy => Ok(()),
            Message::TakerInteraction {
                extension,
                order_hash,
                taker,
                making_amount,
                extra_data,
                ..
            } => self.taker_interaction(
                env,
                ctx,
                *order_hash,
                extension,
                *taker,
                *making_amount,
                extra_data,
            ),
            other => Err(CrossfillError::UnexpectedMessage {
                actor: self.kind(),
                message: other.name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use crossfill_types::{Effect, ErrorKind, MessageId};

    use super::*;
    use crate::proof::MerkleTree;

    struct Order {
        hash: Hash32,
        secret_hashes: Vec<Hash32>,
        tree: MerkleTree,
        parts: u16,
    }

    impl Order {
        fn new(parts: u16) -> Self {
            let secret_hashes: Vec<Hash32> = (0..=parts)
                .map(|i| Hash32::digest(format!("fill-secret-{i}").as_bytes()))
                .collect();
            let tree = MerkleTree::build(&secret_hashes).unwrap();
            Self {
                hash: Hash32::digest(b"order-1"),
                secret_hashes,
                tree,
                parts,
            }
        }

        fn extension(&self) -> Vec<u8> {
            Extension::with_commitment(HashlockInfo::new(&self.tree.root(), self.parts)).encode()
        }

        fn taker_data(&self, index: usize) -> Vec<u8> {
            TakerData {
                index: index as u64,
                secret_hash: self.secret_hashes[index],
                proof: self.tree.proof(index).unwrap(),
            }
            .encode()
            .unwrap()
        }

        fn interaction(&self, index: usize) -> Message {
            self.interaction_with(self.extension(), self.taker_data(index))
        }

        fn interaction_with(&self, extension: Vec<u8>, extra_data: Vec<u8>) -> Message {
            Message::TakerInteraction {
                order: Vec::new(),
                extension,
                order_hash: self.hash,
                taker: Address::from_label("resolver"),
                making_amount: Decimal::new(25, 0),
                taking_amount: Decimal::new(50, 0),
                remaining_making_amount: Decimal::new(75, 0),
                extra_data,
            }
        }
    }

    fn trigger() -> Address {
        Address::from_label("order-protocol")
    }

    fn factory() -> Address {
        Address::from_label("factory")
    }

    fn invalidator() -> MerkleStorageInvalidator {
        MerkleStorageInvalidator::new(InvalidatorInit {
            trigger: trigger(),
            factory: Some(factory()),
        })
    }

    fn deliver(inv: &mut MerkleStorageInvalidator, from: Address, body: Message) -> Result<Vec<Effect>> {
        let env = Envelope {
            id: MessageId::new(),
            from,
            to: inv.address(),
            value: Decimal::ZERO,
            tokens: None,
            init: None,
            body,
        };
        let mut ctx = Context::new(inv.address(), Utc::now(), HashMap::new());
        inv.handle(&env, &mut ctx)?;
        Ok(ctx.into_effects())
    }

    #[test]
    fn valid_fill_is_accepted_and_reported() {
        let order = Order::new(4);
        let mut inv = invalidator();
        let effects = deliver(&mut inv, trigger(), order.interaction(1)).unwrap();
        assert_eq!(effects.len(), 2);
        assert!(matches!(
            &effects[0],
            Effect::Send { to, body: Message::TakerInteractionAccepted { index: 1, .. }, .. }
                if *to == trigger()
        ));
        assert!(matches!(
            &effects[1],
            Effect::Send { to, body: Message::ValidatedFill { index: 1, secret_hash, .. }, .. }
                if *to == factory() && *secret_hash == order.secret_hashes[1]
        ));
        assert!(inv.is_consumed(&order.hash, 1));
    }

    #[test]
    fn replayed_index_rejected() {
        let order = Order::new(4);
        let mut inv = invalidator();
        deliver(&mut inv, trigger(), order.interaction(2)).unwrap();
        let err = deliver(&mut inv, trigger(), order.interaction(2)).unwrap_err();
        assert!(matches!(err, CrossfillError::ReplayedIndex { index: 2, .. }));
        assert_eq!(err.kind(), ErrorKind::ReplayedIndex);
    }

    #[test]
    fn distinct_indices_share_one_commitment() {
        let order = Order::new(4);
        let mut inv = invalidator();
        for i in [0, 3, 4] {
            deliver(&mut inv, trigger(), order.interaction(i)).unwrap();
        }
        let c = inv.commitment(&order.hash).unwrap();
        assert_eq!(c.consumed.len(), 3);
        assert_eq!(c.last_validated, Some((4, order.secret_hashes[4])));
    }

    #[test]
    fn only_trigger_may_interact() {
        let order = Order::new(4);
        let mut inv = invalidator();
        let err = deliver(&mut inv, Address::from_label("mallory"), order.interaction(1)).unwrap_err();
        assert!(matches!(err, CrossfillError::Unauthorized { .. }));
        assert!(inv.commitment(&order.hash).is_none());
    }

    #[test]
    fn bad_proof_leaves_no_record() {
        let order = Order::new(4);
        let mut inv = invalidator();
        let forged = TakerData {
            index: 1,
            secret_hash: Hash32::digest(b"not-in-tree"),
            proof: order.tree.proof(1).unwrap(),
        }
        .encode()
        .unwrap();
        let err = deliver(&mut inv, trigger(), order.interaction_with(order.extension(), forged)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidProof);
        assert!(inv.commitment(&order.hash).is_none());
    }

    #[test]
    fn index_beyond_parts_rejected() {
        let order = Order::new(2);
        let mut inv = invalidator();
        // The tree has three leaves; index 3 would need a fourth.
        let data = TakerData {
            index: 3,
            secret_hash: order.secret_hashes[2],
            proof: order.tree.proof(2).unwrap(),
        }
        .encode()
        .unwrap();
        let err = deliver(&mut inv, trigger(), order.interaction_with(order.extension(), data)).unwrap_err();
        assert!(matches!(err, CrossfillError::InvalidProof { .. }));
    }

    #[test]
    fn single_part_order_rejected() {
        let order = Order::new(1);
        let mut inv = invalidator();
        let err = deliver(&mut inv, trigger(), order.interaction(0)).unwrap_err();
        assert!(matches!(err, CrossfillError::InvalidProof { .. }));
    }

    #[test]
    fn changed_commitment_rejected() {
        let order = Order::new(4);
        let mut inv = invalidator();
        deliver(&mut inv, trigger(), order.interaction(0)).unwrap();

        let other = Order {
            hash: order.hash,
            ..Order::new(3)
        };
        let err = deliver(&mut inv, trigger(), other.interaction(1)).unwrap_err();
        assert!(matches!(err, CrossfillError::InvalidProof { .. }));
    }

    #[test]
    fn malformed_extension_rejected() {
        let order = Order::new(4);
        let mut inv = invalidator();
        let err = deliver(&mut inv, trigger(), order.interaction_with(vec![0; 10], order.taker_data(0))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn without_factory_only_trigger_is_told() {
        let order = Order::new(4);
        let mut inv = MerkleStorageInvalidator::new(InvalidatorInit {
            trigger: trigger(),
            factory: None,
        });
        let effects = deliver(&mut inv, trigger(), order.interaction(1)).unwrap();
        assert_eq!(effects.len(), 1);
    }
}
