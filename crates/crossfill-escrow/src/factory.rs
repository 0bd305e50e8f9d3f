//! Deterministic escrow factory.
//!
//! The factory turns swap parameters into escrow instances. An escrow's
//! address is derived from its immutables, the factory and the rescuer, so
//! clients can predict it, and a second creation request with identical
//! parameters tops up the same instance instead of creating a new one.
//!
//! The factory also records fills that the Merkle invalidator has
//! validated. A source escrow created for one part of a multi-part order
//! must reference such a fill, and each validated fill is charged to the
//! taker's fee credit when a fill fee is configured.

use std::collections::BTreeMap;

use crossfill_types::{
    Actor, ActorInit, Address, Context, CrossfillError, Envelope, EscrowImmutables, EscrowInit,
    FactoryInit, FillRef, Hash32, InvalidatorInit, Message, Result, Side, checked_product,
    checked_sum,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Spawns and funds escrows; tracks Merkle-validated fills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowFactory {
    init: FactoryInit,
    address: Address,
    /// order hash → fill index → secret hash.
    validated_fills: BTreeMap<Hash32, BTreeMap<u64, Hash32>>,
    escrows_created: u64,
}

impl EscrowFactory {
    #[must_use]
    pub fn new(init: FactoryInit) -> Self {
        let address = ActorInit::EscrowFactory(init.clone()).address();
        Self {
            init,
            address,
            validated_fills: BTreeMap::new(),
            escrows_created: 0,
        }
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub fn owner(&self) -> Address {
        self.init.owner
    }

    /// Address of the Merkle invalidator whose fill reports this factory
    /// accepts.
    #[must_use]
    pub fn invalidator_address(&self) -> Address {
        InvalidatorInit {
            trigger: self.init.trigger,
            factory: Some(self.address),
        }
        .address()
    }

    fn escrow_init(&self, immutables: &EscrowImmutables) -> EscrowInit {
        EscrowInit {
            immutables: immutables.clone(),
            factory: self.address,
            rescuer: self.init.owner,
        }
    }

    /// Predicted address of the source escrow for `immutables`.
    pub fn src_address(&self, immutables: &EscrowImmutables) -> Result<Address> {
        expect_side(immutables, Side::Src)?;
        Ok(self.escrow_init(immutables).address())
    }

    /// Predicted address of the destination escrow for `immutables`.
    pub fn dst_address(&self, immutables: &EscrowImmutables) -> Result<Address> {
        expect_side(immutables, Side::Dst)?;
        Ok(self.escrow_init(immutables).address())
    }

    #[must_use]
    pub fn escrows_created(&self) -> u64 {
        self.escrows_created
    }

    /// Secret hash validated for part `index` of `order_hash`, if any.
    #[must_use]
    pub fn validated_fill(&self, order_hash: &Hash32, index: u64) -> Option<Hash32> {
        self.validated_fills
            .get(order_hash)
            .and_then(|fills| fills.get(&index))
            .copied()
    }

    // -----------------------------------------------------------------------
    // Handlers
    // -----------------------------------------------------------------------

    fn create(
        &mut self,
        env: &Envelope,
        ctx: &mut Context,
        immutables: &EscrowImmutables,
        side: Side,
        fill: Option<FillRef>,
    ) -> Result<()> {
        if side == Side::Src && env.from != self.init.trigger {
            return Err(CrossfillError::Unauthorized {
                role: "order trigger",
                sender: env.from,
            });
        }
        expect_side(immutables, side)?;
        immutables.validate()?;
        self.check_attached_value(env, immutables)?;
        if let Some(fill) = fill {
            self.check_fill(immutables, fill)?;
        }

        let escrow = ctx.deploy(
            ActorInit::Escrow(self.escrow_init(immutables)),
            env.value,
            env.tokens,
            Message::FundEscrow,
        );
        self.escrows_created += 1;
        tracing::info!(
            factory = %self.address,
            escrow = %escrow,
            side = %side,
            order = %immutables.order_hash,
            maker = %immutables.maker,
            taker = %immutables.taker,
            amount = %immutables.amount,
            "Escrow creation forwarded"
        );
        Ok(())
    }

    /// Attached value must cover amount, safety deposit and the operating
    /// reserve. The deposit and reserve are native even for token legs.
    fn check_attached_value(&self, env: &Envelope, immutables: &EscrowImmutables) -> Result<()> {
        let mut native_needed =
            checked_sum(immutables.safety_deposit, self.init.config.min_operating_reserve)?;
        if immutables.asset.is_native() {
            native_needed = checked_sum(native_needed, immutables.amount)?;
        } else {
            let attached = env.attached(&immutables.asset);
            if attached < immutables.amount {
                return Err(CrossfillError::InsufficientValue {
                    needed: immutables.amount,
                    attached,
                });
            }
        }
        if env.value < native_needed {
            return Err(CrossfillError::InsufficientValue {
                needed: native_needed,
                attached: env.value,
            });
        }
        Ok(())
    }

    fn check_fill(&self, immutables: &EscrowImmutables, fill: FillRef) -> Result<()> {
        let unknown = || CrossfillError::UnknownFill {
            order_hash: fill.order_hash,
            index: fill.index,
        };
        if fill.order_hash != immutables.order_hash {
            return Err(unknown());
        }
        match self.validated_fill(&fill.order_hash, fill.index) {
            Some(secret_hash) if secret_hash == immutables.hashlock => Ok(()),
            Some(_) => Err(CrossfillError::InvalidProof {
                reason: format!(
                    "fill {} of order {} was validated for a different secret",
                    fill.index, fill.order_hash
                ),
            }),
            None => Err(unknown()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn record_fill(
        &mut self,
        env: &Envelope,
        ctx: &mut Context,
        order_hash: Hash32,
        index: u64,
        secret_hash: Hash32,
        taker: Address,
        making_amount: Decimal,
    ) -> Result<()> {
        if env.from != self.invalidator_address() {
            return Err(CrossfillError::Unauthorized {
                role: "merkle invalidator",
                sender: env.from,
            });
        }
        let fee = checked_product(making_amount, self.init.config.fill_fee_rate)?;
        let fills = self.validated_fills.entry(order_hash).or_default();
        if fills.contains_key(&index) {
            return Err(CrossfillError::ReplayedIndex { order_hash, index });
        }
        fills.insert(index, secret_hash);

        if let Some(bank) = self.init.fee_bank {
            if fee > Decimal::ZERO {
                ctx.send(bank, Message::ChargeFee { account: taker, fee });
            }
        }
        tracing::info!(
            factory = %self.address,
            order = %order_hash,
            index,
            taker = %taker,
            fee = %fee,
            "Validated fill recorded"
        );
        Ok(())
    }
}

fn expect_side(immutables: &EscrowImmutables, side: Side) -> Result<()> {
    if immutables.side() == side {
        Ok(())
    } else {
        Err(CrossfillError::InvalidTimelocks {
            reason: format!("{side} escrow needs {side} timelocks"),
        })
    }
}

impl Actor for EscrowFactory {
    fn kind(&self) -> &'static str {
        "escrow factory"
    }

    fn handle(&mut self, env: &Envelope, ctx: &mut Context) -> Result<()> {
        match &env.body {
            Message::Deploy => Ok(()),
            Message::CreateEscrowSrc { immutables, fill } => {
                self.create(env, ctx, immutables, Side::Src, *fill)
            }
            Message::CreateEscrowDst { immutables } => {
                self.create(env, ctx, immutables, Side::Dst, None)
            }
            Message::AddressQuery { immutables } => {
                let address = match immutables.side() {
                    Side::Src => self.src_address(immutables)?,
                    Side::Dst => self.dst_address(immutables)?,
                };
                ctx.send(
                    env.from,
                    Message::AddressResp {
                        immutables: immutables.clone(),
                        address,
                    },
                );
                Ok(())
            }
            Message::ValidatedFill {
                order_hash,
                index,
                secret_hash,
                taker,
                making_amount,
            } => self.record_fill(
                env,
                ctx,
                *order_hash,
                *index,
                *secret_hash,
                *taker,
                *making_amount,
            ),
            other => Err(CrossfillError::UnexpectedMessage {
                actor: self.kind(),
                message: other.name(),
            }),
        }
    }
}
