//! Redelivery guard for credit and balance mutations.
//!
//! Delivery is at least once, so any message that moves a deposit, a
//! credit line or a fee total can arrive twice. Actors record each
//! mutating delivery as an `(opcode, envelope id)` pair; a second delivery
//! of the same pair fails with [`CrossfillError::DuplicateDelivery`] naming
//! the message kind. Query and acknowledgement traffic is not recorded.
//!
//! The record is a bounded FIFO so long-lived state stays small, and it is
//! part of the actor state, so it survives restarts and rolls back with a
//! failed handler.

use std::collections::{HashSet, VecDeque};

use crossfill_types::{CrossfillError, Envelope, MessageId, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
struct Delivery {
    opcode: u32,
    id: MessageId,
}

impl Delivery {
    fn of(env: &Envelope) -> Self {
        Self {
            opcode: env.body.opcode(),
            id: env.id,
        }
    }
}

/// Bounded set of processed deliveries with oldest-first eviction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryGuard {
    seen: HashSet<Delivery>,
    /// Front is oldest.
    order: VecDeque<Delivery>,
    max_size: usize,
}

impl DeliveryGuard {
    /// Create a guard remembering up to `max_size` deliveries.
    ///
    /// # Panics
    /// Panics if `max_size` is zero.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        assert!(max_size > 0, "DeliveryGuard max_size must be > 0");
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            max_size,
        }
    }

    /// Record `env` as processed, failing if this kind of message with this
    /// envelope id already was.
    pub fn check_and_record(&mut self, env: &Envelope) -> Result<()> {
        let delivery = Delivery::of(env);
        if self.seen.contains(&delivery) {
            tracing::warn!(
                message = env.body.name(),
                id = %env.id,
                from = %env.from,
                "Redelivered mutation refused"
            );
            return Err(CrossfillError::DuplicateDelivery {
                message: env.body.name(),
                id: env.id,
            });
        }

        if self.seen.len() >= self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }

        self.seen.insert(delivery);
        self.order.push_back(delivery);
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, env: &Envelope) -> bool {
        self.seen.contains(&Delivery::of(env))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for DeliveryGuard {
    fn default() -> Self {
        Self::new(crossfill_types::constants::IDEMPOTENCY_CACHE_SIZE)
    }
}
