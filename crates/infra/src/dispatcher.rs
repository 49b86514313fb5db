//! Order command pipeline.
//!
//! ```text
//! Command
//!   ↓
//! 1. Load the order's event stream
//!   ↓
//! 2. Rehydrate (replay events onto `Order::empty`)
//!   ↓
//! 3. Handle (pure decision, produces events)
//!   ↓
//! 4. Append with an exact-version check
//!   ↓
//! 5. Publish envelopes to the bus
//! ```
//!
//! The store is the source of truth. A failed publish is logged and the
//! command still succeeds; subscribers must tolerate gaps as well as
//! duplicates.

use thiserror::Error;
use tracing::{debug, warn};

use nexus_core::{Aggregate, AggregateRoot, DomainError, ExpectedVersion};
use nexus_events::EventBus;
use nexus_orders::{Order, OrderCommand, OrderId};

use crate::order_store::{OrderEnvelope, OrderStore, OrderStoreError, StoredOrderEvent, rehydrate};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] OrderStoreError),
}

/// Result of a successful dispatch.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub order: Order,
    pub committed: Vec<StoredOrderEvent>,
}

#[derive(Debug)]
pub struct OrderDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> OrderDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<S, B> OrderDispatcher<S, B>
where
    S: OrderStore,
    B: EventBus<OrderEnvelope>,
{
    /// Run `command` against the current state of `order_id`.
    pub fn dispatch(&self, order_id: OrderId, command: OrderCommand) -> Result<Dispatched, DispatchError> {
        let history = self.store.load_stream(order_id)?;
        let expected = match history.last() {
            Some(last) => ExpectedVersion::Exact(last.sequence_number),
            None => ExpectedVersion::NoStream,
        };
        let aggregate = rehydrate(order_id, &history);

        let (order, decided) = aggregate.execute(&command)?;
        if decided.is_empty() {
            return Ok(Dispatched {
                order,
                committed: vec![],
            });
        }

        let committed = self.store.append(order_id, decided, expected)?;
        debug!(order_id = %order_id, version = order.version(), events = committed.len(), "order events committed");

        self.publish(&committed);
        Ok(Dispatched { order, committed })
    }

    fn publish(&self, committed: &[StoredOrderEvent]) {
        for stored in committed {
            let envelope = match stored.to_envelope() {
                Ok(envelope) => envelope,
                Err(err) => {
                    warn!(order_id = %stored.order_id, error = %err, "order event not serializable; skipped publish");
                    continue;
                }
            };
            if let Err(err) = self.bus.publish(envelope) {
                warn!(order_id = %stored.order_id, sequence = stored.sequence_number, error = ?err, "order event publish failed");
            }
        }
    }
}
