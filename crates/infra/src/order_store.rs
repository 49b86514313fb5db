//! Append-only order streams.
//!
//! Orders are event-sourced: the store keeps every `OrderEvent` per order and
//! the current state is rebuilt by replaying them. Sequence numbers start at 1
//! and equal the aggregate version after the event is applied.

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use nexus_core::{Aggregate, ExpectedVersion};
use nexus_events::EventEnvelope;
use nexus_orders::{Order, OrderEvent, OrderId};

pub const ORDER_AGGREGATE_TYPE: &str = "marketplace.order";

/// Envelope type published on the bus for every committed order event.
pub type OrderEnvelope = EventEnvelope<JsonValue>;

/// An order event after it was appended (assigned a sequence number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOrderEvent {
    pub event_id: Uuid,
    pub order_id: OrderId,
    pub sequence_number: u64,
    pub event: OrderEvent,
}

impl StoredOrderEvent {
    pub fn to_envelope(&self) -> Result<OrderEnvelope, serde_json::Error> {
        EventEnvelope::from_typed(
            self.event_id,
            self.order_id.0,
            ORDER_AGGREGATE_TYPE,
            self.sequence_number,
            &self.event,
        )
    }
}

#[derive(Debug, Error)]
pub enum OrderStoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("order store lock poisoned")]
    Poisoned,
}

/// Storage for order event streams.
pub trait OrderStore: Send + Sync {
    /// Append `events` to the order's stream if its version matches `expected`.
    fn append(
        &self,
        order_id: OrderId,
        events: Vec<OrderEvent>,
        expected: ExpectedVersion,
    ) -> Result<Vec<StoredOrderEvent>, OrderStoreError>;

    /// Events of one order in sequence order; empty when the order is unknown.
    fn load_stream(&self, order_id: OrderId) -> Result<Vec<StoredOrderEvent>, OrderStoreError>;

    fn order_ids(&self) -> Result<Vec<OrderId>, OrderStoreError>;

    /// Rebuild the current state of one order.
    fn load_order(&self, order_id: OrderId) -> Result<Option<Order>, OrderStoreError> {
        let stream = self.load_stream(order_id)?;
        if stream.is_empty() {
            return Ok(None);
        }
        Ok(Some(rehydrate(order_id, &stream)))
    }

    /// Every order in id order (v7 ids sort by creation time).
    fn all_orders(&self) -> Result<Vec<Order>, OrderStoreError> {
        let mut orders = Vec::new();
        for id in self.order_ids()? {
            if let Some(order) = self.load_order(id)? {
                orders.push(order);
            }
        }
        Ok(orders)
    }
}

pub(crate) fn rehydrate(order_id: OrderId, stream: &[StoredOrderEvent]) -> Order {
    let mut order = Order::empty(order_id);
    for stored in stream {
        order.apply(&stored.event);
    }
    order
}

/// In-memory order store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    streams: RwLock<BTreeMap<OrderId, Vec<StoredOrderEvent>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderStore for InMemoryOrderStore {
    fn append(
        &self,
        order_id: OrderId,
        events: Vec<OrderEvent>,
        expected: ExpectedVersion,
    ) -> Result<Vec<StoredOrderEvent>, OrderStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        let mut streams = self.streams.write().map_err(|_| OrderStoreError::Poisoned)?;
        let current = streams
            .get(&order_id)
            .and_then(|s| s.last())
            .map(|e| e.sequence_number);

        if !expected.matches(current) {
            return Err(OrderStoreError::Concurrency(format!(
                "order {order_id}: expected {expected:?}, found {current:?}"
            )));
        }

        let stream = streams.entry(order_id).or_default();
        let mut next = current.unwrap_or(0) + 1;
        let mut committed = Vec::with_capacity(events.len());
        for event in events {
            let stored = StoredOrderEvent {
                event_id: Uuid::now_v7(),
                order_id,
                sequence_number: next,
                event,
            };
            next += 1;
            stream.push(stored.clone());
            committed.push(stored);
        }

        Ok(committed)
    }

    fn load_stream(&self, order_id: OrderId) -> Result<Vec<StoredOrderEvent>, OrderStoreError> {
        let streams = self.streams.read().map_err(|_| OrderStoreError::Poisoned)?;
        Ok(streams.get(&order_id).cloned().unwrap_or_default())
    }

    fn order_ids(&self) -> Result<Vec<OrderId>, OrderStoreError> {
        let streams = self.streams.read().map_err(|_| OrderStoreError::Poisoned)?;
        Ok(streams.keys().copied().collect())
    }
}
