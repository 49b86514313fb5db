//! Binds a carrier to a paid order.

use std::sync::Arc;

use tracing::info;

use nexus_core::{Clock, IdGenerator};
use nexus_events::EventBus;
use nexus_orders::{AssignLogistics, LogisticsPartner, Order, OrderCommand, OrderId, TrackingId};

use crate::dispatcher::{DispatchError, OrderDispatcher};
use crate::order_store::{OrderEnvelope, OrderStore};

#[derive(Debug)]
pub struct LogisticsAssigner<S, B> {
    dispatcher: Arc<OrderDispatcher<S, B>>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    delivery_offset: chrono::Duration,
}

impl<S, B> LogisticsAssigner<S, B>
where
    S: OrderStore,
    B: EventBus<OrderEnvelope>,
{
    pub fn new(
        dispatcher: Arc<OrderDispatcher<S, B>>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        delivery_offset: chrono::Duration,
    ) -> Self {
        Self {
            dispatcher,
            ids,
            clock,
            delivery_offset,
        }
    }

    /// Assign `partner` once. Later calls fail with `AlreadyAssigned` and keep
    /// the first tracking id.
    pub fn assign(&self, order_id: OrderId, partner: LogisticsPartner) -> Result<Order, DispatchError> {
        let now = self.clock.now();
        let tracking_id = TrackingId::for_partner(partner, self.ids.next_id());
        let command = OrderCommand::AssignLogistics(AssignLogistics {
            order_id,
            partner,
            tracking_id: tracking_id.clone(),
            estimated_delivery: now + self.delivery_offset,
            occurred_at: now,
        });

        let order = self.dispatcher.dispatch(order_id, command)?.order;
        info!(
            order_id = %order_id,
            partner = %partner,
            tracking_id = %tracking_id,
            status = %order.status(),
            "logistics assigned"
        );
        Ok(order)
    }
}
