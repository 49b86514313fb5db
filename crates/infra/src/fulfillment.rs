//! Lifecycle transitions requested by sellers, carriers, buyers and the admin.

use std::sync::Arc;

use tracing::info;

use nexus_catalog::{CatalogStore, StockDeduction};
use nexus_core::Clock;
use nexus_events::EventBus;
use nexus_orders::{Actor, ChangeStatus, Order, OrderCommand, OrderEvent, OrderId, OrderStatus};

use crate::dispatcher::{DispatchError, OrderDispatcher};
use crate::order_store::{OrderEnvelope, OrderStore};

#[derive(Debug)]
pub struct FulfillmentService<S, B> {
    catalog: Arc<CatalogStore>,
    dispatcher: Arc<OrderDispatcher<S, B>>,
    clock: Arc<dyn Clock>,
}

impl<S, B> FulfillmentService<S, B>
where
    S: OrderStore,
    B: EventBus<OrderEnvelope>,
{
    pub fn new(catalog: Arc<CatalogStore>, dispatcher: Arc<OrderDispatcher<S, B>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog,
            dispatcher,
            clock,
        }
    }

    /// Move `order_id` to `to` on behalf of `actor`.
    ///
    /// A refunded cancellation puts the purchased units back on the shelf.
    pub fn change_status(&self, order_id: OrderId, actor: Actor, to: OrderStatus) -> Result<Order, DispatchError> {
        let command = OrderCommand::ChangeStatus(ChangeStatus {
            order_id,
            actor,
            to,
            occurred_at: self.clock.now(),
        });
        let dispatched = self.dispatcher.dispatch(order_id, command)?;

        let refunded = dispatched
            .committed
            .iter()
            .any(|e| matches!(e.event, OrderEvent::PaymentRefunded(_)));
        if refunded {
            let returned: Vec<StockDeduction> = dispatched
                .order
                .items()
                .iter()
                .map(|i| StockDeduction {
                    product_id: i.product_id,
                    quantity: i.quantity,
                })
                .collect();
            self.catalog.restore_all(&returned);
            info!(order_id = %order_id, amount = dispatched.order.total(), "order refunded and restocked");
        }

        info!(order_id = %order_id, actor = ?actor, status = %to, "order status changed");
        Ok(dispatched.order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nexus_catalog::{Category, NewProduct};
    use nexus_core::{DomainError, SystemClock, UserId, UuidV7Generator};
    use nexus_events::InMemoryEventBus;
    use nexus_orders::{OrderItem, PaymentStatus, PlaceOrder};

    use crate::order_store::InMemoryOrderStore;

    fn setup() -> (
        FulfillmentService<InMemoryOrderStore, InMemoryEventBus<OrderEnvelope>>,
        Arc<CatalogStore>,
        Arc<OrderDispatcher<InMemoryOrderStore, InMemoryEventBus<OrderEnvelope>>>,
    ) {
        let catalog = Arc::new(CatalogStore::new());
        let dispatcher = Arc::new(OrderDispatcher::new(InMemoryOrderStore::new(), InMemoryEventBus::new()));
        let service = FulfillmentService::new(Arc::clone(&catalog), Arc::clone(&dispatcher), Arc::new(SystemClock));
        (service, catalog, dispatcher)
    }

    fn place_order(
        catalog: &CatalogStore,
        dispatcher: &OrderDispatcher<InMemoryOrderStore, InMemoryEventBus<OrderEnvelope>>,
        buyer_id: UserId,
        seller_id: UserId,
    ) -> (OrderId, nexus_catalog::ProductId) {
        let product = catalog
            .add_product(
                &UuidV7Generator,
                seller_id,
                NewProduct {
                    name: "Trench Coat".to_string(),
                    brand: "Nexus".to_string(),
                    category: Category::Women,
                    description: String::new(),
                    price: 4000,
                    stock: 5,
                },
            )
            .unwrap();
        catalog
            .deduct_all(&[StockDeduction {
                product_id: product.id_typed(),
                quantity: 2,
            }])
            .unwrap();

        let order_id = OrderId::new(nexus_core::AggregateId::new());
        dispatcher
            .dispatch(
                order_id,
                OrderCommand::PlaceOrder(PlaceOrder {
                    order_id,
                    buyer_id,
                    items: vec![OrderItem {
                        product_id: product.id_typed(),
                        product_name: product.name().to_string(),
                        unit_price: 4000,
                        quantity: 2,
                        seller_id,
                    }],
                    payment_reference: "pay_x".to_string(),
                    occurred_at: Utc::now(),
                }),
            )
            .unwrap();
        (order_id, product.id_typed())
    }

    #[test]
    fn buyer_cancellation_refunds_and_restocks() {
        let (service, catalog, dispatcher) = setup();
        let buyer = UserId::new();
        let (order_id, product_id) = place_order(&catalog, &dispatcher, buyer, UserId::new());
        assert_eq!(catalog.get(&product_id).unwrap().stock(), 3);

        let order = service
            .change_status(order_id, Actor::Buyer(buyer), OrderStatus::Cancelled)
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.payment_status(), PaymentStatus::Refunded);
        assert_eq!(catalog.get(&product_id).unwrap().stock(), 5);
    }

    #[test]
    fn delivered_order_rejects_cancellation() {
        let (service, catalog, dispatcher) = setup();
        let buyer = UserId::new();
        let seller = UserId::new();
        let (order_id, product_id) = place_order(&catalog, &dispatcher, buyer, seller);

        service.change_status(order_id, Actor::Seller(seller), OrderStatus::Processing).unwrap();
        service.change_status(order_id, Actor::Seller(seller), OrderStatus::Shipped).unwrap();
        service.change_status(order_id, Actor::Carrier, OrderStatus::OutForDelivery).unwrap();
        service.change_status(order_id, Actor::Carrier, OrderStatus::Delivered).unwrap();

        let err = service
            .change_status(order_id, Actor::Buyer(buyer), OrderStatus::Cancelled)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Domain(DomainError::InvalidTransition(_))));

        let stored = dispatcher.store().load_order(order_id).unwrap().unwrap();
        assert_eq!(stored.status(), OrderStatus::Delivered);
        assert_eq!(catalog.get(&product_id).unwrap().stock(), 3);
    }

    #[test]
    fn unknown_order_is_not_found() {
        let (service, _, _) = setup();
        let err = service
            .change_status(OrderId::new(nexus_core::AggregateId::new()), Actor::Admin, OrderStatus::Processing)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Domain(DomainError::NotFound(_))));
    }
}
