//! Checkout: turns a buyer's cart into a paid, pending order.
//!
//! ```text
//! lock cart ─→ authorize payment ─→ deduct stock ─→ place order ─→ clear cart
//!     │              │                    │               │
//!     │        cancel/timeout/      InsufficientStock   store error
//!     │          Declined           (void payment)    (restore stock,
//!     │    (abandon the attempt)                       void payment)
//!  CheckoutInProgress
//! ```
//!
//! The catalog write lock serializes stock deduction across buyers, so two
//! checkouts racing for the last unit cannot both commit.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use nexus_catalog::{CatalogStore, StockDeduction};
use nexus_core::{Clock, DomainError, IdGenerator, UserId};
use nexus_events::EventBus;
use nexus_orders::{Order, OrderCommand, OrderId, OrderItem, PlaceOrder};

use crate::cart_registry::CartSession;
use crate::dispatcher::{DispatchError, OrderDispatcher};
use crate::order_store::{OrderEnvelope, OrderStore};
use crate::payment::{PaymentGateway, PaymentOutcome, PaymentReceipt};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("payment declined: {0}")]
    Declined(String),

    #[error("a checkout is already in progress for this cart")]
    CheckoutInProgress,

    #[error("checkout cancelled")]
    Cancelled,

    #[error("payment not confirmed within {0:?}")]
    PaymentTimeout(Duration),

    #[error("order could not be stored: {0}")]
    Store(String),
}

impl From<DispatchError> for CheckoutError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::Domain(e) => CheckoutError::Domain(e),
            DispatchError::Store(e) => CheckoutError::Store(e.to_string()),
        }
    }
}

#[derive(Debug)]
pub struct CheckoutOrchestrator<S, B> {
    catalog: Arc<CatalogStore>,
    dispatcher: Arc<OrderDispatcher<S, B>>,
    gateway: Arc<dyn PaymentGateway>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    payment_timeout: Duration,
}

impl<S, B> CheckoutOrchestrator<S, B>
where
    S: OrderStore,
    B: EventBus<OrderEnvelope>,
{
    pub fn new(
        catalog: Arc<CatalogStore>,
        dispatcher: Arc<OrderDispatcher<S, B>>,
        gateway: Arc<dyn PaymentGateway>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        payment_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            dispatcher,
            gateway,
            ids,
            clock,
            payment_timeout,
        }
    }

    /// Check out `session`'s cart.
    ///
    /// Cancelling `cancel` while payment is pending abandons the checkout with
    /// stock, cart and orders untouched.
    pub async fn checkout(&self, session: &CartSession, cancel: CancellationToken) -> Result<Order, CheckoutError> {
        let lock = session
            .try_begin_checkout()
            .ok_or(CheckoutError::CheckoutInProgress)?;

        let cart = lock.cart();
        if cart.is_empty() {
            return Err(DomainError::EmptyCart.into());
        }
        let buyer_id = cart.buyer_id();
        let amount = cart.total();
        info!(buyer_id = %buyer_id, amount, lines = cart.lines().len(), "checkout started");

        let receipt = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(buyer_id = %buyer_id, "checkout cancelled during payment");
                self.gateway.abandon(buyer_id, amount).await;
                return Err(CheckoutError::Cancelled);
            }
            outcome = tokio::time::timeout(self.payment_timeout, self.gateway.authorize(buyer_id, amount)) => {
                match outcome {
                    Err(_) => {
                        warn!(buyer_id = %buyer_id, timeout = ?self.payment_timeout, "payment timed out");
                        self.gateway.abandon(buyer_id, amount).await;
                        return Err(CheckoutError::PaymentTimeout(self.payment_timeout));
                    }
                    Ok(PaymentOutcome::Declined(reason)) => {
                        warn!(buyer_id = %buyer_id, amount, reason = %reason, "payment declined");
                        return Err(CheckoutError::Declined(reason));
                    }
                    Ok(PaymentOutcome::Paid(receipt)) => receipt,
                }
            }
        };

        let items: Vec<OrderItem> = cart
            .lines()
            .iter()
            .map(|line| OrderItem {
                product_id: line.product_id(),
                product_name: line.product().name().to_string(),
                unit_price: line.product().price(),
                quantity: line.quantity(),
                seller_id: line.product().seller_id(),
            })
            .collect();
        let deductions: Vec<StockDeduction> = items
            .iter()
            .map(|i| StockDeduction {
                product_id: i.product_id,
                quantity: i.quantity,
            })
            .collect();

        if let Err(err) = self.catalog.deduct_all(&deductions) {
            warn!(buyer_id = %buyer_id, error = %err, "stock deduction failed after payment");
            self.gateway.void(&receipt).await;
            return Err(err.into());
        }

        let order = match self.place(buyer_id, items, &receipt) {
            Ok(order) => order,
            Err(err) => {
                self.catalog.restore_all(&deductions);
                self.gateway.void(&receipt).await;
                return Err(err);
            }
        };

        lock.clear_cart();
        info!(
            order_id = %order.id_typed(),
            reference = %order.id_typed().reference(),
            buyer_id = %buyer_id,
            total = order.total(),
            "order placed"
        );
        Ok(order)
    }

    fn place(
        &self,
        buyer_id: UserId,
        items: Vec<OrderItem>,
        receipt: &PaymentReceipt,
    ) -> Result<Order, CheckoutError> {
        let order_id = OrderId::new(self.ids.next_id());
        let command = OrderCommand::PlaceOrder(PlaceOrder {
            order_id,
            buyer_id,
            items,
            payment_reference: receipt.reference.clone(),
            occurred_at: self.clock.now(),
        });
        Ok(self.dispatcher.dispatch(order_id, command)?.order)
    }
}
