use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nexus_catalog::ProductId;
use nexus_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId, ValueObject};
use nexus_events::Event;

use crate::logistics::{LogisticsPartner, Shipment, TrackingId};

/// Order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub AggregateId);

impl OrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    /// Short human reference shown to buyers, e.g. `ORD-0000002A`.
    pub fn reference(&self) -> String {
        let hex = self.0.as_uuid().simple().to_string().to_uppercase();
        format!("ORD-{}", &hex[hex.len() - 8..])
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Fulfillment lifecycle.
///
/// ```text
/// PENDING → PROCESSING → SHIPPED → OUT_FOR_DELIVERY → DELIVERED
///    └──────────┴───────────┴──────────┴──→ CANCELLED | RETURN_REQUESTED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
    ReturnRequested,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Position on the forward path; side branches have none.
    fn progress(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Processing => Some(1),
            OrderStatus::Shipped => Some(2),
            OrderStatus::OutForDelivery => Some(3),
            OrderStatus::Delivered => Some(4),
            OrderStatus::Cancelled | OrderStatus::ReturnRequested => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::ReturnRequested => "RETURN_REQUESTED",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment state, orthogonal to fulfillment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
    Failed,
}

/// Who is asking for a transition. Identity is asserted by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "user_id", rename_all = "lowercase")]
pub enum Actor {
    Buyer(UserId),
    Seller(UserId),
    Admin,
    Carrier,
}

/// Immutable purchase-time snapshot of one cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    /// Unit price in smallest currency unit, as charged.
    pub unit_price: u64,
    pub quantity: u32,
    pub seller_id: UserId,
}

impl OrderItem {
    /// Placement rejects any order whose line subtotals or total overflow, so
    /// this only saturates for hand-built items.
    pub fn subtotal(&self) -> u64 {
        self.checked_subtotal().unwrap_or(u64::MAX)
    }

    pub fn checked_subtotal(&self) -> Option<u64> {
        self.unit_price.checked_mul(u64::from(self.quantity))
    }
}

impl ValueObject for OrderItem {}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    buyer_id: Option<UserId>,
    items: Vec<OrderItem>,
    total: u64,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_reference: Option<String>,
    placed_at: Option<DateTime<Utc>>,
    shipment: Option<Shipment>,
    version: u64,
    created: bool,
}

impl Order {
    /// Create an empty, not-yet-placed aggregate instance.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            buyer_id: None,
            items: Vec::new(),
            total: 0,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            payment_reference: None,
            placed_at: None,
            shipment: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn buyer_id(&self) -> Option<UserId> {
        self.buyer_id
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Fixed at placement; later catalog edits never change it.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn payment_reference(&self) -> Option<&str> {
        self.payment_reference.as_deref()
    }

    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        self.placed_at
    }

    pub fn shipment(&self) -> Option<&Shipment> {
        self.shipment.as_ref()
    }

    pub fn logistics_partner(&self) -> Option<LogisticsPartner> {
        self.shipment.as_ref().map(|s| s.partner)
    }

    pub fn tracking_id(&self) -> Option<&TrackingId> {
        self.shipment.as_ref().map(|s| &s.tracking_id)
    }

    pub fn estimated_delivery(&self) -> Option<DateTime<Utc>> {
        self.shipment.as_ref().map(|s| s.estimated_delivery)
    }

    pub fn is_placed(&self) -> bool {
        self.created
    }

    pub fn has_seller(&self, seller_id: UserId) -> bool {
        self.items.iter().any(|i| i.seller_id == seller_id)
    }

    /// Gross value of the lines a seller owns in this order.
    pub fn seller_subtotal(&self, seller_id: UserId) -> u64 {
        self.items
            .iter()
            .filter(|i| i.seller_id == seller_id)
            .fold(0u64, |acc, i| acc.saturating_add(i.subtotal()))
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceOrder (issued by checkout after payment succeeded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub buyer_id: UserId,
    pub items: Vec<OrderItem>,
    pub payment_reference: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub order_id: OrderId,
    pub actor: Actor,
    pub to: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignLogistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignLogistics {
    pub order_id: OrderId,
    pub partner: LogisticsPartner,
    pub tracking_id: TrackingId,
    pub estimated_delivery: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    PlaceOrder(PlaceOrder),
    ChangeStatus(ChangeStatus),
    AssignLogistics(AssignLogistics),
}

/// Event: OrderPlaced (status PENDING, payment PAID).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub buyer_id: UserId,
    pub items: Vec<OrderItem>,
    pub total: u64,
    pub payment_reference: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentRefunded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRefunded {
    pub order_id: OrderId,
    pub amount: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LogisticsAssigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogisticsAssigned {
    pub order_id: OrderId,
    pub shipment: Shipment,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    StatusChanged(StatusChanged),
    PaymentRefunded(PaymentRefunded),
    LogisticsAssigned(LogisticsAssigned),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "marketplace.order.placed",
            OrderEvent::StatusChanged(_) => "marketplace.order.status_changed",
            OrderEvent::PaymentRefunded(_) => "marketplace.order.payment_refunded",
            OrderEvent::LogisticsAssigned(_) => "marketplace.order.logistics_assigned",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(e) => e.occurred_at,
            OrderEvent::StatusChanged(e) => e.occurred_at,
            OrderEvent::PaymentRefunded(e) => e.occurred_at,
            OrderEvent::LogisticsAssigned(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                self.id = e.order_id;
                self.buyer_id = Some(e.buyer_id);
                self.items = e.items.clone();
                self.total = e.total;
                self.status = OrderStatus::Pending;
                self.payment_status = PaymentStatus::Paid;
                self.payment_reference = Some(e.payment_reference.clone());
                self.placed_at = Some(e.occurred_at);
                self.created = true;
            }
            OrderEvent::StatusChanged(e) => {
                self.status = e.to;
            }
            OrderEvent::PaymentRefunded(_) => {
                self.payment_status = PaymentStatus::Refunded;
            }
            OrderEvent::LogisticsAssigned(e) => {
                self.shipment = Some(e.shipment.clone());
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            OrderCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
            OrderCommand::AssignLogistics(cmd) => self.handle_assign_logistics(cmd),
        }
    }
}

impl Order {
    fn ensure_placed(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("order {}", self.id)));
        }
        Ok(())
    }

    fn ensure_order_id(&self, order_id: OrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::validation("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("order already exists"));
        }
        self.ensure_order_id(cmd.order_id)?;

        if cmd.items.is_empty() {
            return Err(DomainError::EmptyCart);
        }
        if cmd.items.iter().any(|i| i.quantity == 0) {
            return Err(DomainError::validation("item quantity must be positive"));
        }
        if cmd.payment_reference.trim().is_empty() {
            return Err(DomainError::validation("payment reference is required"));
        }

        let total = cmd
            .items
            .iter()
            .try_fold(0u64, |acc, i| acc.checked_add(i.checked_subtotal()?))
            .ok_or_else(|| DomainError::validation("order total exceeds the largest payable amount"))?;

        Ok(vec![OrderEvent::OrderPlaced(OrderPlaced {
            order_id: cmd.order_id,
            buyer_id: cmd.buyer_id,
            items: cmd.items.clone(),
            total,
            payment_reference: cmd.payment_reference.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(&self, cmd: &ChangeStatus) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_placed()?;
        self.ensure_order_id(cmd.order_id)?;

        let from = self.status;
        let to = cmd.to;
        if from.is_terminal() || from == to || !self.is_reachable(to) {
            return Err(DomainError::invalid_transition(from, to));
        }
        self.ensure_actor_may_move_to(cmd.actor, to)?;

        let mut events = vec![OrderEvent::StatusChanged(StatusChanged {
            order_id: cmd.order_id,
            from,
            to,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })];

        if to == OrderStatus::Cancelled && self.payment_status == PaymentStatus::Paid {
            events.push(OrderEvent::PaymentRefunded(PaymentRefunded {
                order_id: cmd.order_id,
                amount: self.total,
                occurred_at: cmd.occurred_at,
            }));
        }

        Ok(events)
    }

    /// Lifecycle graph, ignoring who asks.
    fn is_reachable(&self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self.status, to) {
            (_, Pending) => false,
            (Pending, Processing) => true,
            (Pending | Processing, Shipped) => true,
            (Shipped, OutForDelivery) => true,
            (OutForDelivery, Delivered) => true,
            (_, Cancelled) | (_, ReturnRequested) => !self.status.is_terminal(),
            _ => false,
        }
    }

    fn ensure_actor_may_move_to(&self, actor: Actor, to: OrderStatus) -> Result<(), DomainError> {
        use OrderStatus::*;
        let allowed = match (to, actor) {
            (_, Actor::Admin) => to != ReturnRequested,
            (Processing | Shipped, Actor::Seller(seller_id)) => self.has_seller(seller_id),
            (OutForDelivery | Delivered, Actor::Carrier) => true,
            (Cancelled | ReturnRequested, Actor::Buyer(buyer_id)) => {
                self.buyer_id == Some(buyer_id)
            }
            _ => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(DomainError::unauthorized(format!(
                "{actor:?} may not move order {} to {to}",
                self.id
            )))
        }
    }

    fn handle_assign_logistics(
        &self,
        cmd: &AssignLogistics,
    ) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_placed()?;
        self.ensure_order_id(cmd.order_id)?;

        if self.payment_status != PaymentStatus::Paid {
            return Err(DomainError::not_payable(format!(
                "order {} payment is {:?}",
                self.id, self.payment_status
            )));
        }
        if let Some(existing) = &self.shipment {
            return Err(DomainError::already_assigned(format!(
                "order {} is with {} ({})",
                self.id, existing.partner, existing.tracking_id
            )));
        }
        let Some(progress) = self.status.progress() else {
            return Err(DomainError::invalid_transition(self.status, OrderStatus::Shipped));
        };

        let mut events = vec![OrderEvent::LogisticsAssigned(LogisticsAssigned {
            order_id: cmd.order_id,
            shipment: Shipment {
                partner: cmd.partner,
                tracking_id: cmd.tracking_id.clone(),
                assigned_at: cmd.occurred_at,
                estimated_delivery: cmd.estimated_delivery,
            },
            occurred_at: cmd.occurred_at,
        })];

        if progress < 2 {
            events.push(OrderEvent::StatusChanged(StatusChanged {
                order_id: cmd.order_id,
                from: self.status,
                to: OrderStatus::Shipped,
                actor: Actor::Admin,
                occurred_at: cmd.occurred_at,
            }));
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn test_order_id() -> OrderId {
        OrderId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn item(seller_id: UserId, unit_price: u64, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: ProductId::new(AggregateId::new()),
            product_name: "Silk Saree".to_string(),
            unit_price,
            quantity,
            seller_id,
        }
    }

    fn run(order: &mut Order, command: OrderCommand) -> Result<Vec<OrderEvent>, DomainError> {
        let events = order.handle(&command)?;
        for e in &events {
            order.apply(e);
        }
        Ok(events)
    }

    fn placed(buyer_id: UserId, items: Vec<OrderItem>) -> Order {
        let order_id = test_order_id();
        let mut order = Order::empty(order_id);
        run(
            &mut order,
            OrderCommand::PlaceOrder(PlaceOrder {
                order_id,
                buyer_id,
                items,
                payment_reference: "pay_1".to_string(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        order
    }

    fn change(order: &mut Order, actor: Actor, to: OrderStatus) -> Result<Vec<OrderEvent>, DomainError> {
        let order_id = order.id_typed();
        run(
            order,
            OrderCommand::ChangeStatus(ChangeStatus {
                order_id,
                actor,
                to,
                occurred_at: test_time(),
            }),
        )
    }

    fn assign(order: &mut Order, partner: LogisticsPartner) -> Result<Vec<OrderEvent>, DomainError> {
        let order_id = order.id_typed();
        let now = test_time();
        run(
            order,
            OrderCommand::AssignLogistics(AssignLogistics {
                order_id,
                partner,
                tracking_id: TrackingId::for_partner(partner, AggregateId::new()),
                estimated_delivery: now + Duration::days(5),
                occurred_at: now,
            }),
        )
    }

    #[test]
    fn place_order_starts_pending_and_paid() {
        let seller = UserId::new();
        let order = placed(UserId::new(), vec![item(seller, 500, 2)]);

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.payment_status(), PaymentStatus::Paid);
        assert_eq!(order.total(), 1000);
        assert_eq!(order.version(), 1);
        assert!(order.placed_at().is_some());
    }

    #[test]
    fn place_order_without_items_is_empty_cart() {
        let order_id = test_order_id();
        let order = Order::empty(order_id);
        let err = order
            .handle(&OrderCommand::PlaceOrder(PlaceOrder {
                order_id,
                buyer_id: UserId::new(),
                items: vec![],
                payment_reference: "pay".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::EmptyCart);
    }

    #[test]
    fn place_order_refuses_a_total_that_overflows() {
        let order_id = test_order_id();
        let order = Order::empty(order_id);
        let seller = UserId::new();
        let place = |items| {
            OrderCommand::PlaceOrder(PlaceOrder {
                order_id,
                buyer_id: UserId::new(),
                items,
                payment_reference: "pay".to_string(),
                occurred_at: test_time(),
            })
        };

        let err = order.handle(&place(vec![item(seller, u64::MAX / 2 + 1, 2)])).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = order
            .handle(&place(vec![item(seller, u64::MAX - 1, 1), item(seller, 2, 1)]))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn full_lifecycle_pending_to_delivered() {
        let seller = UserId::new();
        let mut order = placed(UserId::new(), vec![item(seller, 100, 1)]);

        change(&mut order, Actor::Seller(seller), OrderStatus::Processing).unwrap();
        change(&mut order, Actor::Seller(seller), OrderStatus::Shipped).unwrap();
        change(&mut order, Actor::Carrier, OrderStatus::OutForDelivery).unwrap();
        change(&mut order, Actor::Carrier, OrderStatus::Delivered).unwrap();

        assert_eq!(order.status(), OrderStatus::Delivered);
        assert_eq!(order.version(), 5);
    }

    #[test]
    fn delivered_order_cannot_be_cancelled() {
        let seller = UserId::new();
        let buyer = UserId::new();
        let mut order = placed(buyer, vec![item(seller, 100, 1)]);
        change(&mut order, Actor::Seller(seller), OrderStatus::Shipped).unwrap();
        change(&mut order, Actor::Admin, OrderStatus::OutForDelivery).unwrap();
        change(&mut order, Actor::Admin, OrderStatus::Delivered).unwrap();

        let err = change(&mut order, Actor::Buyer(buyer), OrderStatus::Cancelled).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
        assert_eq!(order.status(), OrderStatus::Delivered);
    }

    #[test]
    fn seller_without_items_cannot_advance() {
        let mut order = placed(UserId::new(), vec![item(UserId::new(), 100, 1)]);
        let err = change(&mut order, Actor::Seller(UserId::new()), OrderStatus::Processing)
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn any_seller_in_a_multi_seller_order_moves_the_shared_status() {
        let a = UserId::new();
        let b = UserId::new();
        let mut order = placed(UserId::new(), vec![item(a, 100, 1), item(b, 300, 2)]);

        change(&mut order, Actor::Seller(b), OrderStatus::Processing).unwrap();
        assert_eq!(order.status(), OrderStatus::Processing);
        assert_eq!(order.seller_subtotal(a), 100);
        assert_eq!(order.seller_subtotal(b), 600);
    }

    #[test]
    fn skipping_ahead_is_rejected() {
        let seller = UserId::new();
        let mut order = placed(UserId::new(), vec![item(seller, 100, 1)]);
        let err = change(&mut order, Actor::Carrier, OrderStatus::Delivered).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    #[test]
    fn buyer_cancellation_refunds_payment() {
        let buyer = UserId::new();
        let mut order = placed(buyer, vec![item(UserId::new(), 250, 2)]);

        let events = change(&mut order, Actor::Buyer(buyer), OrderStatus::Cancelled).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[1], OrderEvent::PaymentRefunded(e) if e.amount == 500));
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.payment_status(), PaymentStatus::Refunded);

        let err = change(&mut order, Actor::Admin, OrderStatus::Processing).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    #[test]
    fn only_the_buyer_requests_a_return() {
        let buyer = UserId::new();
        let mut order = placed(buyer, vec![item(UserId::new(), 100, 1)]);

        let err = change(&mut order, Actor::Buyer(UserId::new()), OrderStatus::ReturnRequested)
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));

        change(&mut order, Actor::Buyer(buyer), OrderStatus::ReturnRequested).unwrap();
        assert_eq!(order.status(), OrderStatus::ReturnRequested);

        let err = change(&mut order, Actor::Buyer(buyer), OrderStatus::ReturnRequested).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    #[test]
    fn assign_logistics_ships_a_pending_order() {
        let mut order = placed(UserId::new(), vec![item(UserId::new(), 100, 1)]);

        let events = assign(&mut order, LogisticsPartner::Delhivery).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(order.status(), OrderStatus::Shipped);
        assert_eq!(order.logistics_partner(), Some(LogisticsPartner::Delhivery));
        assert!(order.tracking_id().unwrap().as_str().starts_with("DLV"));
    }

    #[test]
    fn assign_logistics_keeps_later_status() {
        let seller = UserId::new();
        let mut order = placed(UserId::new(), vec![item(seller, 100, 1)]);
        change(&mut order, Actor::Seller(seller), OrderStatus::Shipped).unwrap();
        change(&mut order, Actor::Carrier, OrderStatus::OutForDelivery).unwrap();

        let events = assign(&mut order, LogisticsPartner::BlueDart).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(order.status(), OrderStatus::OutForDelivery);
    }

    #[test]
    fn second_assignment_is_rejected_and_tracking_kept() {
        let mut order = placed(UserId::new(), vec![item(UserId::new(), 100, 1)]);
        assign(&mut order, LogisticsPartner::EcomExpress).unwrap();
        let tracking = order.tracking_id().cloned();

        let err = assign(&mut order, LogisticsPartner::EcomExpress).unwrap_err();
        assert!(matches!(err, DomainError::AlreadyAssigned(_)));
        assert_eq!(order.tracking_id().cloned(), tracking);
    }

    #[test]
    fn refunded_order_is_not_payable() {
        let buyer = UserId::new();
        let mut order = placed(buyer, vec![item(UserId::new(), 100, 1)]);
        change(&mut order, Actor::Buyer(buyer), OrderStatus::Cancelled).unwrap();

        let err = assign(&mut order, LogisticsPartner::NexusFastTrack).unwrap_err();
        assert!(matches!(err, DomainError::NotPayable(_)));
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let seller = UserId::new();
        let order = placed(UserId::new(), vec![item(seller, 100, 1)]);
        let before = order.clone();

        let cmd = OrderCommand::ChangeStatus(ChangeStatus {
            order_id: order.id_typed(),
            actor: Actor::Seller(seller),
            to: OrderStatus::Processing,
            occurred_at: test_time(),
        });
        let events1 = order.handle(&cmd).unwrap();
        let events2 = order.handle(&cmd).unwrap();

        assert_eq!(order, before);
        assert_eq!(events1, events2);
    }

    #[test]
    fn execute_returns_new_state_and_keeps_old() {
        let seller = UserId::new();
        let order = placed(UserId::new(), vec![item(seller, 100, 1)]);

        let (next, _) = order
            .execute(&OrderCommand::ChangeStatus(ChangeStatus {
                order_id: order.id_typed(),
                actor: Actor::Admin,
                to: OrderStatus::Processing,
                occurred_at: test_time(),
            }))
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(next.status(), OrderStatus::Processing);
        assert_eq!(next.version(), order.version() + 1);
    }

    #[test]
    fn reference_uses_trailing_hex() {
        let id = OrderId::new(AggregateId::from_uuid(uuid::Uuid::from_u128(0xabc)));
        assert_eq!(id.reference(), "ORD-00000ABC");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the placed total equals Σ unit_price × quantity and no
        /// later transition changes it.
        #[test]
        fn total_is_fixed_at_placement(
            lines in prop::collection::vec((1u64..100_000, 1u32..50), 1..8),
            steps in prop::collection::vec(0usize..6, 0..10)
        ) {
            let seller = UserId::new();
            let buyer = UserId::new();
            let items: Vec<OrderItem> = lines.iter().map(|(p, q)| item(seller, *p, *q)).collect();
            let expected: u64 = lines.iter().map(|(p, q)| p * u64::from(*q)).sum();
            let mut order = placed(buyer, items);

            let moves = [
                (Actor::Seller(seller), OrderStatus::Processing),
                (Actor::Seller(seller), OrderStatus::Shipped),
                (Actor::Carrier, OrderStatus::OutForDelivery),
                (Actor::Carrier, OrderStatus::Delivered),
                (Actor::Buyer(buyer), OrderStatus::Cancelled),
                (Actor::Buyer(buyer), OrderStatus::ReturnRequested),
            ];
            for step in steps {
                let (actor, to) = moves[step];
                let before = order.status();
                if change(&mut order, actor, to).is_err() {
                    prop_assert_eq!(order.status(), before);
                }
                prop_assert_eq!(order.total(), expected);
            }
        }
    }
}
