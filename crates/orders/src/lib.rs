//! Marketplace orders: the lifecycle state machine (pure domain logic).
//!
//! An `Order` is created from a paid checkout, then moved through fulfillment
//! by sellers, the administrator, carriers and the buyer. Logistics binding is
//! part of the same aggregate so "assigned at most once" is enforced in one
//! place.

pub mod logistics;
pub mod order;

pub use logistics::{LogisticsPartner, Shipment, TrackingId};
pub use order::{
    Actor, AssignLogistics, ChangeStatus, LogisticsAssigned, Order, OrderCommand, OrderEvent,
    OrderId, OrderItem, OrderPlaced, OrderStatus, PaymentRefunded, PaymentStatus, PlaceOrder,
    StatusChanged,
};
