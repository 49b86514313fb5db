//! Infrastructure layer: stores, payment, orchestration and configuration.
//!
//! Domain crates stay pure; everything that waits, locks or logs across
//! aggregates lives here.

pub mod cart_registry;
pub mod checkout;
pub mod config;
pub mod dispatcher;
pub mod fulfillment;
pub mod logistics;
pub mod marketplace;
pub mod order_store;
pub mod payment;
pub mod reports;

pub use cart_registry::{CartRegistry, CartSession};
pub use checkout::{CheckoutError, CheckoutOrchestrator};
pub use config::{ConfigError, EngineConfig};
pub use dispatcher::{DispatchError, Dispatched, OrderDispatcher};
pub use fulfillment::FulfillmentService;
pub use logistics::LogisticsAssigner;
pub use marketplace::{Marketplace, MarketplaceParts};
pub use order_store::{
    InMemoryOrderStore, ORDER_AGGREGATE_TYPE, OrderEnvelope, OrderStore, OrderStoreError, StoredOrderEvent,
};
pub use payment::{PaymentGateway, PaymentOutcome, PaymentReceipt, SimulatedGateway};
pub use reports::{CategoryStock, PlatformSummary};
