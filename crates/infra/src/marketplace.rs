//! Single entry point wiring the catalog, carts, checkout and fulfillment.
//!
//! Every collaborator (id source, clock, payment gateway, advisor, store, bus)
//! is injected; `Marketplace::in_memory` picks the process-local defaults.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use nexus_ai::{CatalogSnapshot, GuardedAdvisor, OfflineAdvisor, ShoppingAdvisor};
use nexus_catalog::{CatalogEditor, CatalogStore, Category, NewProduct, Product, ProductId, ProductUpdate};
use nexus_commission::{EarningsBreakdown, PlatformSettings, SettingsStore};
use nexus_core::{Clock, DomainError, DomainResult, IdGenerator, SystemClock, UserId, UuidV7Generator};
use nexus_events::{EventBus, InMemoryEventBus, Subscription};
use nexus_orders::{Actor, LogisticsPartner, Order, OrderId, OrderStatus};

use crate::cart_registry::{CartRegistry, CartSession};
use crate::checkout::{CheckoutError, CheckoutOrchestrator};
use crate::config::{ConfigError, EngineConfig};
use crate::dispatcher::{DispatchError, OrderDispatcher};
use crate::fulfillment::FulfillmentService;
use crate::logistics::LogisticsAssigner;
use crate::order_store::{InMemoryOrderStore, OrderEnvelope, OrderStore, OrderStoreError};
use crate::payment::{PaymentGateway, SimulatedGateway};
use crate::reports::{self, CategoryStock, PlatformSummary};

type Advisor = GuardedAdvisor<Arc<dyn ShoppingAdvisor>>;

/// Injected collaborators.
#[derive(Debug)]
pub struct MarketplaceParts<S, B> {
    pub store: S,
    pub bus: B,
    pub gateway: Arc<dyn PaymentGateway>,
    pub advisor: Arc<dyn ShoppingAdvisor>,
    pub ids: Arc<dyn IdGenerator>,
    pub clock: Arc<dyn Clock>,
}

pub struct Marketplace<S = InMemoryOrderStore, B = InMemoryEventBus<OrderEnvelope>> {
    config: EngineConfig,
    catalog: Arc<CatalogStore>,
    settings: SettingsStore,
    carts: CartRegistry,
    dispatcher: Arc<OrderDispatcher<S, B>>,
    checkout: CheckoutOrchestrator<S, B>,
    fulfillment: FulfillmentService<S, B>,
    logistics: LogisticsAssigner<S, B>,
    advisor: Arc<Advisor>,
    ids: Arc<dyn IdGenerator>,
}

impl Marketplace {
    /// In-memory store and bus, v7 ids, wall clock, simulated gateway,
    /// offline advisor.
    pub fn in_memory(config: EngineConfig) -> Result<Self, ConfigError> {
        let ids: Arc<dyn IdGenerator> = Arc::new(UuidV7Generator);
        let gateway = Arc::new(SimulatedGateway::new(config.payment_latency(), Arc::clone(&ids)));
        Self::with_parts(
            config,
            MarketplaceParts {
                store: InMemoryOrderStore::new(),
                bus: InMemoryEventBus::new(),
                gateway,
                advisor: Arc::new(OfflineAdvisor::default()),
                ids,
                clock: Arc::new(SystemClock),
            },
        )
    }
}

impl<S, B> Marketplace<S, B>
where
    S: OrderStore,
    B: EventBus<OrderEnvelope>,
{
    pub fn with_parts(config: EngineConfig, parts: MarketplaceParts<S, B>) -> Result<Self, ConfigError> {
        config.validate()?;
        let settings = SettingsStore::new(config.platform_settings()?);
        let catalog = Arc::new(CatalogStore::new());
        let dispatcher = Arc::new(OrderDispatcher::new(parts.store, parts.bus));

        let checkout = CheckoutOrchestrator::new(
            Arc::clone(&catalog),
            Arc::clone(&dispatcher),
            parts.gateway,
            Arc::clone(&parts.ids),
            Arc::clone(&parts.clock),
            config.payment_timeout(),
        );
        let fulfillment = FulfillmentService::new(Arc::clone(&catalog), Arc::clone(&dispatcher), Arc::clone(&parts.clock));
        let logistics = LogisticsAssigner::new(
            Arc::clone(&dispatcher),
            Arc::clone(&parts.ids),
            parts.clock,
            config.delivery_offset(),
        );
        let advisor = Arc::new(GuardedAdvisor::new(parts.advisor, config.advisor_timeout()));

        info!(
            commission = %settings.current().commission_percentage,
            gst = %settings.current().gst_percentage,
            "marketplace ready"
        );

        Ok(Self {
            config,
            catalog,
            settings,
            carts: CartRegistry::new(),
            dispatcher,
            checkout,
            fulfillment,
            logistics,
            advisor,
            ids: parts.ids,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    // --- catalog -----------------------------------------------------------

    pub fn list_product(&self, seller_id: UserId, input: NewProduct) -> DomainResult<Product> {
        self.catalog.add_product(self.ids.as_ref(), seller_id, input)
    }

    pub fn update_product(&self, seller_id: UserId, id: ProductId, update: &ProductUpdate) -> DomainResult<Product> {
        self.catalog.update_product(seller_id, id, update)
    }

    pub fn delete_product(&self, editor: CatalogEditor, id: ProductId) -> DomainResult<Product> {
        self.catalog.delete_product(editor, id)
    }

    pub fn moderate_product(&self, id: ProductId, approved: bool) -> DomainResult<Product> {
        self.catalog.set_moderation(id, approved)
    }

    pub fn restock(&self, seller_id: UserId, id: ProductId, quantity: u32) -> DomainResult<u32> {
        let product = self
            .catalog
            .get(&id)
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))?;
        if product.seller_id() != seller_id {
            return Err(DomainError::unauthorized("only the listing seller may restock it"));
        }
        self.catalog.restock(id, quantity)
    }

    // --- settings ----------------------------------------------------------

    pub fn platform_settings(&self) -> PlatformSettings {
        self.settings.current()
    }

    pub fn set_commission_percentage(&self, percent: f64) -> DomainResult<PlatformSettings> {
        self.settings.set_commission_percentage(percent)
    }

    pub fn set_gst_percentage(&self, percent: f64) -> DomainResult<PlatformSettings> {
        self.settings.set_gst_percentage(percent)
    }

    /// Seller-side preview at the current rates.
    pub fn earnings_preview(&self, price: u64) -> EarningsBreakdown {
        EarningsBreakdown::for_price(price, &self.settings.current())
    }

    // --- cart & checkout ---------------------------------------------------

    pub fn cart(&self, buyer_id: UserId) -> Arc<CartSession> {
        self.carts.session(buyer_id)
    }

    /// Add from the live catalog record, so stock and moderation are current.
    pub fn add_to_cart(&self, buyer_id: UserId, product_id: ProductId, quantity: u32) -> DomainResult<u32> {
        let product = self
            .catalog
            .get(&product_id)
            .ok_or_else(|| DomainError::not_found(format!("product {product_id}")))?;
        self.carts.session(buyer_id).add_item(&product, quantity)
    }

    pub fn remove_from_cart(&self, buyer_id: UserId, product_id: ProductId) -> DomainResult<u32> {
        self.carts.session(buyer_id).remove_item(&product_id)
    }

    pub async fn checkout(&self, buyer_id: UserId, cancel: CancellationToken) -> Result<Order, CheckoutError> {
        let session = self.carts.session(buyer_id);
        self.checkout.checkout(&session, cancel).await
    }

    // --- orders ------------------------------------------------------------

    pub fn change_status(&self, order_id: OrderId, actor: Actor, to: OrderStatus) -> Result<Order, DispatchError> {
        self.fulfillment.change_status(order_id, actor, to)
    }

    pub fn assign_logistics(&self, order_id: OrderId, partner: LogisticsPartner) -> Result<Order, DispatchError> {
        self.logistics.assign(order_id, partner)
    }

    pub fn order(&self, order_id: OrderId) -> Result<Option<Order>, OrderStoreError> {
        self.dispatcher.store().load_order(order_id)
    }

    pub fn orders(&self) -> Result<Vec<Order>, OrderStoreError> {
        self.dispatcher.store().all_orders()
    }

    pub fn buyer_orders(&self, buyer_id: UserId) -> Result<Vec<Order>, OrderStoreError> {
        Ok(reports::buyer_orders(&self.orders()?, buyer_id))
    }

    pub fn seller_orders(&self, seller_id: UserId) -> Result<Vec<Order>, OrderStoreError> {
        Ok(reports::seller_orders(&self.orders()?, seller_id))
    }

    pub fn seller_net_earnings(&self, seller_id: UserId) -> Result<u64, OrderStoreError> {
        Ok(reports::seller_net_earnings(&self.orders()?, seller_id, &self.settings.current()))
    }

    pub fn summary(&self) -> Result<PlatformSummary, OrderStoreError> {
        Ok(PlatformSummary::compute(
            &self.orders()?,
            &self.settings.current(),
            self.catalog.pending_moderation(),
        ))
    }

    pub fn inventory_health(&self) -> BTreeMap<Category, CategoryStock> {
        reports::inventory_health(&self.catalog.list())
    }

    /// Committed order events, from now on.
    pub fn subscribe(&self) -> Subscription<OrderEnvelope> {
        self.dispatcher.bus().subscribe()
    }

    // --- assistant ---------------------------------------------------------

    pub fn catalog_snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot::from_products(&self.catalog.visible_products())
    }

    /// Ask the assistant on a detached task. The snapshot is taken before the
    /// task starts; nothing here waits for the answer.
    pub fn spawn_advice(&self, query: impl Into<String>) -> JoinHandle<String> {
        let advisor = Arc::clone(&self.advisor);
        let snapshot = self.catalog_snapshot();
        let query = query.into();
        tokio::spawn(async move { advisor.advice_or_fallback(&query, &snapshot).await })
    }

    pub fn spawn_description(&self, name: impl Into<String>, category: Category) -> JoinHandle<String> {
        let advisor = Arc::clone(&self.advisor);
        let name = name.into();
        tokio::spawn(async move { advisor.description_or_fallback(&name, category).await })
    }
}
