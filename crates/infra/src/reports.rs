//! Dashboard figures derived from order history and the live catalog.
//!
//! Refunded orders are excluded everywhere: their money went back to the buyer.
//! Sums across orders saturate at `u64::MAX` instead of wrapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use nexus_catalog::{Category, Product};
use nexus_commission::{PlatformSettings, net_earnings, platform_take};
use nexus_core::UserId;
use nexus_orders::{Order, PaymentStatus};

fn settled(orders: &[Order]) -> impl Iterator<Item = &Order> {
    orders
        .iter()
        .filter(|o| o.payment_status() == PaymentStatus::Paid)
}

fn saturating_sum(amounts: impl Iterator<Item = u64>) -> u64 {
    amounts.fold(0, u64::saturating_add)
}

/// Gross merchandise value.
pub fn gmv(orders: &[Order]) -> u64 {
    saturating_sum(settled(orders).map(Order::total))
}

/// Platform commission on the current GMV at the current rate.
pub fn platform_revenue(orders: &[Order], settings: &PlatformSettings) -> u64 {
    platform_take(gmv(orders), settings.commission_percentage)
}

/// Gross value of `seller_id`'s own lines across all orders.
pub fn seller_revenue(orders: &[Order], seller_id: UserId) -> u64 {
    saturating_sum(settled(orders).map(|o| o.seller_subtotal(seller_id)))
}

/// What `seller_id` keeps after commission, computed per order.
pub fn seller_net_earnings(orders: &[Order], seller_id: UserId, settings: &PlatformSettings) -> u64 {
    saturating_sum(
        settled(orders).map(|o| net_earnings(o.seller_subtotal(seller_id), settings.commission_percentage)),
    )
}

/// Orders containing at least one of the seller's items.
pub fn seller_orders(orders: &[Order], seller_id: UserId) -> Vec<Order> {
    orders.iter().filter(|o| o.has_seller(seller_id)).cloned().collect()
}

pub fn buyer_orders(orders: &[Order], buyer_id: UserId) -> Vec<Order> {
    orders
        .iter()
        .filter(|o| o.buyer_id() == Some(buyer_id))
        .cloned()
        .collect()
}

/// Admin overview card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSummary {
    pub order_count: usize,
    pub gmv: u64,
    pub platform_revenue: u64,
    pub pending_moderation: usize,
}

impl PlatformSummary {
    pub fn compute(orders: &[Order], settings: &PlatformSettings, pending_moderation: usize) -> Self {
        Self {
            order_count: orders.len(),
            gmv: gmv(orders),
            platform_revenue: platform_revenue(orders, settings),
            pending_moderation,
        }
    }
}

/// Listings below this many units count as low stock.
pub const LOW_STOCK_THRESHOLD: u32 = 10;

/// Admin inventory card for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStock {
    pub listings: usize,
    pub total_stock: u64,
    pub low_stock: usize,
}

/// Stock position per category over every listing, moderated or not.
/// Categories without listings are absent.
pub fn inventory_health(products: &[Product]) -> BTreeMap<Category, CategoryStock> {
    let mut health: BTreeMap<Category, CategoryStock> = BTreeMap::new();
    for product in products {
        let entry = health.entry(product.category()).or_default();
        entry.listings += 1;
        entry.total_stock += u64::from(product.stock());
        if product.stock() < LOW_STOCK_THRESHOLD {
            entry.low_stock += 1;
        }
    }
    health
}
