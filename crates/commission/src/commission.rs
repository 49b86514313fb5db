use serde::{Deserialize, Serialize};

use crate::settings::{Percentage, PlatformSettings};

/// Platform's share of an order total (rounded down).
pub fn platform_take(order_total: u64, commission: Percentage) -> u64 {
    commission.of(order_total)
}

/// What the seller keeps of `price` after platform commission.
pub fn net_earnings(price: u64, commission: Percentage) -> u64 {
    price - platform_take(price, commission)
}

/// GST contained in `amount` at the configured rate. Reported only; the
/// engine never adds it to a total.
pub fn gst_component(amount: u64, gst: Percentage) -> u64 {
    gst.of(amount)
}

/// Seller-facing price preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsBreakdown {
    pub price: u64,
    pub commission: u64,
    pub seller_net: u64,
    pub gst: u64,
}

impl EarningsBreakdown {
    pub fn for_price(price: u64, settings: &PlatformSettings) -> Self {
        let commission = platform_take(price, settings.commission_percentage);
        Self {
            price,
            commission,
            seller_net: price - commission,
            gst: gst_component(price, settings.gst_percentage),
        }
    }
}
