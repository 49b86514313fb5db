use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nexus_core::{AggregateId, ValueObject};

/// Third-party carriers the administrator can bind to a paid order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogisticsPartner {
    #[serde(rename = "Delhivery")]
    Delhivery,
    #[serde(rename = "BlueDart")]
    BlueDart,
    #[serde(rename = "Ecom Express")]
    EcomExpress,
    #[serde(rename = "Nexus FastTrack")]
    NexusFastTrack,
}

impl LogisticsPartner {
    pub const ALL: [LogisticsPartner; 4] = [
        LogisticsPartner::Delhivery,
        LogisticsPartner::BlueDart,
        LogisticsPartner::EcomExpress,
        LogisticsPartner::NexusFastTrack,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            LogisticsPartner::Delhivery => "Delhivery",
            LogisticsPartner::BlueDart => "BlueDart",
            LogisticsPartner::EcomExpress => "Ecom Express",
            LogisticsPartner::NexusFastTrack => "Nexus FastTrack",
        }
    }

    /// Three-letter prefix used on tracking numbers.
    pub fn code(&self) -> &'static str {
        match self {
            LogisticsPartner::Delhivery => "DLV",
            LogisticsPartner::BlueDart => "BLD",
            LogisticsPartner::EcomExpress => "ECX",
            LogisticsPartner::NexusFastTrack => "NXF",
        }
    }
}

impl core::fmt::Display for LogisticsPartner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Carrier tracking number, e.g. `BLD00000000002A`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingId(String);

impl TrackingId {
    /// Derive a tracking number from a freshly generated id. Unique as long as
    /// the ids are.
    pub fn for_partner(partner: LogisticsPartner, id: AggregateId) -> Self {
        let hex = id.as_uuid().simple().to_string().to_uppercase();
        Self(format!("{}{}", partner.code(), &hex[hex.len() - 12..]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for TrackingId {}

impl core::fmt::Display for TrackingId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shipment data attached to an order by logistics assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub partner: LogisticsPartner,
    pub tracking_id: TrackingId,
    pub assigned_at: DateTime<Utc>,
    pub estimated_delivery: DateTime<Utc>,
}

impl ValueObject for Shipment {}
