//! Payment gateway boundary.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use nexus_core::{IdGenerator, UserId};

/// Proof of a successful authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub reference: String,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Paid(PaymentReceipt),
    Declined(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync + core::fmt::Debug {
    /// Authorize `amount` for `buyer_id`. May suspend for the gateway round-trip.
    async fn authorize(&self, buyer_id: UserId, amount: u64) -> PaymentOutcome;

    /// Release an authorization whose order could not be committed.
    async fn void(&self, receipt: &PaymentReceipt);

    /// The caller stopped waiting on `authorize` (timeout or cancellation).
    /// Any approval for that attempt that lands later must be released.
    async fn abandon(&self, buyer_id: UserId, amount: u64);
}

/// Stand-in gateway: waits a fixed latency, then approves.
///
/// `declining` builds one that always declines, for exercising the failure path.
#[derive(Debug)]
pub struct SimulatedGateway {
    latency: Duration,
    ids: Arc<dyn IdGenerator>,
    decline_reason: Option<String>,
}

impl SimulatedGateway {
    pub fn new(latency: Duration, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            latency,
            ids,
            decline_reason: None,
        }
    }

    pub fn declining(latency: Duration, ids: Arc<dyn IdGenerator>, reason: impl Into<String>) -> Self {
        Self {
            latency,
            ids,
            decline_reason: Some(reason.into()),
        }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn authorize(&self, buyer_id: UserId, amount: u64) -> PaymentOutcome {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(reason) = &self.decline_reason {
            return PaymentOutcome::Declined(reason.clone());
        }

        let reference = format!("pay_{}", self.ids.next_id().as_uuid().simple());
        debug!(buyer_id = %buyer_id, amount, reference = %reference, "payment authorized");
        PaymentOutcome::Paid(PaymentReceipt { reference, amount })
    }

    async fn void(&self, receipt: &PaymentReceipt) {
        info!(reference = %receipt.reference, amount = receipt.amount, "payment authorization voided");
    }

    async fn abandon(&self, buyer_id: UserId, amount: u64) {
        // Approval only happens inside `authorize`, so a dropped attempt never approves.
        debug!(buyer_id = %buyer_id, amount, "pending authorization abandoned");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_core::SequentialIdGenerator;

    #[tokio::test]
    async fn simulated_gateway_approves_with_unique_references() {
        let gateway = SimulatedGateway::new(Duration::ZERO, Arc::new(SequentialIdGenerator::new()));
        let buyer = UserId::new();

        let first = gateway.authorize(buyer, 1000).await;
        let second = gateway.authorize(buyer, 1000).await;

        match (first, second) {
            (PaymentOutcome::Paid(a), PaymentOutcome::Paid(b)) => {
                assert_eq!(a.amount, 1000);
                assert_ne!(a.reference, b.reference);
            }
            other => panic!("expected two approvals, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn declining_gateway_reports_reason() {
        let gateway = SimulatedGateway::declining(
            Duration::from_millis(1),
            Arc::new(SequentialIdGenerator::new()),
            "insufficient funds",
        );
        let outcome = gateway.authorize(UserId::new(), 10).await;
        assert_eq!(outcome, PaymentOutcome::Declined("insufficient funds".to_string()));
    }
}
