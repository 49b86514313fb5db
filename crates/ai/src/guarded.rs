//! Timeout + fallback wrapper around any advisor.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use nexus_catalog::Category;

use crate::advisor::{AiError, ShoppingAdvisor};
use crate::snapshot::CatalogSnapshot;

pub const ADVICE_FALLBACK: &str =
    "I'm sorry, I'm having trouble getting recommendations right now.";
pub const DESCRIPTION_FALLBACK: &str = "No description generated.";

/// Bounds every call by `timeout` and turns failures into fallback text.
#[derive(Debug)]
pub struct GuardedAdvisor<A> {
    inner: A,
    timeout: Duration,
}

impl<A: ShoppingAdvisor> GuardedAdvisor<A> {
    pub fn new(inner: A, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Always returns text; errors and blank answers become the fallback.
    pub async fn advice_or_fallback(&self, query: &str, catalog: &CatalogSnapshot) -> String {
        match self.shopping_advice(query, catalog).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "shopping advice failed; using fallback");
                ADVICE_FALLBACK.to_string()
            }
        }
    }

    pub async fn description_or_fallback(&self, name: &str, category: Category) -> String {
        match self.product_description(name, category).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "product description failed; using fallback");
                DESCRIPTION_FALLBACK.to_string()
            }
        }
    }
}

fn non_blank(text: String) -> Result<String, AiError> {
    if text.trim().is_empty() {
        Err(AiError::EmptyResponse)
    } else {
        Ok(text)
    }
}

#[async_trait]
impl<A: ShoppingAdvisor> ShoppingAdvisor for GuardedAdvisor<A> {
    async fn shopping_advice(&self, query: &str, catalog: &CatalogSnapshot) -> Result<String, AiError> {
        if query.trim().is_empty() {
            return Err(AiError::InvalidInput("query is empty".to_string()));
        }
        tokio::time::timeout(self.timeout, self.inner.shopping_advice(query, catalog))
            .await
            .map_err(|_| AiError::Timeout(self.timeout))?
            .and_then(non_blank)
    }

    async fn product_description(&self, name: &str, category: Category) -> Result<String, AiError> {
        tokio::time::timeout(self.timeout, self.inner.product_description(name, category))
            .await
            .map_err(|_| AiError::Timeout(self.timeout))?
            .and_then(non_blank)
    }
}
