use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use nexus_catalog::Category;

use crate::snapshot::CatalogSnapshot;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("invalid request: {0}")]
    InvalidInput(String),

    #[error("assistant unavailable: {0}")]
    Unavailable(String),

    #[error("assistant did not answer within {0:?}")]
    Timeout(std::time::Duration),

    #[error("empty response")]
    EmptyResponse,
}

/// Text-generation collaborator.
///
/// Implementations may call a remote model; they must not touch engine state.
#[async_trait]
pub trait ShoppingAdvisor: Send + Sync + core::fmt::Debug + 'static {
    /// Recommend products from `catalog` for a free-text buyer query.
    async fn shopping_advice(&self, query: &str, catalog: &CatalogSnapshot) -> Result<String, AiError>;

    /// Marketing copy for a new listing.
    async fn product_description(&self, name: &str, category: Category) -> Result<String, AiError>;
}

#[async_trait]
impl<T> ShoppingAdvisor for Arc<T>
where
    T: ShoppingAdvisor + ?Sized,
{
    async fn shopping_advice(&self, query: &str, catalog: &CatalogSnapshot) -> Result<String, AiError> {
        (**self).shopping_advice(query, catalog).await
    }

    async fn product_description(&self, name: &str, category: Category) -> Result<String, AiError> {
        (**self).product_description(name, category).await
    }
}
