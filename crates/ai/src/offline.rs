use async_trait::async_trait;

use nexus_catalog::Category;

use crate::advisor::{AiError, ShoppingAdvisor};
use crate::snapshot::{CatalogSnapshot, SnapshotItem};

/// Keyword-matching advisor used when no model is configured.
#[derive(Debug, Clone, Copy)]
pub struct OfflineAdvisor {
    max_suggestions: usize,
}

impl Default for OfflineAdvisor {
    fn default() -> Self {
        Self::new(3)
    }
}

impl OfflineAdvisor {
    pub fn new(max_suggestions: usize) -> Self {
        Self {
            max_suggestions: max_suggestions.max(1),
        }
    }

    fn matches(item: &SnapshotItem, terms: &[String]) -> bool {
        let name = item.name.to_lowercase();
        let category = item.category.to_string().to_lowercase();
        terms.iter().any(|t| name.contains(t.as_str()) || category == *t)
    }
}

#[async_trait]
impl ShoppingAdvisor for OfflineAdvisor {
    async fn shopping_advice(&self, query: &str, catalog: &CatalogSnapshot) -> Result<String, AiError> {
        if catalog.is_empty() {
            return Err(AiError::Unavailable("catalog is empty".to_string()));
        }
        let terms: Vec<String> = query
            .split_whitespace()
            .filter(|t| t.len() > 2)
            .map(str::to_lowercase)
            .collect();

        let mut hits: Vec<&SnapshotItem> = catalog
            .items()
            .iter()
            .filter(|i| Self::matches(i, &terms))
            .collect();
        if hits.is_empty() {
            return Ok(format!("Nothing matched \"{}\". Try browsing the full collection.", query.trim()));
        }
        hits.sort_by_key(|i| i.price);
        hits.truncate(self.max_suggestions);

        let picks: Vec<String> = hits
            .iter()
            .map(|i| format!("{} ({}, {})", i.name, i.category, i.price))
            .collect();
        Ok(format!("You might like: {}.", picks.join("; ")))
    }

    async fn product_description(&self, name: &str, category: Category) -> Result<String, AiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AiError::InvalidInput("product name is empty".to_string()));
        }
        Ok(format!(
            "{name} is a {} essential from our {category} collection, made to be worn every day.",
            name.split_whitespace().last().unwrap_or(name).to_lowercase()
        ))
    }
}
