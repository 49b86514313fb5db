use serde::{Deserialize, Serialize};

use nexus_catalog::{Category, Product};

/// What the assistant is allowed to see about one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotItem {
    pub name: String,
    pub price: u64,
    pub category: Category,
}

/// Point-in-time, read-only view of the visible catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogSnapshot {
    items: Vec<SnapshotItem>,
}

impl CatalogSnapshot {
    /// Build from catalog records, skipping anything not yet moderated.
    pub fn from_products<'a>(products: impl IntoIterator<Item = &'a Product>) -> Self {
        let items = products
            .into_iter()
            .filter(|p| p.is_moderated())
            .map(|p| SnapshotItem {
                name: p.name().to_string(),
                price: p.price(),
                category: p.category(),
            })
            .collect();
        Self { items }
    }

    pub fn items(&self) -> &[SnapshotItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_catalog::{NewProduct, ProductId};

    fn product(name: &str, moderated: bool) -> Product {
        Product::list(
            ProductId::new(Default::default()),
            Default::default(),
            NewProduct {
                name: name.to_string(),
                brand: "Nexus".to_string(),
                category: Category::Men,
                description: String::new(),
                price: 1299,
                stock: 3,
            },
        )
        .unwrap()
        .moderated(moderated)
    }

    #[test]
    fn unmoderated_products_are_hidden() {
        let products = [product("Linen Shirt", true), product("Draft Listing", false)];
        let snapshot = CatalogSnapshot::from_products(&products);

        assert_eq!(snapshot.items().len(), 1);
        assert_eq!(snapshot.items()[0].name, "Linen Shirt");
    }

    #[test]
    fn serializes_as_a_plain_list() {
        let products = [product("Linen Shirt", true)];
        let json = CatalogSnapshot::from_products(&products).to_json().unwrap();
        assert_eq!(json, r#"[{"name":"Linen Shirt","price":1299,"category":"Men"}]"#);
    }
}
