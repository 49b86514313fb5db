//! In-memory catalog store with an atomic stock boundary.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use nexus_core::{DomainError, DomainResult, IdGenerator, UserId};

use crate::product::{NewProduct, Product, ProductId, ProductUpdate};

/// One stock movement requested by checkout (or returned by cancellation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDeduction {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Who is editing the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogEditor {
    Seller(UserId),
    Admin,
}

/// Process-wide product records.
///
/// Every stock mutation takes the write lock for its whole validate-then-apply
/// step. That lock is the serializing boundary between concurrent checkouts:
/// two buyers racing for the last unit are ordered here, and the loser sees
/// the already-decremented stock.
#[derive(Debug, Default)]
pub struct CatalogStore {
    products: RwLock<BTreeMap<ProductId, Product>>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a record as-is (fixtures, imports).
    pub fn insert(&self, product: Product) {
        self.write().insert(product.id_typed(), product);
    }

    pub fn get(&self, id: &ProductId) -> Option<Product> {
        self.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<Product> {
        self.read().values().cloned().collect()
    }

    /// Products buyers can see (moderated by the administrator).
    pub fn visible_products(&self) -> Vec<Product> {
        self.read()
            .values()
            .filter(|p| p.is_moderated())
            .cloned()
            .collect()
    }

    pub fn pending_moderation(&self) -> usize {
        self.read().values().filter(|p| !p.is_moderated()).count()
    }

    pub fn products_by_seller(&self, seller_id: UserId) -> Vec<Product> {
        self.read()
            .values()
            .filter(|p| p.seller_id() == seller_id)
            .cloned()
            .collect()
    }

    pub fn add_product(
        &self,
        ids: &dyn IdGenerator,
        seller_id: UserId,
        input: NewProduct,
    ) -> DomainResult<Product> {
        let product = Product::list(ProductId::new(ids.next_id()), seller_id, input)?;
        self.write().insert(product.id_typed(), product.clone());
        info!(product_id = %product.id_typed(), seller_id = %seller_id, "product listed");
        Ok(product)
    }

    /// Seller edit. Only the owning seller may edit a listing; historical
    /// orders keep their own price snapshot and are never touched.
    pub fn update_product(
        &self,
        seller_id: UserId,
        id: ProductId,
        update: &ProductUpdate,
    ) -> DomainResult<Product> {
        let mut products = self.write();
        let current = products
            .get(&id)
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))?;
        if current.seller_id() != seller_id {
            return Err(DomainError::unauthorized("only the listing seller may edit it"));
        }
        let next = current.updated(update)?;
        products.insert(id, next.clone());
        info!(product_id = %id, "product updated");
        Ok(next)
    }

    pub fn delete_product(&self, editor: CatalogEditor, id: ProductId) -> DomainResult<Product> {
        let mut products = self.write();
        let current = products
            .get(&id)
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))?;
        if let CatalogEditor::Seller(seller_id) = editor {
            if current.seller_id() != seller_id {
                return Err(DomainError::unauthorized(
                    "only the listing seller or an admin may delete it",
                ));
            }
        }
        let removed = products
            .remove(&id)
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))?;
        info!(product_id = %id, editor = ?editor, "product deleted");
        Ok(removed)
    }

    /// Administrator visibility gate.
    pub fn set_moderation(&self, id: ProductId, is_moderated: bool) -> DomainResult<Product> {
        let mut products = self.write();
        let current = products
            .get(&id)
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))?;
        let next = current.moderated(is_moderated);
        products.insert(id, next.clone());
        info!(product_id = %id, is_moderated, "product moderation changed");
        Ok(next)
    }

    pub fn restock(&self, id: ProductId, quantity: u32) -> DomainResult<u32> {
        if quantity == 0 {
            return Err(DomainError::validation("restock quantity must be positive"));
        }
        let mut products = self.write();
        let current = products
            .get(&id)
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))?;
        let stock = current.stock().saturating_add(quantity);
        let next = current.with_stock(stock);
        products.insert(id, next);
        debug!(product_id = %id, quantity, stock, "product restocked");
        Ok(stock)
    }

    /// Deduct every line or none of them.
    ///
    /// Fails with `InsufficientStock` (naming the first short product) when any
    /// line asks for more than is on hand; in that case no record changes.
    pub fn deduct_all(&self, lines: &[StockDeduction]) -> DomainResult<()> {
        let wanted = merge(lines);
        let mut products = self.write();

        for (id, quantity) in &wanted {
            let product = products
                .get(id)
                .ok_or_else(|| DomainError::insufficient_stock(format!("product {id} no longer listed")))?;
            if product.stock() < *quantity {
                return Err(DomainError::insufficient_stock(format!(
                    "product {id}: requested {quantity}, available {}",
                    product.stock()
                )));
            }
        }

        for (id, quantity) in wanted {
            if let Some(product) = products.get_mut(&id) {
                *product = product.with_stock(product.stock().saturating_sub(quantity));
            }
        }
        Ok(())
    }

    /// Return previously deducted quantities. Lines whose product has since
    /// been delisted are skipped.
    pub fn restore_all(&self, lines: &[StockDeduction]) {
        let mut products = self.write();
        for (id, quantity) in merge(lines) {
            if let Some(product) = products.get_mut(&id) {
                *product = product.with_stock(product.stock().saturating_add(quantity));
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<ProductId, Product>> {
        // Mutations validate before writing, so a poisoned map is still consistent.
        self.products.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<ProductId, Product>> {
        self.products.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn merge(lines: &[StockDeduction]) -> BTreeMap<ProductId, u32> {
    let mut merged: BTreeMap<ProductId, u32> = BTreeMap::new();
    for line in lines {
        let entry = merged.entry(line.product_id).or_default();
        *entry = entry.saturating_add(line.quantity);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::Category;
    use nexus_core::SequentialIdGenerator;
    use proptest::prelude::*;

    fn listing(price: u64, stock: u32) -> NewProduct {
        NewProduct {
            name: "Kurta".to_string(),
            brand: "Nexus".to_string(),
            category: Category::Unisex,
            description: String::new(),
            price,
            stock,
        }
    }

    fn seeded(stocks: &[u32]) -> (CatalogStore, Vec<ProductId>) {
        let store = CatalogStore::new();
        let ids = SequentialIdGenerator::new();
        let seller = UserId::new();
        let pids = stocks
            .iter()
            .map(|s| store.add_product(&ids, seller, listing(500, *s)).unwrap().id_typed())
            .collect();
        (store, pids)
    }

    #[test]
    fn only_moderated_products_are_visible() {
        let (store, pids) = seeded(&[1, 1]);
        store.set_moderation(pids[0], true).unwrap();

        let visible = store.visible_products();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id_typed(), pids[0]);
        assert_eq!(store.pending_moderation(), 1);
    }

    #[test]
    fn another_seller_cannot_edit_or_delete() {
        let (store, pids) = seeded(&[3]);
        let intruder = UserId::new();

        let err = store
            .update_product(intruder, pids[0], &ProductUpdate::default())
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));

        let err = store
            .delete_product(CatalogEditor::Seller(intruder), pids[0])
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));

        assert!(store.delete_product(CatalogEditor::Admin, pids[0]).is_ok());
        assert!(store.get(&pids[0]).is_none());
    }

    #[test]
    fn deduct_all_is_all_or_nothing() {
        let (store, pids) = seeded(&[5, 1]);
        let lines = [
            StockDeduction { product_id: pids[0], quantity: 2 },
            StockDeduction { product_id: pids[1], quantity: 2 },
        ];

        let err = store.deduct_all(&lines).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock(_)));
        assert_eq!(store.get(&pids[0]).unwrap().stock(), 5);
        assert_eq!(store.get(&pids[1]).unwrap().stock(), 1);
    }

    #[test]
    fn restore_returns_deducted_units() {
        let (store, pids) = seeded(&[4]);
        let lines = [StockDeduction { product_id: pids[0], quantity: 3 }];

        store.deduct_all(&lines).unwrap();
        assert_eq!(store.get(&pids[0]).unwrap().stock(), 1);

        store.restore_all(&lines);
        assert_eq!(store.get(&pids[0]).unwrap().stock(), 4);
    }

    #[test]
    fn restock_rejects_zero() {
        let (store, pids) = seeded(&[0]);
        assert!(store.restock(pids[0], 0).is_err());
        assert_eq!(store.restock(pids[0], 7).unwrap(), 7);
    }

    #[test]
    fn restock_updates_the_stored_listing_only() {
        let (store, pids) = seeded(&[2]);
        store.set_moderation(pids[0], true).unwrap();

        assert_eq!(store.restock(pids[0], 3).unwrap(), 5);

        let stored = store.get(&pids[0]).unwrap();
        assert_eq!(stored.stock(), 5);
        assert_eq!(stored.price(), 500);
        assert!(stored.is_moderated());
        assert!(matches!(
            store.restock(ProductId::new(nexus_core::AggregateId::new()), 1),
            Err(DomainError::NotFound(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: whatever sequence of deductions is attempted, each one
        /// either applies fully or leaves stock untouched.
        #[test]
        fn deductions_never_overdraw(
            initial in prop::collection::vec(0u32..20, 1..5),
            attempts in prop::collection::vec(prop::collection::vec((0usize..5, 1u32..8), 1..4), 1..20)
        ) {
            let (store, pids) = seeded(&initial);
            let mut expected: Vec<u32> = initial.clone();

            for attempt in attempts {
                let lines: Vec<StockDeduction> = attempt
                    .iter()
                    .map(|(idx, qty)| StockDeduction { product_id: pids[idx % pids.len()], quantity: *qty })
                    .collect();

                let mut wanted = vec![0u32; pids.len()];
                for (idx, qty) in &attempt {
                    wanted[idx % pids.len()] += qty;
                }
                let fits = wanted.iter().zip(&expected).all(|(w, have)| w <= have);

                let result = store.deduct_all(&lines);
                prop_assert_eq!(result.is_ok(), fits);
                if fits {
                    for (slot, w) in expected.iter_mut().zip(&wanted) {
                        *slot -= w;
                    }
                }

                for (pid, stock) in pids.iter().zip(&expected) {
                    prop_assert_eq!(store.get(pid).unwrap().stock(), *stock);
                }
            }
        }
    }
}
