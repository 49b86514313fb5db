use serde::{Deserialize, Serialize};
use tracing::debug;

use nexus_catalog::{Product, ProductId};
use nexus_core::{DomainError, DomainResult, UserId};

/// One product in the cart. `quantity` is always at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    product: Product,
    quantity: u32,
}

impl CartLine {
    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn product_id(&self) -> ProductId {
        self.product.id_typed()
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn subtotal(&self) -> u64 {
        self.product.price().saturating_mul(u64::from(self.quantity))
    }
}

/// A buyer's cart. Lines are unique per product and kept in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    buyer_id: UserId,
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(buyer_id: UserId) -> Self {
        Self {
            buyer_id,
            lines: Vec::new(),
        }
    }

    pub fn buyer_id(&self) -> UserId {
        self.buyer_id
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product_id() == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Units across all lines (the badge count).
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, l| acc.saturating_add(l.quantity))
    }

    /// `Σ price × quantity`, recomputed on every call. `add_item` refuses any
    /// line that would push this past `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.lines
            .iter()
            .fold(0u64, |acc, l| acc.saturating_add(l.subtotal()))
    }

    /// Total if the line for `product` held `quantity` units instead.
    fn total_with(&self, product: &Product, quantity: u32) -> Option<u64> {
        let product_id = product.id_typed();
        let line = product.price().checked_mul(u64::from(quantity))?;
        self.lines
            .iter()
            .filter(|l| l.product_id() != product_id)
            .try_fold(line, |acc, l| acc.checked_add(l.subtotal()))
    }

    /// Add `quantity` units of `product`, returning the line's new quantity.
    ///
    /// The line keeps the product view passed in most recently.
    pub fn add_item(&mut self, product: &Product, quantity: u32) -> DomainResult<u32> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if !product.is_moderated() {
            return Err(DomainError::not_found(format!(
                "product {} is not available",
                product.id_typed()
            )));
        }
        if !product.is_in_stock() {
            return Err(DomainError::out_of_stock(product.name()));
        }

        let product_id = product.id_typed();
        let existing = self.line(&product_id).map_or(0, |l| l.quantity);
        let wanted = existing.saturating_add(quantity);
        if wanted > product.stock() {
            return Err(DomainError::out_of_stock(format!(
                "{}: only {} available",
                product.name(),
                product.stock()
            )));
        }
        if self.total_with(product, wanted).is_none() {
            return Err(DomainError::validation("cart total exceeds the largest payable amount"));
        }

        match self.lines.iter_mut().find(|l| l.product_id() == product_id) {
            Some(line) => {
                line.product = product.clone();
                line.quantity = wanted;
            }
            None => self.lines.push(CartLine {
                product: product.clone(),
                quantity: wanted,
            }),
        }
        debug!(buyer_id = %self.buyer_id, product_id = %product_id, quantity = wanted, "cart line set");
        Ok(wanted)
    }

    /// Take one unit off a line; the line disappears when it reaches zero.
    /// Returns the remaining quantity.
    pub fn remove_item(&mut self, product_id: &ProductId) -> DomainResult<u32> {
        let idx = self
            .lines
            .iter()
            .position(|l| &l.product_id() == product_id)
            .ok_or_else(|| DomainError::not_found(format!("product {product_id} not in cart")))?;

        let remaining = self.lines[idx].quantity - 1;
        if remaining == 0 {
            self.lines.remove(idx);
        } else {
            self.lines[idx].quantity = remaining;
        }
        debug!(buyer_id = %self.buyer_id, product_id = %product_id, remaining, "cart line decremented");
        Ok(remaining)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
