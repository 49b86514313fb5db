use serde::{Deserialize, Serialize};

use nexus_core::{AggregateId, DomainError, DomainResult, UserId};

/// Product identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Men,
    Women,
    Unisex,
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Category::Men => "Men",
            Category::Women => "Women",
            Category::Unisex => "Unisex",
        };
        f.write_str(s)
    }
}

/// Catalog record.
///
/// `stock` is unsigned, so it can never go below zero; the store refuses any
/// deduction larger than what is on hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    seller_id: UserId,
    name: String,
    brand: String,
    category: Category,
    description: String,
    /// Price in smallest currency unit.
    price: u64,
    stock: u32,
    is_moderated: bool,
}

/// Seller input for a new listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub brand: String,
    pub category: Category,
    pub description: String,
    pub price: u64,
    pub stock: u32,
}

/// Partial seller edit. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<u64>,
    pub stock: Option<u32>,
}

/// Highest listable unit price, in the smallest currency unit.
pub const MAX_PRICE: u64 = 1_000_000_000_000;

fn validate_price(price: u64) -> DomainResult<()> {
    if price == 0 {
        return Err(DomainError::validation("price must be positive"));
    }
    if price > MAX_PRICE {
        return Err(DomainError::validation(format!("price cannot exceed {MAX_PRICE}")));
    }
    Ok(())
}

impl NewProduct {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        validate_price(self.price)
    }
}

impl Product {
    /// Build a listing from seller input. New listings start unmoderated.
    pub fn list(id: ProductId, seller_id: UserId, input: NewProduct) -> DomainResult<Self> {
        input.validate()?;
        Ok(Self {
            id,
            seller_id,
            name: input.name,
            brand: input.brand,
            category: input.category,
            description: input.description,
            price: input.price,
            stock: input.stock,
            is_moderated: false,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn seller_id(&self) -> UserId {
        self.seller_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn brand(&self) -> &str {
        &self.brand
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn stock(&self) -> u32 {
        self.stock
    }

    pub fn is_moderated(&self) -> bool {
        self.is_moderated
    }

    pub fn is_in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Apply a seller edit, returning the edited copy.
    pub fn updated(&self, update: &ProductUpdate) -> DomainResult<Self> {
        let mut next = self.clone();
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
            next.name = name.clone();
        }
        if let Some(description) = &update.description {
            next.description = description.clone();
        }
        if let Some(price) = update.price {
            validate_price(price)?;
            next.price = price;
        }
        if let Some(stock) = update.stock {
            next.stock = stock;
        }
        Ok(next)
    }

    pub fn moderated(&self, is_moderated: bool) -> Self {
        Self {
            is_moderated,
            ..self.clone()
        }
    }

    pub(crate) fn with_stock(&self, stock: u32) -> Self {
        Self {
            stock,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shirt() -> NewProduct {
        NewProduct {
            name: "Linen Shirt".to_string(),
            brand: "Nexus".to_string(),
            category: Category::Men,
            description: "Relaxed fit".to_string(),
            price: 1999,
            stock: 10,
        }
    }

    #[test]
    fn new_listing_starts_unmoderated() {
        let p = Product::list(ProductId::new(AggregateId::new()), UserId::new(), shirt()).unwrap();
        assert!(!p.is_moderated());
        assert_eq!(p.price(), 1999);
        assert_eq!(p.stock(), 10);
    }

    #[test]
    fn listing_rejects_zero_price_and_blank_name() {
        let id = ProductId::new(AggregateId::new());

        let mut free = shirt();
        free.price = 0;
        assert!(matches!(
            Product::list(id, UserId::new(), free),
            Err(DomainError::Validation(_))
        ));

        let mut blank = shirt();
        blank.name = "  ".to_string();
        assert!(matches!(
            Product::list(id, UserId::new(), blank),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn price_is_capped_on_listing_and_edit() {
        let id = ProductId::new(AggregateId::new());

        let mut priciest = shirt();
        priciest.price = MAX_PRICE;
        let listed = Product::list(id, UserId::new(), priciest).unwrap();

        let mut over = shirt();
        over.price = MAX_PRICE + 1;
        assert!(matches!(
            Product::list(id, UserId::new(), over),
            Err(DomainError::Validation(_))
        ));

        let edit = ProductUpdate {
            price: Some(u64::MAX / 2 + 1),
            ..ProductUpdate::default()
        };
        assert!(matches!(listed.updated(&edit), Err(DomainError::Validation(_))));
    }

    #[test]
    fn update_leaves_original_untouched() {
        let p = Product::list(ProductId::new(AggregateId::new()), UserId::new(), shirt()).unwrap();
        let edited = p
            .updated(&ProductUpdate {
                price: Some(2499),
                ..ProductUpdate::default()
            })
            .unwrap();

        assert_eq!(edited.price(), 2499);
        assert_eq!(p.price(), 1999);
        assert_eq!(edited.name(), p.name());
    }
}
