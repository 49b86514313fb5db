//! Catalog store (collaborator of the transaction engine).
//!
//! Holds product records; the engine reads price/seller and mutates `stock`.
//! Sellers edit their own listings and the administrator moderates visibility.

pub mod product;
pub mod store;

pub use product::{Category, MAX_PRICE, NewProduct, Product, ProductId, ProductUpdate};
pub use store::{CatalogEditor, CatalogStore, StockDeduction};
