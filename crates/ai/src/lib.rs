//! `nexus-ai`
//!
//! **Responsibility:** boundary to the generative shopping assistant.
//!
//! This crate is not part of the transaction engine:
//! - It only reads catalog snapshots; it never mutates products or orders.
//! - Calls are slow and may fail, so callers get text back, never an error
//!   that could block checkout or fulfillment.

pub mod advisor;
pub mod guarded;
pub mod offline;
pub mod snapshot;

pub use advisor::{AiError, ShoppingAdvisor};
pub use guarded::{ADVICE_FALLBACK, DESCRIPTION_FALLBACK, GuardedAdvisor};
pub use offline::OfflineAdvisor;
pub use snapshot::{CatalogSnapshot, SnapshotItem};
