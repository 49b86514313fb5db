//! Cart manager: per-session product → quantity lines.
//!
//! The cart never reserves stock; it only refuses to grow a line past what the
//! catalog currently shows. Stock is taken at checkout commit.

pub mod cart;

pub use cart::{Cart, CartLine};
