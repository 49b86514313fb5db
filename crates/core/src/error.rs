//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every failure here is recoverable at the caller boundary; none of them is
/// fatal to the process. Infrastructure concerns (payment gateway, stores)
/// wrap this type instead of extending it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. empty product name, zero quantity).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (or is not visible to the caller).
    #[error("not found: {0}")]
    NotFound(String),

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The actor is not allowed to act on this resource.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The product has no stock left to add to a cart.
    #[error("out of stock: {0}")]
    OutOfStock(String),

    /// Checkout was requested on a cart with no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// Stock was depleted between add-to-cart and checkout commit.
    #[error("insufficient stock: {0}")]
    InsufficientStock(String),

    /// The order lifecycle does not allow the requested move.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Logistics can only be bound to a paid order.
    #[error("order is not payable: {0}")]
    NotPayable(String),

    /// A logistics partner is already bound to the order.
    #[error("logistics partner already assigned: {0}")]
    AlreadyAssigned(String),

    /// Commission / tax settings out of range.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn out_of_stock(what: impl Into<String>) -> Self {
        Self::OutOfStock(what.into())
    }

    pub fn insufficient_stock(what: impl Into<String>) -> Self {
        Self::InsufficientStock(what.into())
    }

    pub fn invalid_transition(
        from: impl core::fmt::Display,
        to: impl core::fmt::Display,
    ) -> Self {
        Self::InvalidTransition(format!("{from} -> {to}"))
    }

    pub fn not_payable(msg: impl Into<String>) -> Self {
        Self::NotPayable(msg.into())
    }

    pub fn already_assigned(msg: impl Into<String>) -> Self {
        Self::AlreadyAssigned(msg.into())
    }

    pub fn invalid_settings(msg: impl Into<String>) -> Self {
        Self::InvalidSettings(msg.into())
    }
}
