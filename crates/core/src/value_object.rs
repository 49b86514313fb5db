//! Value object trait: equality by value, not identity.
//!
//! Percentages, order line snapshots and tracking numbers are value objects:
//! two instances holding the same values are the same thing, and "changing"
//! one means building a new one.

/// Marker trait for immutable, value-compared domain objects.
///
/// ```ignore
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// struct Percentage { basis_points: u32 }
///
/// impl ValueObject for Percentage {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
