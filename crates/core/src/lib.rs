//! `nexus-core` — domain foundation building blocks for the marketplace engine.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, IdGenerator, SequentialIdGenerator, UserId, UuidV7Generator};
pub use value_object::ValueObject;
