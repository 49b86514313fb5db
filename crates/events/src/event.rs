use chrono::{DateTime, Utc};

/// Metadata every publishable event exposes, independent of its payload.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name, e.g. `marketplace.order.placed`. Never reused for a
    /// different payload shape.
    fn event_type(&self) -> &'static str;

    /// Payload schema revision; bump when fields change meaning.
    fn version(&self) -> u32;

    /// Business time carried by the command, not the wall clock at publish.
    fn occurred_at(&self) -> DateTime<Utc>;
}
