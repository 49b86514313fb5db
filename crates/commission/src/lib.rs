//! Commission engine.
//!
//! Pure arithmetic over a platform-wide commission/GST configuration, plus the
//! administrator-facing settings holder that validates every change.
//!
//! GST is informational: it is reported alongside a price or total but never
//! added to what the buyer pays.

pub mod commission;
pub mod settings;

pub use commission::{EarningsBreakdown, gst_component, net_earnings, platform_take};
pub use settings::{Percentage, PlatformSettings, SettingsStore};
