use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::info;

use nexus_core::{DomainError, DomainResult, ValueObject};

const BASIS_POINTS_PER_WHOLE: u32 = 10_000;

/// A percentage in `[0, 100]`, held as basis points (1 bp = 0.01 %).
///
/// Serialized as a plain percent number (`12.5`), matching the admin form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Percentage {
    basis_points: u32,
}

impl Percentage {
    pub const ZERO: Percentage = Percentage { basis_points: 0 };

    /// Parse a percent value, rejecting NaN, negatives and anything over 100.
    pub fn from_percent(percent: f64) -> DomainResult<Self> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(DomainError::invalid_settings(format!(
                "percentage must be within [0, 100], got {percent}"
            )));
        }
        Ok(Self {
            basis_points: (percent * 100.0).round() as u32,
        })
    }

    pub fn from_basis_points(basis_points: u32) -> DomainResult<Self> {
        if basis_points > BASIS_POINTS_PER_WHOLE {
            return Err(DomainError::invalid_settings(format!(
                "percentage must be within [0, 100], got {basis_points} bp"
            )));
        }
        Ok(Self { basis_points })
    }

    pub fn basis_points(&self) -> u32 {
        self.basis_points
    }

    pub fn as_percent(&self) -> f64 {
        f64::from(self.basis_points) / 100.0
    }

    /// This percentage of `amount`, rounded down to the smallest currency unit.
    pub fn of(&self, amount: u64) -> u64 {
        let scaled = u128::from(amount) * u128::from(self.basis_points)
            / u128::from(BASIS_POINTS_PER_WHOLE);
        // basis_points <= 10_000, so the share never exceeds `amount`.
        scaled as u64
    }
}

impl ValueObject for Percentage {}

impl TryFrom<f64> for Percentage {
    type Error = DomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_percent(value)
    }
}

impl From<Percentage> for f64 {
    fn from(value: Percentage) -> Self {
        value.as_percent()
    }
}

impl core::fmt::Display for Percentage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}%", self.as_percent())
    }
}

/// Platform-wide revenue configuration. No per-seller override exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSettings {
    pub commission_percentage: Percentage,
    pub gst_percentage: Percentage,
}

impl PlatformSettings {
    pub fn new(commission_percent: f64, gst_percent: f64) -> DomainResult<Self> {
        Ok(Self {
            commission_percentage: Percentage::from_percent(commission_percent)?,
            gst_percentage: Percentage::from_percent(gst_percent)?,
        })
    }
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            commission_percentage: Percentage { basis_points: 1_200 },
            gst_percentage: Percentage { basis_points: 1_800 },
        }
    }
}

/// Process-wide settings holder, mutated only through the admin setters.
#[derive(Debug, Default)]
pub struct SettingsStore {
    current: RwLock<PlatformSettings>,
}

impl SettingsStore {
    pub fn new(initial: PlatformSettings) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    pub fn current(&self) -> PlatformSettings {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_commission_percentage(&self, percent: f64) -> DomainResult<PlatformSettings> {
        let commission = Percentage::from_percent(percent)?;
        Ok(self.replace(|s| PlatformSettings {
            commission_percentage: commission,
            ..s
        }))
    }

    pub fn set_gst_percentage(&self, percent: f64) -> DomainResult<PlatformSettings> {
        let gst = Percentage::from_percent(percent)?;
        Ok(self.replace(|s| PlatformSettings {
            gst_percentage: gst,
            ..s
        }))
    }

    fn replace(&self, f: impl FnOnce(PlatformSettings) -> PlatformSettings) -> PlatformSettings {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let next = f(*guard);
        *guard = next;
        info!(
            commission = %next.commission_percentage,
            gst = %next.gst_percentage,
            "platform settings updated"
        );
        next
    }
}
