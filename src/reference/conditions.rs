//! Cutting condition tables, rates and price tiers

use serde::{Deserialize, Serialize};

use super::ThreadCategory;
use crate::model::{CuttingMode, FeatureType};

/// Base cutting values for one (feature type, cutting mode) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuttingConditionRow {
    pub feature_type: FeatureType,
    pub mode: CuttingMode,
    /// Vc, m/min
    pub speed: f64,
    /// mm/rev (mm/tooth for milling)
    pub feed: f64,
    /// Ap, mm
    pub depth_of_cut: f64,
}

/// Drilling speed/feed scaling for holes up to `max_diameter`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillBucket {
    pub max_diameter: f64,
    pub speed_coefficient: f64,
    pub feed_coefficient: f64,
}

/// Pass count for pitches in `[pitch_min, pitch_max)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadPassRow {
    pub category: ThreadCategory,
    pub pitch_min: f64,
    pub pitch_max: f64,
    pub passes: u32,
}

impl ThreadPassRow {
    pub fn contains(&self, pitch: f64) -> bool {
        pitch >= self.pitch_min && pitch < self.pitch_max
    }

    fn width(&self) -> f64 {
        self.pitch_max - self.pitch_min
    }

    /// Narrower range wins, then the lower bound
    pub fn is_narrower_than(&self, other: &ThreadPassRow) -> bool {
        self.width() < other.width()
            || (self.width() == other.width() && self.pitch_min < other.pitch_min)
    }
}

/// Machine or work center with its hourly rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkCenter {
    pub id: String,
    pub name: String,
    /// Currency per hour
    pub hourly_rate: f64,
    /// Setup time suggested when the operation does not lock its own
    #[serde(default)]
    pub default_setup_minutes: f64,
}

/// What a tier breakpoint is compared against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierBasis {
    /// Batch stock mass in kg
    #[default]
    Weight,
    /// Batch quantity in pieces
    Quantity,
}

impl std::fmt::Display for TierBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TierBasis::Weight => write!(f, "kg"),
            TierBasis::Quantity => write!(f, "pcs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTier {
    pub category: String,
    #[serde(default)]
    pub basis: TierBasis,
    pub breakpoint: f64,
    pub price_per_kg: f64,
}

impl PriceTier {
    /// Whether this tier applies to a batch of the given mass and quantity
    pub fn applies(&self, batch_mass_kg: f64, quantity: u32) -> bool {
        let measure = match self.basis {
            TierBasis::Weight => batch_mass_kg,
            TierBasis::Quantity => quantity as f64,
        };
        self.breakpoint <= measure
    }
}
