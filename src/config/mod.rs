//! Engine configuration
//!
//! Formula constants that shops tune to their own machines. Anything not set
//! in the JSON file keeps its built-in default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{EstimateError, LoadError, Lookup, Result};
use crate::model::{FeatureFamily, FeatureType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Approach + run-out added to every turning cut (mm)
    pub turning_overtravel_mm: f64,

    /// Depth/diameter ratio above which drilling switches to the peck cycle
    pub deep_hole_ratio: f64,

    /// Peck depth as a multiple of the drill diameter
    pub peck_depth_ratio: f64,

    /// Share of peck cycle time spent cutting; naive time is divided by it
    pub peck_efficiency: f64,

    /// Radial engagement as a fraction of the milling tool diameter
    pub milling_engagement_ratio: f64,

    /// Largest end mill the shop will pick for pockets (mm)
    pub milling_tool_cap_mm: f64,

    /// Teeth on the pocketing end mill
    pub milling_teeth: u32,

    /// Fixed duration per constant-time step (seconds)
    pub step_seconds: BTreeMap<FeatureType, f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let step_seconds = BTreeMap::from([
            (FeatureType::Deburring, 60.0),
            (FeatureType::Washing, 30.0),
            (FeatureType::Inspection, 120.0),
            (FeatureType::Packing, 20.0),
            (FeatureType::Honing, 90.0),
            (FeatureType::Polishing, 120.0),
            (FeatureType::ChamferTouchUp, 15.0),
            (FeatureType::RadiusTouchUp, 15.0),
        ]);

        Self {
            turning_overtravel_mm: 2.0,
            deep_hole_ratio: 3.0,
            peck_depth_ratio: 2.0,
            peck_efficiency: 0.8,
            milling_engagement_ratio: 0.5,
            milling_tool_cap_mm: 20.0,
            milling_teeth: 3,
            step_seconds,
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> std::result::Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json(&content)?;
        tracing::info!(path = %path.display(), "loaded engine configuration");
        Ok(config)
    }

    /// Parse and validate. Step durations given in the file replace the
    /// defaults one by one; omitted ones stay.
    pub fn from_json(json: &str) -> std::result::Result<Self, LoadError> {
        #[derive(Deserialize)]
        struct Partial {
            #[serde(flatten)]
            config: EngineConfig,
            #[serde(default)]
            step_seconds: Option<BTreeMap<FeatureType, f64>>,
        }

        let partial: Partial = serde_json::from_str(json)?;
        let mut config = partial.config;
        config.step_seconds = EngineConfig::default().step_seconds;
        if let Some(steps) = partial.step_seconds {
            config.step_seconds.extend(steps);
        }
        config.check()?;
        Ok(config)
    }

    pub fn check(&self) -> std::result::Result<(), LoadError> {
        let invalid = |msg: &str| Err(LoadError::Invalid(msg.to_string()));

        if self.turning_overtravel_mm < 0.0 {
            return invalid("turning_overtravel_mm must not be negative");
        }
        if self.deep_hole_ratio <= 0.0 || self.peck_depth_ratio <= 0.0 {
            return invalid("deep_hole_ratio and peck_depth_ratio must be positive");
        }
        if !(self.peck_efficiency > 0.0 && self.peck_efficiency < 1.0) {
            return invalid("peck_efficiency must be in (0, 1)");
        }
        if !(self.milling_engagement_ratio > 0.0 && self.milling_engagement_ratio <= 1.0) {
            return invalid("milling_engagement_ratio must be in (0, 1]");
        }
        if self.milling_tool_cap_mm <= 0.0 || self.milling_teeth == 0 {
            return invalid("milling tool cap and tooth count must be positive");
        }
        for (feature_type, seconds) in &self.step_seconds {
            if feature_type.family() != FeatureFamily::ConstantTime {
                return Err(LoadError::Invalid(format!(
                    "'{}' is not a constant-time step",
                    feature_type
                )));
            }
            if *seconds < 0.0 {
                return Err(LoadError::Invalid(format!(
                    "duration of '{}' must not be negative",
                    feature_type
                )));
            }
        }
        Ok(())
    }

    pub fn step_seconds(&self, feature_type: FeatureType) -> Result<f64> {
        self.step_seconds
            .get(&feature_type)
            .copied()
            .ok_or_else(|| EstimateError::unresolved(Lookup::StepDuration(feature_type)))
    }
}
