//! Machining features - one atomic cutting (or handling) step each

use serde::{Deserialize, Serialize};

use super::FeatureId;
use crate::error::{EstimateError, Result};
use crate::locking::Lockable;

/// Closed catalog of feature types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    Facing,
    OdRough,
    OdFinish,
    IdRough,
    IdFinish,
    Boring,
    Grooving,
    Drilling,
    DeepDrilling,
    ThreadExternal,
    ThreadInternal,
    PocketMilling,
    ContourMilling,
    Deburring,
    Washing,
    Inspection,
    Packing,
    Honing,
    Polishing,
    ChamferTouchUp,
    RadiusTouchUp,
}

/// Formula family a feature type is timed with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureFamily {
    Turning,
    Drilling,
    Milling,
    Threading,
    ConstantTime,
}

impl FeatureType {
    pub const ALL: [FeatureType; 21] = [
        FeatureType::Facing,
        FeatureType::OdRough,
        FeatureType::OdFinish,
        FeatureType::IdRough,
        FeatureType::IdFinish,
        FeatureType::Boring,
        FeatureType::Grooving,
        FeatureType::Drilling,
        FeatureType::DeepDrilling,
        FeatureType::ThreadExternal,
        FeatureType::ThreadInternal,
        FeatureType::PocketMilling,
        FeatureType::ContourMilling,
        FeatureType::Deburring,
        FeatureType::Washing,
        FeatureType::Inspection,
        FeatureType::Packing,
        FeatureType::Honing,
        FeatureType::Polishing,
        FeatureType::ChamferTouchUp,
        FeatureType::RadiusTouchUp,
    ];

    pub fn family(self) -> FeatureFamily {
        use FeatureType::*;
        match self {
            Facing | OdRough | OdFinish | IdRough | IdFinish | Boring | Grooving => {
                FeatureFamily::Turning
            }
            Drilling | DeepDrilling => FeatureFamily::Drilling,
            PocketMilling | ContourMilling => FeatureFamily::Milling,
            ThreadExternal | ThreadInternal => FeatureFamily::Threading,
            Deburring | Washing | Inspection | Packing | Honing | Polishing | ChamferTouchUp
            | RadiusTouchUp => FeatureFamily::ConstantTime,
        }
    }

    /// Whether the resolver supplies speed/feed/depth for this type
    pub fn needs_conditions(self) -> bool {
        self.family() != FeatureFamily::ConstantTime
    }

    /// Geometry a formula cannot do without
    pub fn required_geometry(self) -> &'static [GeometryField] {
        use GeometryField::*;
        match self {
            FeatureType::Facing => &[FromDiameter, Depth],
            FeatureType::Grooving => &[FromDiameter, ToDiameter, Width],
            FeatureType::OdRough
            | FeatureType::OdFinish
            | FeatureType::IdRough
            | FeatureType::IdFinish
            | FeatureType::Boring => &[FromDiameter, ToDiameter, Length],
            FeatureType::Drilling | FeatureType::DeepDrilling => &[ToDiameter, Depth],
            FeatureType::PocketMilling | FeatureType::ContourMilling => {
                &[PocketLength, PocketWidth, Depth, CornerRadius]
            }
            FeatureType::ThreadExternal | FeatureType::ThreadInternal => {
                &[ToDiameter, Pitch, Length]
            }
            _ => &[],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeatureType::Facing => "facing",
            FeatureType::OdRough => "od_rough",
            FeatureType::OdFinish => "od_finish",
            FeatureType::IdRough => "id_rough",
            FeatureType::IdFinish => "id_finish",
            FeatureType::Boring => "boring",
            FeatureType::Grooving => "grooving",
            FeatureType::Drilling => "drilling",
            FeatureType::DeepDrilling => "deep_drilling",
            FeatureType::ThreadExternal => "thread_external",
            FeatureType::ThreadInternal => "thread_internal",
            FeatureType::PocketMilling => "pocket_milling",
            FeatureType::ContourMilling => "contour_milling",
            FeatureType::Deburring => "deburring",
            FeatureType::Washing => "washing",
            FeatureType::Inspection => "inspection",
            FeatureType::Packing => "packing",
            FeatureType::Honing => "honing",
            FeatureType::Polishing => "polishing",
            FeatureType::ChamferTouchUp => "chamfer_touch_up",
            FeatureType::RadiusTouchUp => "radius_touch_up",
        }
    }
}

impl std::fmt::Display for FeatureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FeatureType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        FeatureType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown feature type: {}", s))
    }
}

/// Named geometry slot, used for validation messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryField {
    FromDiameter,
    ToDiameter,
    Length,
    Depth,
    Width,
    PocketLength,
    PocketWidth,
    CornerRadius,
    Pitch,
}

impl GeometryField {
    pub fn name(self) -> &'static str {
        match self {
            GeometryField::FromDiameter => "from_diameter",
            GeometryField::ToDiameter => "to_diameter",
            GeometryField::Length => "length",
            GeometryField::Depth => "depth",
            GeometryField::Width => "width",
            GeometryField::PocketLength => "pocket_length",
            GeometryField::PocketWidth => "pocket_width",
            GeometryField::CornerRadius => "corner_radius",
            GeometryField::Pitch => "pitch",
        }
    }
}

fn one() -> u32 {
    1
}

/// Scalar geometry extracted from the drawing (mm)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_diameter: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_diameter: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pocket_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pocket_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f64>,
    /// How many identical instances the feature stands for
    #[serde(default = "one")]
    pub count: u32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            from_diameter: None,
            to_diameter: None,
            length: None,
            depth: None,
            width: None,
            pocket_length: None,
            pocket_width: None,
            corner_radius: None,
            pitch: None,
            count: 1,
        }
    }
}

impl Geometry {
    pub fn get(&self, field: GeometryField) -> Option<f64> {
        match field {
            GeometryField::FromDiameter => self.from_diameter,
            GeometryField::ToDiameter => self.to_diameter,
            GeometryField::Length => self.length,
            GeometryField::Depth => self.depth,
            GeometryField::Width => self.width,
            GeometryField::PocketLength => self.pocket_length,
            GeometryField::PocketWidth => self.pocket_width,
            GeometryField::CornerRadius => self.corner_radius,
            GeometryField::Pitch => self.pitch,
        }
    }

    /// Positive, finite value of a required slot
    pub fn require(&self, field: GeometryField, entity: &str) -> Result<f64> {
        match self.get(field) {
            Some(v) if v > 0.0 && v.is_finite() => Ok(v),
            other => Err(EstimateError::geometry(entity, field.name(), other)),
        }
    }
}

/// One machining step within an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub feature_type: FeatureType,
    pub geometry: Geometry,
    /// Cutting speed Vc (m/min)
    pub speed: Lockable,
    /// Feed (mm/rev, mm/tooth for milling, pitch for threading)
    pub feed: Lockable,
    /// Depth of cut Ap (mm)
    pub depth_of_cut: Lockable,
    /// Cutting passes of the last computation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passes: Option<u32>,
    /// Peck cycles when drilled with the deep-hole model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peck_cycles: Option<u32>,
    pub predicted_seconds: f64,
    pub version: u64,
}

impl Feature {
    pub fn new(feature_type: FeatureType, geometry: Geometry) -> Self {
        Self {
            id: FeatureId::new(),
            feature_type,
            geometry,
            speed: Lockable::Pending,
            feed: Lockable::Pending,
            depth_of_cut: Lockable::Pending,
            passes: None,
            peck_cycles: None,
            predicted_seconds: 0.0,
            version: 1,
        }
    }

    pub fn label(&self) -> String {
        format!("feature {} ({})", self.id, self.feature_type)
    }
}
