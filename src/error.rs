//! Error taxonomy for the estimation engine
//!
//! Every variant carries enough context (entity, requested combination or
//! conflicting versions) for a caller to explain it without re-deriving state.

use std::fmt;
use thiserror::Error;

use crate::model::{BatchId, CuttingMode, FeatureType};
use crate::reference::ThreadCategory;

/// The reference table a failed lookup was aimed at
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    CuttingCondition {
        feature_type: FeatureType,
        mode: CuttingMode,
    },
    Material(String),
    DrillBucket {
        diameter: f64,
    },
    ThreadCategory {
        material: String,
    },
    ThreadPasses {
        category: ThreadCategory,
        pitch: f64,
    },
    StepDuration(FeatureType),
    WorkCenter(String),
    PriceTier {
        category: String,
        batch_mass_kg: f64,
        quantity: u32,
    },
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::CuttingCondition { feature_type, mode } => {
                write!(f, "cutting condition row ({}, {})", feature_type, mode)
            }
            Lookup::Material(id) => write!(f, "material group '{}'", id),
            Lookup::DrillBucket { diameter } => {
                write!(f, "drill diameter bucket for {:.3} mm", diameter)
            }
            Lookup::ThreadCategory { material } => {
                write!(f, "thread difficulty category of material '{}'", material)
            }
            Lookup::ThreadPasses { category, pitch } => {
                write!(f, "thread pass count ({}, pitch {} mm)", category, pitch)
            }
            Lookup::StepDuration(feature_type) => {
                write!(f, "fixed duration for '{}'", feature_type)
            }
            Lookup::WorkCenter(id) => write!(f, "work center '{}'", id),
            Lookup::PriceTier {
                category,
                batch_mass_kg,
                quantity,
            } => write!(
                f,
                "price tier in category '{}' for {:.3} kg / {} pcs",
                category, batch_mass_kg, quantity
            ),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimateError {
    #[error("unresolved reference data: no {lookup}")]
    UnresolvedCondition { lookup: Lookup },

    #[error("invalid geometry on {entity}: {field} is {}", describe(.value))]
    InvalidGeometry {
        entity: String,
        field: &'static str,
        value: Option<f64>,
    },

    #[error("version conflict on {entity}: expected v{expected}, stored v{actual}")]
    VersionConflict {
        entity: String,
        expected: u64,
        actual: u64,
    },

    #[error("batch {batch} is frozen: cannot {action}")]
    FrozenState { batch: BatchId, action: &'static str },

    #[error("{entity} not found")]
    NotFound { entity: String },
}

fn describe(value: &Option<f64>) -> String {
    match value {
        Some(v) => format!("{} (must be positive)", v),
        None => "missing".to_string(),
    }
}

impl EstimateError {
    pub fn unresolved(lookup: Lookup) -> Self {
        EstimateError::UnresolvedCondition { lookup }
    }

    pub fn geometry(entity: impl Into<String>, field: &'static str, value: Option<f64>) -> Self {
        EstimateError::InvalidGeometry {
            entity: entity.into(),
            field,
            value,
        }
    }
}

pub type Result<T> = std::result::Result<T, EstimateError>;

/// Failure loading a reference library or engine configuration
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_message_names_field() {
        let err = EstimateError::geometry("feature od_rough", "length", None);
        assert_eq!(
            err.to_string(),
            "invalid geometry on feature od_rough: length is missing"
        );

        let err = EstimateError::geometry("batch", "quantity", Some(0.0));
        assert!(err.to_string().contains("quantity is 0 (must be positive)"));
    }

    #[test]
    fn test_unresolved_message_names_combination() {
        let err = EstimateError::unresolved(Lookup::CuttingCondition {
            feature_type: FeatureType::Boring,
            mode: CuttingMode::High,
        });
        assert_eq!(
            err.to_string(),
            "unresolved reference data: no cutting condition row (boring, high)"
        );
    }
}
