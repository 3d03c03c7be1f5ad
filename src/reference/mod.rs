//! Reference data - the read-mostly tables the engine consumes by value
//!
//! Materials with their density and coefficients, base cutting conditions per
//! (feature type, cutting mode), drilling diameter buckets, thread pass
//! counts, work center rates and stock price tiers.
//!
//! All lookups are by exact key. A missing entry is an
//! [`EstimateError::UnresolvedCondition`], never a default.

use serde::{Deserialize, Serialize};

pub mod conditions;
pub mod library;
pub mod materials;

pub use conditions::*;
pub use library::default_library;
pub use materials::*;

use crate::error::{EstimateError, Lookup, Result};
use crate::model::{CuttingMode, FeatureType};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLibrary {
    #[serde(default)]
    pub materials: Vec<MaterialGroup>,
    #[serde(default)]
    pub cutting_conditions: Vec<CuttingConditionRow>,
    #[serde(default)]
    pub drill_buckets: Vec<DrillBucket>,
    #[serde(default)]
    pub thread_passes: Vec<ThreadPassRow>,
    #[serde(default)]
    pub work_centers: Vec<WorkCenter>,
    #[serde(default)]
    pub price_tiers: Vec<PriceTier>,
}

impl ReferenceLibrary {
    pub fn material(&self, id: &str) -> Result<&MaterialGroup> {
        self.materials
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| EstimateError::unresolved(Lookup::Material(id.to_string())))
    }

    pub fn condition(&self, feature_type: FeatureType, mode: CuttingMode) -> Result<&CuttingConditionRow> {
        self.cutting_conditions
            .iter()
            .find(|row| row.feature_type == feature_type && row.mode == mode)
            .ok_or_else(|| {
                EstimateError::unresolved(Lookup::CuttingCondition { feature_type, mode })
            })
    }

    pub fn work_center(&self, id: &str) -> Result<&WorkCenter> {
        self.work_centers
            .iter()
            .find(|wc| wc.id == id)
            .ok_or_else(|| EstimateError::unresolved(Lookup::WorkCenter(id.to_string())))
    }

    /// Tiers of one price category, in table order
    pub fn tiers<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a PriceTier> + 'a {
        self.price_tiers.iter().filter(move |t| t.category == category)
    }

    /// List material ids
    pub fn list_materials(&self) -> Vec<&str> {
        self.materials.iter().map(|m| m.id.as_str()).collect()
    }

    /// Mutable price tiers of a category, for reference administration
    pub fn tiers_mut<'a>(&'a mut self, category: &'a str) -> impl Iterator<Item = &'a mut PriceTier> + 'a {
        self.price_tiers.iter_mut().filter(move |t| t.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_library_has_every_conditioned_row() {
        let lib = default_library();
        for feature_type in FeatureType::ALL {
            if !feature_type.needs_conditions() {
                continue;
            }
            for mode in [CuttingMode::Low, CuttingMode::Mid, CuttingMode::High] {
                assert!(
                    lib.condition(feature_type, mode).is_ok(),
                    "missing row ({}, {})",
                    feature_type,
                    mode
                );
            }
        }
    }

    #[test]
    fn test_missing_material_is_unresolved() {
        let lib = default_library();
        let err = lib.material("Unobtainium").unwrap_err();
        assert_eq!(
            err,
            EstimateError::UnresolvedCondition {
                lookup: Lookup::Material("Unobtainium".to_string())
            }
        );
    }

    #[test]
    fn test_missing_row_is_unresolved() {
        let mut lib = default_library();
        lib.cutting_conditions
            .retain(|row| !(row.feature_type == FeatureType::Boring && row.mode == CuttingMode::High));

        let err = lib.condition(FeatureType::Boring, CuttingMode::High).unwrap_err();
        assert!(matches!(
            err,
            EstimateError::UnresolvedCondition {
                lookup: Lookup::CuttingCondition {
                    feature_type: FeatureType::Boring,
                    mode: CuttingMode::High
                }
            }
        ));
        assert!(lib.condition(FeatureType::Boring, CuttingMode::Mid).is_ok());
    }

    #[test]
    fn test_tiers_filter_by_category() {
        let lib = default_library();
        assert!(lib.tiers("steel-bar").count() >= 2);
        assert!(lib.tiers("steel-bar").all(|t| t.category == "steel-bar"));
        assert_eq!(lib.tiers("gold-bar").count(), 0);
    }
}
