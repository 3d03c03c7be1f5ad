//! Reference library - JSON-based reference tables
//!
//! A library can be loaded from a JSON file; the built-in default covers
//! common steels, stainless, aluminium, brass and acetal.

use std::collections::HashSet;
use std::path::Path;

use super::ReferenceLibrary;
use crate::error::LoadError;

const DEFAULT_LIBRARY: &str = include_str!("default_library.json");

impl ReferenceLibrary {
    /// Load reference library from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let library = Self::from_json(&content)?;
        tracing::info!(
            path = %path.display(),
            materials = library.materials.len(),
            conditions = library.cutting_conditions.len(),
            tiers = library.price_tiers.len(),
            "loaded reference library"
        );
        Ok(library)
    }

    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let library: ReferenceLibrary = serde_json::from_str(json)?;
        library.check()?;
        Ok(library)
    }

    pub fn to_json_pretty(&self) -> Result<String, LoadError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Structural checks the tables must satisfy before the engine trusts them
    pub fn check(&self) -> Result<(), LoadError> {
        let mut rows = HashSet::new();
        for row in &self.cutting_conditions {
            if !rows.insert((row.feature_type, row.mode)) {
                return Err(LoadError::Invalid(format!(
                    "duplicate cutting condition row ({}, {})",
                    row.feature_type, row.mode
                )));
            }
        }

        let mut ids = HashSet::new();
        for material in &self.materials {
            if !ids.insert(material.id.as_str()) {
                return Err(LoadError::Invalid(format!(
                    "duplicate material '{}'",
                    material.id
                )));
            }
            if material.density <= 0.0
                || material.speed_coefficient <= 0.0
                || material.feed_coefficient <= 0.0
            {
                return Err(LoadError::Invalid(format!(
                    "material '{}' needs positive density and coefficients",
                    material.id
                )));
            }
        }

        for row in &self.thread_passes {
            if row.pitch_min >= row.pitch_max || row.passes == 0 {
                return Err(LoadError::Invalid(format!(
                    "thread pass row {} [{}, {}) is empty",
                    row.category, row.pitch_min, row.pitch_max
                )));
            }
        }

        let mut centers = HashSet::new();
        for wc in &self.work_centers {
            if !centers.insert(wc.id.as_str()) {
                return Err(LoadError::Invalid(format!("duplicate work center '{}'", wc.id)));
            }
            if wc.hourly_rate < 0.0 || wc.default_setup_minutes < 0.0 {
                return Err(LoadError::Invalid(format!(
                    "work center '{}' has a negative rate or setup time",
                    wc.id
                )));
            }
        }

        Ok(())
    }
}

/// Default reference library with common materials and a lathe/mill shop
pub fn default_library() -> ReferenceLibrary {
    ReferenceLibrary::from_json(DEFAULT_LIBRARY).expect("built-in reference library is valid")
}
