//! Cutting condition resolution
//!
//! Turns a (material, feature type, cutting mode, geometry) request into the
//! concrete speed, feed and depth of cut the time formulas run on:
//!
//! - base row from the condition table, scaled by the material coefficients
//! - drilling: extra scaling by the diameter bucket of the hole
//! - threading: pass count from the thread table, feed = pitch
//!
//! Constant-time steps never reach the resolver.

use serde::{Deserialize, Serialize};

use crate::error::{EstimateError, Lookup, Result};
use crate::model::{CuttingMode, FeatureFamily, FeatureType, Geometry, GeometryField};
use crate::reference::{DrillBucket, MaterialGroup, ReferenceLibrary, ThreadPassRow};

/// Recommended cutting values for one feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConditions {
    /// Vc, m/min
    pub speed: f64,
    /// mm/rev, mm/tooth for milling
    pub feed: f64,
    /// Ap, mm
    pub depth_of_cut: f64,
    /// Threading only
    pub passes: Option<u32>,
}

/// Resolve cutting conditions for a conditioned feature type
pub fn resolve(
    library: &ReferenceLibrary,
    material_id: &str,
    feature_type: FeatureType,
    mode: CuttingMode,
    geometry: &Geometry,
) -> Result<ResolvedConditions> {
    let material = library.material(material_id)?;
    let row = library.condition(feature_type, mode)?;

    let mut resolved = ResolvedConditions {
        speed: row.speed * material.speed_coefficient,
        feed: row.feed * material.feed_coefficient,
        depth_of_cut: row.depth_of_cut,
        passes: None,
    };

    match feature_type.family() {
        FeatureFamily::Drilling => {
            let diameter = geometry.require(GeometryField::ToDiameter, feature_type.as_str())?;
            let bucket = select_drill_bucket(&library.drill_buckets, diameter)?;
            resolved.speed *= bucket.speed_coefficient;
            resolved.feed *= bucket.feed_coefficient;
        }
        FeatureFamily::Threading => {
            let pitch = geometry.require(GeometryField::Pitch, feature_type.as_str())?;
            resolved.passes = Some(thread_passes(library, material, pitch)?);
            resolved.feed = pitch;
        }
        FeatureFamily::Turning | FeatureFamily::Milling => {}
        FeatureFamily::ConstantTime => {
            return Err(EstimateError::unresolved(Lookup::CuttingCondition {
                feature_type,
                mode,
            }));
        }
    }

    tracing::debug!(
        material = material_id,
        %feature_type,
        %mode,
        speed = resolved.speed,
        feed = resolved.feed,
        depth_of_cut = resolved.depth_of_cut,
        passes = ?resolved.passes,
        "resolved cutting conditions"
    );

    Ok(resolved)
}

/// Smallest bucket whose upper bound covers the diameter, else the largest
pub fn select_drill_bucket(buckets: &[DrillBucket], diameter: f64) -> Result<&DrillBucket> {
    let covering = buckets
        .iter()
        .filter(|b| b.max_diameter >= diameter)
        .min_by(|a, b| a.max_diameter.total_cmp(&b.max_diameter));

    covering
        .or_else(|| {
            buckets
                .iter()
                .max_by(|a, b| a.max_diameter.total_cmp(&b.max_diameter))
        })
        .ok_or_else(|| EstimateError::unresolved(Lookup::DrillBucket { diameter }))
}

fn thread_passes(library: &ReferenceLibrary, material: &MaterialGroup, pitch: f64) -> Result<u32> {
    let category = material.thread_category.ok_or_else(|| {
        EstimateError::unresolved(Lookup::ThreadCategory {
            material: material.id.clone(),
        })
    })?;

    let mut best: Option<&ThreadPassRow> = None;
    for row in library
        .thread_passes
        .iter()
        .filter(|row| row.category == category && row.contains(pitch))
    {
        best = match best {
            Some(current) if !row.is_narrower_than(current) => Some(current),
            _ => Some(row),
        };
    }

    best.map(|row| row.passes)
        .ok_or_else(|| EstimateError::unresolved(Lookup::ThreadPasses { category, pitch }))
}
