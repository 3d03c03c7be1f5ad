//! Feature time formulas
//!
//! Every formula is a pure function of feature type, geometry and the
//! effective cutting values, returning seconds for all `count` instances.
//!
//! Spindle speed is `n = 1000·Vc / (π·D)` throughout, with D the mean turned
//! diameter, the hole diameter, the end mill diameter or the thread diameter.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::config::EngineConfig;
use crate::error::{EstimateError, Result};
use crate::model::{FeatureFamily, FeatureType, Geometry, GeometryField};
use crate::resolver::ResolvedConditions;

/// Predicted time of one feature and the counts it was derived from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureTime {
    pub seconds: f64,
    /// Cutting passes per instance (1 for drilling and constant steps)
    pub passes: u32,
    /// Peck cycles when the deep-hole model applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peck_cycles: Option<u32>,
}

/// Compute the predicted time of a feature.
///
/// `values` are the effective cutting values (locked or recommended); they are
/// ignored for constant-time steps and required for everything else.
pub fn feature_time(
    config: &EngineConfig,
    feature_type: FeatureType,
    geometry: &Geometry,
    values: Option<&ResolvedConditions>,
    entity: &str,
) -> Result<FeatureTime> {
    if geometry.count == 0 {
        return Err(EstimateError::geometry(entity, "count", Some(0.0)));
    }

    let cutting = || values.ok_or_else(|| EstimateError::geometry(entity, "speed", None));
    let single = match feature_type.family() {
        FeatureFamily::ConstantTime => FeatureTime {
            seconds: config.step_seconds(feature_type)?,
            passes: 1,
            peck_cycles: None,
        },
        FeatureFamily::Turning => turning(config, feature_type, geometry, cutting()?, entity)?,
        FeatureFamily::Drilling => drilling(config, geometry, cutting()?, entity)?,
        FeatureFamily::Milling => milling(config, geometry, cutting()?, entity)?,
        FeatureFamily::Threading => threading(geometry, cutting()?, entity)?,
    };

    let time = FeatureTime {
        seconds: single.seconds * geometry.count as f64,
        ..single
    };
    tracing::debug!(
        %feature_type,
        entity,
        seconds = time.seconds,
        passes = time.passes,
        count = geometry.count,
        "computed feature time"
    );
    Ok(time)
}

fn positive(value: f64, field: &'static str, entity: &str) -> Result<f64> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(EstimateError::geometry(entity, field, Some(value)))
    }
}

fn spindle_rpm(speed: f64, diameter: f64) -> f64 {
    1000.0 * speed / (PI * diameter)
}

fn pass_count(allowance: f64, depth_of_cut: f64) -> u32 {
    // tolerance keeps 2.0 / 1.0 from rounding up to 3 passes
    ((allowance / depth_of_cut - 1e-9).ceil() as u32).max(1)
}

fn turning(
    config: &EngineConfig,
    feature_type: FeatureType,
    geometry: &Geometry,
    values: &ResolvedConditions,
    entity: &str,
) -> Result<FeatureTime> {
    let from = geometry.require(GeometryField::FromDiameter, entity)?;
    let to = match feature_type {
        // facing may run to centre
        FeatureType::Facing => match geometry.to_diameter {
            Some(v) if v < 0.0 || !v.is_finite() => {
                return Err(EstimateError::geometry(entity, "to_diameter", Some(v)))
            }
            Some(v) => v,
            None => 0.0,
        },
        _ => geometry.require(GeometryField::ToDiameter, entity)?,
    };

    let speed = positive(values.speed, "speed", entity)?;
    let feed = positive(values.feed, "feed", entity)?;
    let depth_of_cut = positive(values.depth_of_cut, "depth_of_cut", entity)?;

    let radial = (from - to).abs() / 2.0;
    let (cut_length, allowance) = match feature_type {
        FeatureType::Facing => (
            positive(radial, "radial sweep", entity)?,
            geometry.require(GeometryField::Depth, entity)?,
        ),
        FeatureType::Grooving => (
            positive(radial, "plunge depth", entity)?,
            geometry.require(GeometryField::Width, entity)?,
        ),
        _ => (
            geometry.require(GeometryField::Length, entity)?,
            positive(radial, "radial allowance", entity)?,
        ),
    };

    let mean_diameter = (from + to) / 2.0;
    let n = spindle_rpm(speed, mean_diameter);
    let passes = pass_count(allowance, depth_of_cut);
    let seconds = (cut_length + config.turning_overtravel_mm) / (n * feed) * 60.0 * passes as f64;

    Ok(FeatureTime {
        seconds,
        passes,
        peck_cycles: None,
    })
}

fn drilling(
    config: &EngineConfig,
    geometry: &Geometry,
    values: &ResolvedConditions,
    entity: &str,
) -> Result<FeatureTime> {
    let diameter = geometry.require(GeometryField::ToDiameter, entity)?;
    let depth = geometry.require(GeometryField::Depth, entity)?;
    let speed = positive(values.speed, "speed", entity)?;
    let feed = positive(values.feed, "feed", entity)?;

    let n = spindle_rpm(speed, diameter);
    let naive = depth / (n * feed) * 60.0;

    if depth > config.deep_hole_ratio * diameter {
        let cycles = (depth / (config.peck_depth_ratio * diameter)).ceil() as u32;
        Ok(FeatureTime {
            seconds: naive / config.peck_efficiency,
            passes: 1,
            peck_cycles: Some(cycles),
        })
    } else {
        Ok(FeatureTime {
            seconds: naive,
            passes: 1,
            peck_cycles: None,
        })
    }
}

fn milling(
    config: &EngineConfig,
    geometry: &Geometry,
    values: &ResolvedConditions,
    entity: &str,
) -> Result<FeatureTime> {
    let pocket_length = geometry.require(GeometryField::PocketLength, entity)?;
    let pocket_width = geometry.require(GeometryField::PocketWidth, entity)?;
    let depth = geometry.require(GeometryField::Depth, entity)?;
    let corner = geometry.require(GeometryField::CornerRadius, entity)?;
    let speed = positive(values.speed, "speed", entity)?;
    let feed_per_tooth = positive(values.feed, "feed", entity)?;
    let depth_of_cut = positive(values.depth_of_cut, "depth_of_cut", entity)?;

    let tool_diameter = (2.0 * corner).min(config.milling_tool_cap_mm);
    let engagement = tool_diameter * config.milling_engagement_ratio;
    let passes = pass_count(depth, depth_of_cut);
    let path = pocket_length * pocket_width / engagement * passes as f64;

    let n = spindle_rpm(speed, tool_diameter);
    let feed_rate = feed_per_tooth * config.milling_teeth as f64 * n;

    Ok(FeatureTime {
        seconds: path / feed_rate * 60.0,
        passes,
        peck_cycles: None,
    })
}

fn threading(geometry: &Geometry, values: &ResolvedConditions, entity: &str) -> Result<FeatureTime> {
    let diameter = geometry.require(GeometryField::ToDiameter, entity)?;
    let pitch = geometry.require(GeometryField::Pitch, entity)?;
    let length = geometry.require(GeometryField::Length, entity)?;
    let speed = positive(values.speed, "speed", entity)?;
    let passes = values
        .passes
        .filter(|p| *p > 0)
        .ok_or_else(|| EstimateError::geometry(entity, "passes", values.passes.map(f64::from)))?;

    let n = spindle_rpm(speed, diameter);
    // cut and return stroke per pass
    let seconds = length / (n * pitch) * 60.0 * passes as f64 * 2.0;

    Ok(FeatureTime {
        seconds,
        passes,
        peck_cycles: None,
    })
}
