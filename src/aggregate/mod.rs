//! Operation aggregation and cascades
//!
//! Recomputation never edits in place: every function here takes the current
//! entity by reference and returns a fully recomputed copy. Callers swap the
//! copy in only once the whole subtree succeeded, so a half-cascaded part is
//! never observable.

use crate::config::EngineConfig;
use crate::error::{EstimateError, Result};
use crate::locking::Lockable;
use crate::model::{CuttingMode, Feature, Operation, OperationKind, Part};
use crate::reference::ReferenceLibrary;
use crate::resolver::{self, ResolvedConditions};
use crate::timing;

/// Re-resolve and re-time one feature under the given material and mode
pub fn recompute_feature(
    library: &ReferenceLibrary,
    config: &EngineConfig,
    material: &str,
    mode: CuttingMode,
    feature: &Feature,
) -> Result<Feature> {
    let mut next = feature.clone();

    let effective = if feature.feature_type.needs_conditions() {
        let recommended = resolver::resolve(
            library,
            material,
            feature.feature_type,
            mode,
            &feature.geometry,
        )?;
        next.speed = feature.speed.refresh(recommended.speed);
        next.feed = feature.feed.refresh(recommended.feed);
        next.depth_of_cut = feature.depth_of_cut.refresh(recommended.depth_of_cut);

        Some(ResolvedConditions {
            speed: next.speed.value().unwrap_or(recommended.speed),
            feed: next.feed.value().unwrap_or(recommended.feed),
            depth_of_cut: next.depth_of_cut.value().unwrap_or(recommended.depth_of_cut),
            passes: recommended.passes,
        })
    } else {
        None
    };

    let time = timing::feature_time(
        config,
        feature.feature_type,
        &feature.geometry,
        effective.as_ref(),
        &feature.label(),
    )?;
    next.predicted_seconds = time.seconds;
    next.passes = effective.map(|_| time.passes);
    next.peck_cycles = time.peck_cycles;

    Ok(next)
}

/// Recompute every feature of an operation and its aggregate times.
///
/// Operation minutes default to the feature sum, setup minutes to the work
/// center's default; locked values of either survive.
pub fn recompute_operation(
    library: &ReferenceLibrary,
    config: &EngineConfig,
    material: &str,
    operation: &Operation,
) -> Result<Operation> {
    let step = match &operation.kind {
        OperationKind::Machining(step) => step,
        OperationKind::Cooperation(_) => return Ok(operation.clone()),
    };

    let features = step
        .features
        .iter()
        .map(|f| recompute_feature(library, config, material, step.mode, f))
        .collect::<Result<Vec<_>>>()?;

    let total_seconds: f64 = features.iter().map(|f| f.predicted_seconds).sum();
    let work_center = library.work_center(&step.work_center)?;

    let mut next = operation.clone();
    if let OperationKind::Machining(next_step) = &mut next.kind {
        next_step.operation_minutes = step.operation_minutes.refresh(total_seconds / 60.0);
        next_step.setup_minutes = step.setup_minutes.refresh(work_center.default_setup_minutes);
        next_step.features = features;
        check_minutes(operation, "operation_minutes", &next_step.operation_minutes)?;
        check_minutes(operation, "setup_minutes", &next_step.setup_minutes)?;
    }

    tracing::debug!(
        sequence = operation.sequence,
        work_center = %step.work_center,
        mode = %step.mode,
        minutes = total_seconds / 60.0,
        "recomputed operation"
    );
    Ok(next)
}

/// Locked minutes must be finite and not negative
fn check_minutes(operation: &Operation, field: &'static str, minutes: &Lockable) -> Result<()> {
    match minutes.value() {
        Some(v) if !(v.is_finite() && v >= 0.0) => {
            Err(EstimateError::geometry(operation.label(), field, Some(v)))
        }
        _ => Ok(()),
    }
}

/// Recompute the whole operation tree of a part
pub fn recompute_part(library: &ReferenceLibrary, config: &EngineConfig, part: &Part) -> Result<Part> {
    part.stock.check(&part.label())?;
    let operations = part
        .operations
        .iter()
        .map(|op| recompute_operation(library, config, &part.material, op))
        .collect::<Result<Vec<_>>>()?;

    Ok(Part {
        operations,
        ..part.clone()
    })
}

/// Bump the version of every feature, operation and part in `after` whose
/// content differs from its counterpart in `before`. Entities that are new in
/// `after` keep the version they were created with.
pub fn stamp_versions(before: &Part, after: &mut Part) {
    let mut any_changed = false;

    for op in &mut after.operations {
        let Some(old_op) = before.operation(op.id) else {
            any_changed = true;
            continue;
        };

        if let OperationKind::Machining(step) = &mut op.kind {
            for feature in &mut step.features {
                if let Some(old) = old_op.feature(feature.id) {
                    feature.version = old.version;
                    if feature != old {
                        feature.version = old.version + 1;
                    }
                }
            }
        }

        op.version = old_op.version;
        if op != old_op {
            op.version = old_op.version + 1;
            any_changed = true;
        }
    }

    after.version = before.version;
    if any_changed || *after != *before {
        after.version = before.version + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FeatureType, Geometry, Stock, StockShape};
    use crate::reference::default_library;
    use pretty_assertions::assert_eq;

    fn od_rough() -> Feature {
        Feature::new(
            FeatureType::OdRough,
            Geometry {
                from_diameter: Some(52.0),
                to_diameter: Some(50.0),
                length: Some(100.0),
                ..Geometry::default()
            },
        )
    }

    fn shaft() -> Part {
        Part::new("Shaft", "C45", "steel-bar", Stock::bar(52.0, 105.0))
            .with_operation(
                Operation::machining(10, "LATHE-1", CuttingMode::Mid)
                    .with_feature(od_rough())
                    .with_feature(Feature::new(FeatureType::Deburring, Geometry::default())),
            )
            .with_operation(Operation::cooperation(20, "Hardening", 2.5, 80.0))
    }

    #[test]
    fn test_operation_minutes_sum_features() {
        let lib = default_library();
        let config = EngineConfig::default();
        let part = recompute_part(&lib, &config, &shaft()).unwrap();

        let op = &part.operations[0];
        let total: f64 = op.features().iter().map(|f| f.predicted_seconds).sum();
        let step = op.machining_step().unwrap();
        assert_eq!(step.operation_minutes, Lockable::Computed(total / 60.0));
        assert_eq!(step.setup_minutes, Lockable::Computed(30.0));
        assert_eq!(op.features()[1].predicted_seconds, 60.0);
        assert_eq!(op.features()[1].passes, None);
    }

    #[test]
    fn test_locked_values_survive_repeated_recomputation() {
        let lib = default_library();
        let config = EngineConfig::default();
        let mut feature = od_rough();
        feature.feed = Lockable::manual(Some(0.2));
        let mut part = shaft();
        if let OperationKind::Machining(step) = &mut part.operations[0].kind {
            step.features[0] = feature;
            step.setup_minutes = Lockable::manual(Some(55.0));
        }

        let mut current = part;
        let first = recompute_part(&lib, &config, &current).unwrap();
        for _ in 0..5 {
            current = recompute_part(&lib, &config, &current).unwrap();
        }

        assert_eq!(current, first);
        let step = current.operations[0].machining_step().unwrap();
        assert_eq!(step.features[0].feed, Lockable::Locked(0.2));
        assert_eq!(step.features[0].speed, Lockable::Computed(180.0));
        assert_eq!(step.setup_minutes, Lockable::Locked(55.0));
    }

    #[test]
    fn test_unlock_reproduces_recommendation() {
        let lib = default_library();
        let config = EngineConfig::default();
        let computed = recompute_feature(&lib, &config, "C45", CuttingMode::Mid, &od_rough()).unwrap();

        let mut locked = od_rough();
        locked.speed = Lockable::manual(Some(250.0));
        let locked = recompute_feature(&lib, &config, "C45", CuttingMode::Mid, &locked).unwrap();
        assert!(locked.predicted_seconds < computed.predicted_seconds);

        let mut unlocked = locked.clone();
        unlocked.speed = Lockable::manual(None);
        let unlocked = recompute_feature(&lib, &config, "C45", CuttingMode::Mid, &unlocked).unwrap();
        assert_eq!(unlocked.speed, computed.speed);
        assert_eq!(unlocked.predicted_seconds, computed.predicted_seconds);
    }

    #[test]
    fn test_rejects_bad_locked_minutes() {
        let lib = default_library();
        let config = EngineConfig::default();

        let mut part = shaft();
        if let OperationKind::Machining(step) = &mut part.operations[0].kind {
            step.operation_minutes = Lockable::manual(Some(-600.0));
        }
        let err = recompute_part(&lib, &config, &part).unwrap_err();
        assert!(matches!(
            err,
            EstimateError::InvalidGeometry {
                field: "operation_minutes",
                value: Some(v),
                ..
            } if v == -600.0
        ));

        let mut part = shaft();
        if let OperationKind::Machining(step) = &mut part.operations[0].kind {
            step.setup_minutes = Lockable::manual(Some(f64::NAN));
        }
        let err = recompute_part(&lib, &config, &part).unwrap_err();
        assert!(matches!(err, EstimateError::InvalidGeometry { field: "setup_minutes", .. }));
    }

    #[test]
    fn test_rejects_degenerate_stock() {
        let lib = default_library();
        let config = EngineConfig::default();
        let mut part = shaft();
        part.stock = Stock {
            shape: StockShape::Tube {
                outer_diameter: 40.0,
                inner_diameter: 40.0,
            },
            length: 100.0,
        };
        let err = recompute_part(&lib, &config, &part).unwrap_err();
        assert!(matches!(err, EstimateError::InvalidGeometry { .. }));
    }

    #[test]
    fn test_failure_leaves_input_untouched() {
        let mut lib = default_library();
        let config = EngineConfig::default();
        let part = recompute_part(&lib, &config, &shaft()).unwrap();
        let snapshot = part.clone();

        lib.cutting_conditions.clear();
        assert!(recompute_part(&lib, &config, &part).is_err());
        assert_eq!(part, snapshot);
    }

    #[test]
    fn test_stamp_only_changed_entities() {
        let lib = default_library();
        let config = EngineConfig::default();
        let before = recompute_part(&lib, &config, &shaft()).unwrap();

        let mut after = before.clone();
        if let OperationKind::Machining(step) = &mut after.operations[0].kind {
            step.mode = CuttingMode::High;
        }
        let mut after = recompute_part(&lib, &config, &after).unwrap();
        stamp_versions(&before, &mut after);

        assert_eq!(after.version, 2);
        assert_eq!(after.operations[0].version, 2);
        // rough pass re-resolved, deburring unchanged
        assert_eq!(after.operations[0].features()[0].version, 2);
        assert_eq!(after.operations[0].features()[1].version, 1);
        assert_eq!(after.operations[1].version, 1);
    }

    #[test]
    fn test_stamp_without_change_keeps_versions() {
        let lib = default_library();
        let config = EngineConfig::default();
        let before = recompute_part(&lib, &config, &shaft()).unwrap();
        let mut after = recompute_part(&lib, &config, &before).unwrap();
        stamp_versions(&before, &mut after);
        assert_eq!(after, before);
    }
}
