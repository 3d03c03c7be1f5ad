use std::collections::HashSet;
use thiserror::Error;

use crate::error::EstimateError;
use crate::model::{Feature, FeatureFamily, FeatureType, OperationKind, Part};
use crate::reference::ReferenceLibrary;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error(transparent)]
    Estimate(#[from] EstimateError),

    #[error("operation sequence {sequence} is used more than once")]
    DuplicateSequence { sequence: u32 },

    #[error("operation {sequence} on {work_center} has no features")]
    EmptyOperation { sequence: u32, work_center: String },

    #[error("cooperation '{name}' has a negative price")]
    NegativePrice { name: String },

    #[error("price category '{category}' has no tiers")]
    UnknownCategory { category: String },
}

/// Up-front structural checks on a part, so a job reports every problem at
/// once instead of failing on the first formula that trips over it.
pub struct Validator<'a> {
    library: &'a ReferenceLibrary,
}

impl<'a> Validator<'a> {
    pub fn new(library: &'a ReferenceLibrary) -> Self {
        Self { library }
    }

    pub fn validate_part(&self, part: &Part) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.library.material(&part.material) {
            errors.push(e.into());
        }
        if self.library.tiers(&part.price_category).next().is_none() {
            errors.push(ValidationError::UnknownCategory {
                category: part.price_category.clone(),
            });
        }
        if let Err(e) = part.stock.check(&part.label()) {
            errors.push(e.into());
        }

        let mut sequences = HashSet::new();
        for op in &part.operations {
            if !sequences.insert(op.sequence) {
                errors.push(ValidationError::DuplicateSequence {
                    sequence: op.sequence,
                });
            }

            match &op.kind {
                OperationKind::Machining(step) => {
                    if let Err(e) = self.library.work_center(&step.work_center) {
                        errors.push(e.into());
                    }
                    if step.features.is_empty() && !step.operation_minutes.is_locked() {
                        errors.push(ValidationError::EmptyOperation {
                            sequence: op.sequence,
                            work_center: step.work_center.clone(),
                        });
                    }
                    for feature in &step.features {
                        errors.extend(self.validate_feature(feature));
                    }
                }
                OperationKind::Cooperation(coop) => {
                    if coop.unit_price < 0.0 || coop.minimum_lot_price < 0.0 {
                        errors.push(ValidationError::NegativePrice {
                            name: coop.name.clone(),
                        });
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_feature(&self, feature: &Feature) -> Vec<ValidationError> {
        let entity = feature.label();
        let mut errors: Vec<ValidationError> = feature
            .feature_type
            .required_geometry()
            .iter()
            .filter_map(|field| feature.geometry.require(*field, &entity).err())
            .map(ValidationError::from)
            .collect();

        if feature.geometry.count == 0 {
            errors.push(EstimateError::geometry(&entity, "count", Some(0.0)).into());
        }

        // facing may run to centre, every other turned feature removes stock
        let turned = feature.feature_type.family() == FeatureFamily::Turning;
        if turned && feature.feature_type != FeatureType::Facing {
            if let (Some(from), Some(to)) = (feature.geometry.from_diameter, feature.geometry.to_diameter) {
                if from == to {
                    errors.push(EstimateError::geometry(&entity, "to_diameter", Some(to)).into());
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CuttingMode, Geometry, Operation, Stock};
    use crate::reference::default_library;

    fn shaft() -> Part {
        Part::new("Shaft", "C45", "steel-bar", Stock::bar(52.0, 105.0)).with_operation(
            Operation::machining(10, "LATHE-1", CuttingMode::Mid).with_feature(Feature::new(
                FeatureType::OdRough,
                Geometry {
                    from_diameter: Some(52.0),
                    to_diameter: Some(50.0),
                    length: Some(100.0),
                    ..Geometry::default()
                },
            )),
        )
    }

    #[test]
    fn test_valid_part() {
        let lib = default_library();
        assert!(Validator::new(&lib).validate_part(&shaft()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let lib = default_library();
        let mut part = shaft();
        part.material = "Unobtainium".to_string();
        part.price_category = "gold-bar".to_string();
        part.operations.push(Operation::machining(10, "LATHE-9", CuttingMode::Mid));

        let errors = Validator::new(&lib).validate_part(&part).unwrap_err();
        assert!(errors.len() >= 5, "got {:?}", errors);
        assert!(errors.contains(&ValidationError::DuplicateSequence { sequence: 10 }));
        assert!(errors.contains(&ValidationError::UnknownCategory {
            category: "gold-bar".to_string()
        }));
    }

    #[test]
    fn test_missing_required_geometry() {
        let lib = default_library();
        let part = Part::new("Plate", "C45", "steel-plate", Stock::bar(52.0, 10.0)).with_operation(
            Operation::machining(10, "MILL-1", CuttingMode::Mid).with_feature(Feature::new(
                FeatureType::PocketMilling,
                Geometry {
                    pocket_length: Some(40.0),
                    pocket_width: Some(20.0),
                    ..Geometry::default()
                },
            )),
        );

        let errors = Validator::new(&lib).validate_part(&part).unwrap_err();
        let fields: Vec<_> = errors
            .iter()
            .filter_map(|e| match e {
                ValidationError::Estimate(EstimateError::InvalidGeometry { field, .. }) => Some(*field),
                _ => None,
            })
            .collect();
        assert_eq!(fields, vec!["depth", "corner_radius"]);
    }

    #[test]
    fn test_negative_cooperation_price() {
        let lib = default_library();
        let part = shaft().with_operation(Operation::cooperation(20, "Hardening", -1.0, 80.0));
        let errors = Validator::new(&lib).validate_part(&part).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::NegativePrice {
                name: "Hardening".to_string()
            }]
        );
    }
}
