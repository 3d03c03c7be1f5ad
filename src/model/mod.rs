//! Parts, operations and stock geometry
//!
//! A part owns its operations, a machining operation owns its features.
//! Every mutable entity carries a version counter that the store compares
//! on write.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use uuid::Uuid;

pub mod feature;

pub use feature::{Feature, FeatureFamily, FeatureType, Geometry, GeometryField};

use crate::error::EstimateError;
use crate::locking::Lockable;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(PartId);
entity_id!(OperationId);
entity_id!(FeatureId);
entity_id!(BatchId);

/// Cutting mode, ordered by aggressiveness
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CuttingMode {
    Low,
    #[default]
    Mid,
    High,
}

impl fmt::Display for CuttingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CuttingMode::Low => write!(f, "low"),
            CuttingMode::Mid => write!(f, "mid"),
            CuttingMode::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for CuttingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(CuttingMode::Low),
            "mid" | "medium" => Ok(CuttingMode::Mid),
            "high" => Ok(CuttingMode::High),
            _ => Err(format!("Unknown cutting mode: {}. Use low, mid or high", s)),
        }
    }
}

/// Raw stock cross-section (mm)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum StockShape {
    Bar {
        diameter: f64,
    },
    Tube {
        outer_diameter: f64,
        inner_diameter: f64,
    },
    Billet {
        width: f64,
        height: f64,
    },
}

impl fmt::Display for StockShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockShape::Bar { diameter } => write!(f, "bar Ø{}", diameter),
            StockShape::Tube {
                outer_diameter,
                inner_diameter,
            } => write!(f, "tube Ø{}/Ø{}", outer_diameter, inner_diameter),
            StockShape::Billet { width, height } => write!(f, "billet {}x{}", width, height),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    #[serde(flatten)]
    pub shape: StockShape,
    pub length: f64,
}

impl Stock {
    pub fn bar(diameter: f64, length: f64) -> Self {
        Self {
            shape: StockShape::Bar { diameter },
            length,
        }
    }

    /// Raw stock volume in mm³
    pub fn volume_mm3(&self) -> f64 {
        let area = match self.shape {
            StockShape::Bar { diameter } => PI * (diameter / 2.0).powi(2),
            StockShape::Tube {
                outer_diameter,
                inner_diameter,
            } => PI * ((outer_diameter / 2.0).powi(2) - (inner_diameter / 2.0).powi(2)),
            StockShape::Billet { width, height } => width * height,
        };
        area * self.length
    }

    /// Every dimension positive, bore smaller than the tube
    pub fn check(&self, entity: &str) -> Result<(), EstimateError> {
        let positive = |field: &'static str, v: f64| {
            if v > 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(EstimateError::geometry(entity, field, Some(v)))
            }
        };

        positive("stock length", self.length)?;
        match self.shape {
            StockShape::Bar { diameter } => positive("stock diameter", diameter),
            StockShape::Tube {
                outer_diameter,
                inner_diameter,
            } => {
                positive("stock diameter", outer_diameter)?;
                positive("stock bore", inner_diameter)?;
                if inner_diameter >= outer_diameter {
                    return Err(EstimateError::geometry(entity, "stock bore", Some(inner_diameter)));
                }
                Ok(())
            }
            StockShape::Billet { width, height } => {
                positive("stock width", width)?;
                positive("stock height", height)
            }
        }
    }
}

/// In-house machining on a work center
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachiningStep {
    pub work_center: String,
    pub mode: CuttingMode,
    /// Setup time per batch (minutes)
    pub setup_minutes: Lockable,
    /// Machine time per unit (minutes)
    pub operation_minutes: Lockable,
    pub features: Vec<Feature>,
}

/// Outsourced step priced by the supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooperationStep {
    pub name: String,
    pub unit_price: f64,
    pub minimum_lot_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationKind {
    Machining(MachiningStep),
    Cooperation(CooperationStep),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub sequence: u32,
    pub kind: OperationKind,
    pub version: u64,
}

impl Operation {
    pub fn machining(sequence: u32, work_center: impl Into<String>, mode: CuttingMode) -> Self {
        Self {
            id: OperationId::new(),
            sequence,
            kind: OperationKind::Machining(MachiningStep {
                work_center: work_center.into(),
                mode,
                setup_minutes: Lockable::Pending,
                operation_minutes: Lockable::Pending,
                features: Vec::new(),
            }),
            version: 1,
        }
    }

    pub fn cooperation(
        sequence: u32,
        name: impl Into<String>,
        unit_price: f64,
        minimum_lot_price: f64,
    ) -> Self {
        Self {
            id: OperationId::new(),
            sequence,
            kind: OperationKind::Cooperation(CooperationStep {
                name: name.into(),
                unit_price,
                minimum_lot_price,
            }),
            version: 1,
        }
    }

    /// Builder-style feature append; no-op on cooperation steps
    pub fn with_feature(mut self, feature: Feature) -> Self {
        if let OperationKind::Machining(step) = &mut self.kind {
            step.features.push(feature);
        }
        self
    }

    pub fn machining_step(&self) -> Option<&MachiningStep> {
        match &self.kind {
            OperationKind::Machining(step) => Some(step),
            OperationKind::Cooperation(_) => None,
        }
    }

    pub fn features(&self) -> &[Feature] {
        match &self.kind {
            OperationKind::Machining(step) => &step.features,
            OperationKind::Cooperation(_) => &[],
        }
    }

    pub fn feature(&self, id: FeatureId) -> Option<&Feature> {
        self.features().iter().find(|f| f.id == id)
    }

    pub fn label(&self) -> String {
        format!("operation {} (seq {})", self.id, self.sequence)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    pub name: String,
    /// Material group id in the reference library
    pub material: String,
    /// Price tier category for the stock material
    pub price_category: String,
    pub stock: Stock,
    pub operations: Vec<Operation>,
    pub version: u64,
}

impl Part {
    pub fn new(
        name: impl Into<String>,
        material: impl Into<String>,
        price_category: impl Into<String>,
        stock: Stock,
    ) -> Self {
        Self {
            id: PartId::new(),
            name: name.into(),
            material: material.into(),
            price_category: price_category.into(),
            stock,
            operations: Vec::new(),
            version: 1,
        }
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn operation(&self, id: OperationId) -> Option<&Operation> {
        self.operations.iter().find(|op| op.id == id)
    }

    pub fn label(&self) -> String {
        format!("part {} ('{}')", self.id, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cutting_mode_ordering() {
        assert!(CuttingMode::Low < CuttingMode::Mid);
        assert!(CuttingMode::Mid < CuttingMode::High);
        assert_eq!("MEDIUM".parse::<CuttingMode>(), Ok(CuttingMode::Mid));
        assert!("turbo".parse::<CuttingMode>().is_err());
    }

    #[test]
    fn test_with_feature_ignored_on_cooperation() {
        let op = Operation::cooperation(20, "Hardening", 2.5, 80.0)
            .with_feature(Feature::new(FeatureType::Deburring, Geometry::default()));
        assert!(op.features().is_empty());
        assert!(op.machining_step().is_none());
    }

    #[test]
    fn test_stock_serializes_flat() {
        let stock = Stock {
            shape: StockShape::Tube {
                outer_diameter: 60.0,
                inner_diameter: 40.0,
            },
            length: 120.0,
        };
        let json = serde_json::to_value(&stock).unwrap();
        assert_eq!(json["shape"], "tube");
        assert_eq!(json["outer_diameter"], 60.0);
        assert_eq!(json["length"], 120.0);
    }

    #[test]
    fn test_stock_volume() {
        let bar = Stock::bar(50.0, 100.0);
        assert!((bar.volume_mm3() - 196_349.54).abs() < 0.01);

        let billet = Stock {
            shape: StockShape::Billet {
                width: 40.0,
                height: 20.0,
            },
            length: 100.0,
        };
        assert_eq!(billet.volume_mm3(), 80_000.0);
    }

    #[test]
    fn test_tube_bore_must_be_smaller() {
        let tube = Stock {
            shape: StockShape::Tube {
                outer_diameter: 40.0,
                inner_diameter: 40.0,
            },
            length: 100.0,
        };
        let err = tube.check("part p").unwrap_err();
        assert_eq!(err, EstimateError::geometry("part p", "stock bore", Some(40.0)));
        assert!(Stock::bar(50.0, 100.0).check("part p").is_ok());
    }
}
