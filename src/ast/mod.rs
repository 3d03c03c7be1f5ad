//! Job file AST and its lowering into the engine model

use crate::locking::Lockable;
use crate::model::{
    CuttingMode, Feature, FeatureType, Geometry, Operation, OperationKind, Part, Stock, StockShape,
};

pub type Span = std::ops::Range<usize>;

/// A parsed job file: one part, its stock, the quantities to quote and its process
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub part: PartDecl,
    pub stock: StockDecl,
    pub quantities: Vec<u32>,
    pub operations: Vec<OperationDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartDecl {
    pub name: String,
    pub material: String,
    pub category: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockDecl {
    pub shape: StockShape,
    pub length: f64,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationDecl {
    Machining(MachiningDecl),
    Cooperation(CooperationDecl),
}

impl OperationDecl {
    pub fn sequence(&self) -> u32 {
        match self {
            OperationDecl::Machining(m) => m.sequence,
            OperationDecl::Cooperation(c) => c.sequence,
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            OperationDecl::Machining(m) => &m.span,
            OperationDecl::Cooperation(c) => &c.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MachiningDecl {
    pub sequence: u32,
    pub work_center: String,
    pub mode: CuttingMode,
    /// Explicit setup minutes (locked)
    pub setup: Option<f64>,
    /// Explicit operation minutes per unit (locked)
    pub time: Option<f64>,
    pub features: Vec<FeatureDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CooperationDecl {
    pub sequence: u32,
    pub name: String,
    pub unit_price: f64,
    pub minimum_lot_price: f64,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDecl {
    pub feature_type: FeatureType,
    pub geometry: Geometry,
    pub speed: Option<f64>,
    pub feed: Option<f64>,
    pub depth_of_cut: Option<f64>,
    pub span: Span,
}

impl Job {
    /// Build the engine's part. Explicit cutting values and times become locks;
    /// everything else stays pending until the first recomputation.
    pub fn to_part(&self) -> Part {
        let stock = Stock {
            shape: self.stock.shape.clone(),
            length: self.stock.length,
        };
        let mut part = Part::new(
            self.part.name.clone(),
            self.part.material.clone(),
            self.part.category.clone(),
            stock,
        );
        part.operations = self.operations.iter().map(OperationDecl::to_operation).collect();
        part
    }
}

impl OperationDecl {
    fn to_operation(&self) -> Operation {
        match self {
            OperationDecl::Machining(m) => {
                let mut op = Operation::machining(m.sequence, m.work_center.clone(), m.mode);
                if let OperationKind::Machining(step) = &mut op.kind {
                    step.setup_minutes = Lockable::manual(m.setup);
                    step.operation_minutes = Lockable::manual(m.time);
                    step.features = m.features.iter().map(FeatureDecl::to_feature).collect();
                }
                op
            }
            OperationDecl::Cooperation(c) => Operation::cooperation(
                c.sequence,
                c.name.clone(),
                c.unit_price,
                c.minimum_lot_price,
            ),
        }
    }
}

impl FeatureDecl {
    fn to_feature(&self) -> Feature {
        let mut feature = Feature::new(self.feature_type, self.geometry.clone());
        feature.speed = Lockable::manual(self.speed);
        feature.feed = Lockable::manual(self.feed);
        feature.depth_of_cut = Lockable::manual(self.depth_of_cut);
        feature
    }
}
