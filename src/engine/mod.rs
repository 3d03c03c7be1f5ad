//! The estimation engine - main interface
//!
//! Owns a reference library and an engine configuration and exposes every
//! estimation step: condition resolution, feature timing, operation
//! recomputation and the mode-change cascade, pricing, freezing and cloning.
//!
//! The engine is synchronous and does no I/O. Every method takes its inputs by
//! reference and hands back new values; nothing is mutated in place.

use chrono::Utc;
use serde::Serialize;

use crate::aggregate;
use crate::config::EngineConfig;
use crate::error::{EstimateError, Result};
use crate::model::{CuttingMode, FeatureType, Geometry, Operation, OperationId, OperationKind, Part};
use crate::pricing::{self, PriceResult};
use crate::reference::{default_library, ReferenceLibrary};
use crate::resolver::{self, ResolvedConditions};
use crate::snapshot::Batch;
use crate::timing::{self, FeatureTime};
use crate::validator::{ValidationError, Validator};

/// A recomputed part priced at one or more quantities
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub part: Part,
    pub prices: Vec<PriceResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Engine {
    library: ReferenceLibrary,
    config: EngineConfig,
}

impl Engine {
    pub fn new(library: ReferenceLibrary, config: EngineConfig) -> Self {
        Self { library, config }
    }

    /// Engine on the built-in reference library and default configuration
    pub fn with_defaults() -> Self {
        Self::new(default_library(), EngineConfig::default())
    }

    pub fn library(&self) -> &ReferenceLibrary {
        &self.library
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn validate(&self, part: &Part) -> std::result::Result<(), Vec<ValidationError>> {
        Validator::new(&self.library).validate_part(part)
    }

    pub fn resolve_conditions(
        &self,
        material: &str,
        feature_type: FeatureType,
        mode: CuttingMode,
        geometry: &Geometry,
    ) -> Result<ResolvedConditions> {
        resolver::resolve(&self.library, material, feature_type, mode, geometry)
    }

    pub fn compute_feature_time(
        &self,
        feature_type: FeatureType,
        geometry: &Geometry,
        values: Option<&ResolvedConditions>,
    ) -> Result<FeatureTime> {
        timing::feature_time(&self.config, feature_type, geometry, values, feature_type.as_str())
    }

    pub fn recompute_operation(&self, material: &str, operation: &Operation) -> Result<Operation> {
        aggregate::recompute_operation(&self.library, &self.config, material, operation)
    }

    /// Recompute the whole part and stamp new versions on what changed
    pub fn recompute_part(&self, part: &Part) -> Result<Part> {
        self.recompute_part_from(part, part)
    }

    /// Switch an operation's cutting mode and cascade through its features
    pub fn change_cutting_mode(
        &self,
        part: &Part,
        operation: OperationId,
        mode: CuttingMode,
    ) -> Result<Part> {
        let mut edited = part.clone();
        let op = edited
            .operations
            .iter_mut()
            .find(|op| op.id == operation)
            .ok_or_else(|| EstimateError::NotFound {
                entity: format!("operation {}", operation),
            })?;
        if let OperationKind::Machining(step) = &mut op.kind {
            step.mode = mode;
        }

        let next = self.recompute_part_from(part, &edited)?;
        tracing::info!(part = %part.id, %operation, %mode, "cutting mode changed");
        Ok(next)
    }

    /// Recompute an edited copy of `before` and stamp versions against it
    pub(crate) fn recompute_part_from(&self, before: &Part, edited: &Part) -> Result<Part> {
        let mut next = aggregate::recompute_part(&self.library, &self.config, edited)?;
        aggregate::stamp_versions(before, &mut next);
        Ok(next)
    }

    /// Recompute the part, then price it
    pub fn calculate_price(&self, part: &Part, quantity: u32) -> Result<PriceResult> {
        let part = aggregate::recompute_part(&self.library, &self.config, part)?;
        pricing::price(&self.library, &part, quantity)
    }

    /// Price a part whose times are already current
    pub fn price_computed(&self, part: &Part, quantity: u32) -> Result<PriceResult> {
        pricing::price(&self.library, part, quantity)
    }

    pub fn quote(&self, part: &Part, quantities: &[u32]) -> Result<Quote> {
        let part = self.recompute_part(part)?;
        let prices = quantities
            .iter()
            .map(|q| pricing::price(&self.library, &part, *q))
            .collect::<Result<Vec<_>>>()?;
        Ok(Quote { part, prices })
    }

    /// Price a live batch against current reference data and freeze it
    pub fn freeze_batch(&self, part: &Part, batch: &Batch, actor: &str) -> Result<Batch> {
        if batch.is_frozen() {
            return Err(EstimateError::FrozenState {
                batch: batch.id(),
                action: "freeze",
            });
        }
        if batch.part_id() != part.id {
            return Err(EstimateError::NotFound {
                entity: format!("part {} of {}", batch.part_id(), batch.label()),
            });
        }
        let result = self.calculate_price(part, batch.quantity())?;
        let frozen = batch.freeze(result, actor, Utc::now())?;
        tracing::info!(batch = %batch.id(), actor, "batch frozen");
        Ok(frozen)
    }

    pub fn clone_batch(&self, batch: &Batch) -> Batch {
        let clone = batch.clone_live();
        tracing::info!(source = %batch.id(), clone = %clone.id(), "batch cloned");
        clone
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_defaults()
    }
}
