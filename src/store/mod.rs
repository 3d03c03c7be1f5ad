//! Versioned in-memory quote store
//!
//! The persistence boundary of the engine. Every mutation names the version
//! the caller last read; a mismatch is a [`EstimateError::VersionConflict`]
//! and nothing is written. Accepted mutations recompute the affected part and
//! every live batch of it before anything is stored, then swap all of it in
//! together. Frozen batches are never touched by a cascade.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::instrument;

use crate::engine::Engine;
use crate::error::{EstimateError, Result};
use crate::locking::Lockable;
use crate::model::{
    BatchId, CuttingMode, FeatureId, Geometry, MachiningStep, OperationId, OperationKind, Part,
    PartId, Stock,
};
use crate::pricing::CostBreakdown;
use crate::snapshot::Batch;

/// A single edit to a feature
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureEdit {
    Geometry(Geometry),
    /// `None` or zero drops the lock and takes the recommendation again
    Speed(Option<f64>),
    Feed(Option<f64>),
    DepthOfCut(Option<f64>),
}

/// What an accepted part mutation touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub part_version: u64,
    pub operations_changed: usize,
    pub batches_refreshed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReferenceReport {
    pub parts_recomputed: usize,
    pub batches_refreshed: usize,
}

pub struct QuoteStore {
    engine: Engine,
    parts: BTreeMap<PartId, Part>,
    batches: BTreeMap<BatchId, Batch>,
}

fn check_version(entity: String, expected: u64, actual: u64) -> Result<()> {
    if expected == actual {
        return Ok(());
    }
    tracing::warn!(%entity, expected, actual, "rejected stale write");
    Err(EstimateError::VersionConflict {
        entity,
        expected,
        actual,
    })
}

fn not_found(entity: String) -> EstimateError {
    EstimateError::NotFound { entity }
}

impl QuoteStore {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            parts: BTreeMap::new(),
            batches: BTreeMap::new(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn part(&self, id: PartId) -> Result<&Part> {
        self.parts.get(&id).ok_or_else(|| not_found(format!("part {}", id)))
    }

    pub fn batch(&self, id: BatchId) -> Result<&Batch> {
        self.batches.get(&id).ok_or_else(|| not_found(format!("batch {}", id)))
    }

    /// All batches of a part, soft-deleted frozen ones included
    pub fn batches_for_part(&self, part_id: PartId) -> Vec<&Batch> {
        self.batches.values().filter(|b| b.part_id() == part_id).collect()
    }

    /// Compute and store a new part
    #[instrument(skip(self, part), fields(part = %part.id))]
    pub fn insert_part(&mut self, part: Part) -> Result<PartId> {
        let computed = self.engine.recompute_part(&part)?;
        let id = computed.id;
        self.parts.insert(id, computed);
        tracing::info!("part stored");
        Ok(id)
    }

    #[instrument(skip(self))]
    pub fn set_material(&mut self, part_id: PartId, expected: u64, material: &str) -> Result<CascadeReport> {
        let before = self.part(part_id)?;
        check_version(before.label(), expected, before.version)?;

        let mut edited = before.clone();
        edited.material = material.to_string();
        let next = self.engine.recompute_part_from(before, &edited)?;
        self.commit(next)
    }

    #[instrument(skip(self, stock))]
    pub fn set_stock(&mut self, part_id: PartId, expected: u64, stock: Stock) -> Result<CascadeReport> {
        let before = self.part(part_id)?;
        check_version(before.label(), expected, before.version)?;
        stock.check(&before.label())?;

        let mut edited = before.clone();
        edited.stock = stock;
        let next = self.engine.recompute_part_from(before, &edited)?;
        self.commit(next)
    }

    #[instrument(skip(self))]
    pub fn set_cutting_mode(
        &mut self,
        part_id: PartId,
        operation_id: OperationId,
        expected: u64,
        mode: CuttingMode,
    ) -> Result<CascadeReport> {
        let before = self.part(part_id)?;
        let op = before
            .operation(operation_id)
            .ok_or_else(|| not_found(format!("operation {}", operation_id)))?;
        check_version(op.label(), expected, op.version)?;

        let next = self.engine.change_cutting_mode(before, operation_id, mode)?;
        self.commit(next)
    }

    #[instrument(skip(self, edit))]
    pub fn edit_feature(
        &mut self,
        part_id: PartId,
        operation_id: OperationId,
        feature_id: FeatureId,
        expected: u64,
        edit: FeatureEdit,
    ) -> Result<CascadeReport> {
        let before = self.part(part_id)?;
        let mut edited = before.clone();
        let step = machining_step_mut(&mut edited, operation_id)?;
        let feature = step
            .features
            .iter_mut()
            .find(|f| f.id == feature_id)
            .ok_or_else(|| not_found(format!("feature {}", feature_id)))?;
        check_version(feature.label(), expected, feature.version)?;

        match edit {
            FeatureEdit::Geometry(geometry) => feature.geometry = geometry,
            FeatureEdit::Speed(v) => feature.speed = Lockable::manual(v),
            FeatureEdit::Feed(v) => feature.feed = Lockable::manual(v),
            FeatureEdit::DepthOfCut(v) => feature.depth_of_cut = Lockable::manual(v),
        }

        let next = self.engine.recompute_part_from(before, &edited)?;
        self.commit(next)
    }

    /// Lock the operation time, or release it with `None`
    #[instrument(skip(self))]
    pub fn set_operation_time(
        &mut self,
        part_id: PartId,
        operation_id: OperationId,
        expected: u64,
        minutes: Option<f64>,
    ) -> Result<CascadeReport> {
        self.edit_operation(part_id, operation_id, expected, |step| {
            step.operation_minutes = Lockable::manual(minutes)
        })
    }

    /// Lock the setup time, or release it with `None`
    #[instrument(skip(self))]
    pub fn set_setup_time(
        &mut self,
        part_id: PartId,
        operation_id: OperationId,
        expected: u64,
        minutes: Option<f64>,
    ) -> Result<CascadeReport> {
        self.edit_operation(part_id, operation_id, expected, |step| {
            step.setup_minutes = Lockable::manual(minutes)
        })
    }

    fn edit_operation(
        &mut self,
        part_id: PartId,
        operation_id: OperationId,
        expected: u64,
        apply: impl FnOnce(&mut MachiningStep),
    ) -> Result<CascadeReport> {
        let before = self.part(part_id)?;
        let op = before
            .operation(operation_id)
            .ok_or_else(|| not_found(format!("operation {}", operation_id)))?;
        check_version(op.label(), expected, op.version)?;

        let mut edited = before.clone();
        apply(machining_step_mut(&mut edited, operation_id)?);
        let next = self.engine.recompute_part_from(before, &edited)?;
        self.commit(next)
    }

    /// Reprice every live batch of the recomputed part, then store both
    fn commit(&mut self, next: Part) -> Result<CascadeReport> {
        let before = self.part(next.id)?;
        let operations_changed = next
            .operations
            .iter()
            .filter(|op| before.operation(op.id).map_or(true, |old| old.version != op.version))
            .count();

        let refreshed = self.reprice(&self.engine, &next)?;
        let batches_refreshed = self.store_batches(refreshed);

        let report = CascadeReport {
            part_version: next.version,
            operations_changed,
            batches_refreshed,
        };
        tracing::info!(
            part = %next.id,
            version = next.version,
            operations_changed,
            batches_refreshed,
            "cascade applied"
        );
        self.parts.insert(next.id, next);
        Ok(report)
    }

    /// New numbers for every live batch of a part, nothing stored yet
    fn reprice(&self, engine: &Engine, part: &Part) -> Result<Vec<Batch>> {
        self.batches
            .values()
            .filter(|b| b.part_id() == part.id && !b.is_frozen())
            .map(|b| -> Result<Batch> {
                let result = engine.price_computed(part, b.quantity())?;
                Ok(b.refreshed(result.breakdown))
            })
            .collect()
    }

    /// Store batches and count those whose version moved
    fn store_batches(&mut self, batches: Vec<Batch>) -> usize {
        let mut changed = 0;
        for batch in batches {
            if self.batches.get(&batch.id()).map(Batch::version) != Some(batch.version()) {
                changed += 1;
            }
            self.batches.insert(batch.id(), batch);
        }
        changed
    }

    /// Create a live batch priced for `quantity`
    #[instrument(skip(self))]
    pub fn create_batch(&mut self, part_id: PartId, quantity: u32) -> Result<BatchId> {
        let part = self.part(part_id)?;
        let result = self.engine.price_computed(part, quantity)?;
        let batch = Batch::live(part_id, quantity, Some(result.breakdown));
        let id = batch.id();
        self.batches.insert(id, batch);
        tracing::info!(batch = %id, "batch created");
        Ok(id)
    }

    /// Reprice a live batch on demand
    #[instrument(skip(self))]
    pub fn recompute_batch(&mut self, batch_id: BatchId) -> Result<&Batch> {
        let batch = self.batch(batch_id)?;
        if batch.is_frozen() {
            return Err(EstimateError::FrozenState {
                batch: batch_id,
                action: "recompute",
            });
        }
        let part = self.part(batch.part_id())?;
        let result = self.engine.price_computed(part, batch.quantity())?;
        let next = batch.refreshed(result.breakdown);
        self.batches.insert(batch_id, next);
        self.batch(batch_id)
    }

    #[instrument(skip(self, breakdown))]
    pub fn override_breakdown(
        &mut self,
        batch_id: BatchId,
        expected: u64,
        breakdown: CostBreakdown,
    ) -> Result<u64> {
        let batch = self.batch(batch_id)?;
        check_version(batch.label(), expected, batch.version())?;
        let next = batch.override_breakdown(breakdown)?;
        let version = next.version();
        self.batches.insert(batch_id, next);
        Ok(version)
    }

    #[instrument(skip(self))]
    pub fn freeze_batch(&mut self, batch_id: BatchId, expected: u64, actor: &str) -> Result<&Batch> {
        let batch = self.batch(batch_id)?;
        check_version(batch.label(), expected, batch.version())?;
        let part = self.part(batch.part_id())?;
        let frozen = self.engine.freeze_batch(part, batch, actor)?;
        self.batches.insert(batch_id, frozen);
        self.batch(batch_id)
    }

    #[instrument(skip(self))]
    pub fn clone_batch(&mut self, batch_id: BatchId) -> Result<BatchId> {
        let clone = self.engine.clone_batch(self.batch(batch_id)?);
        let id = clone.id();
        self.batches.insert(id, clone);
        Ok(id)
    }

    /// Soft-delete a frozen batch, drop a live one
    #[instrument(skip(self))]
    pub fn delete_batch(&mut self, batch_id: BatchId, expected: u64) -> Result<()> {
        let batch = self.batch(batch_id)?;
        check_version(batch.label(), expected, batch.version())?;

        match batch {
            Batch::Frozen(frozen) if !frozen.deleted => {
                let mut next = frozen.clone();
                next.deleted = true;
                next.version += 1;
                self.batches.insert(batch_id, Batch::Frozen(next));
                tracing::info!(batch = %batch_id, "frozen batch marked deleted");
            }
            Batch::Frozen(_) => {}
            Batch::Live(_) => {
                self.batches.remove(&batch_id);
                tracing::info!(batch = %batch_id, "live batch deleted");
            }
        }
        Ok(())
    }

    /// Switch to new reference data or configuration. Every part and live
    /// batch is recomputed first; if any of them fails nothing changes.
    #[instrument(skip(self, engine))]
    pub fn apply_reference_change(&mut self, engine: Engine) -> Result<ReferenceReport> {
        let mut parts = Vec::with_capacity(self.parts.len());
        let mut batches = Vec::new();
        for part in self.parts.values() {
            let next = engine.recompute_part(part)?;
            batches.extend(self.reprice(&engine, &next)?);
            parts.push(next);
        }

        let parts_recomputed = parts
            .iter()
            .filter(|p| self.parts.get(&p.id).map(|old| old.version) != Some(p.version))
            .count();
        let batches_refreshed = self.store_batches(batches);
        for part in parts {
            self.parts.insert(part.id, part);
        }
        self.engine = engine;

        tracing::info!(parts_recomputed, batches_refreshed, "reference data replaced");
        Ok(ReferenceReport {
            parts_recomputed,
            batches_refreshed,
        })
    }
}

fn machining_step_mut(part: &mut Part, operation_id: OperationId) -> Result<&mut MachiningStep> {
    let op = part
        .operations
        .iter_mut()
        .find(|op| op.id == operation_id)
        .ok_or_else(|| not_found(format!("operation {}", operation_id)))?;
    match &mut op.kind {
        OperationKind::Machining(step) => Ok(step),
        OperationKind::Cooperation(_) => Err(not_found(format!(
            "machining step of operation {}",
            operation_id
        ))),
    }
}
