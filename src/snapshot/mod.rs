//! Batches and the freeze mechanism
//!
//! A batch is either live, following its part and the reference data, or
//! frozen, carrying the numbers it was quoted with forever. Frozen batches
//! never turn live again; cloning one starts a new live batch from its
//! numbers instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EstimateError, Result};
use crate::model::{BatchId, PartId};
use crate::pricing::{CostBreakdown, PriceResult, PricingTrace};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveBatch {
    pub id: BatchId,
    pub part_id: PartId,
    pub quantity: u32,
    /// Latest computed (or manually overridden) numbers
    pub breakdown: Option<CostBreakdown>,
    /// Frozen batch this one was cloned from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloned_from: Option<BatchId>,
    pub version: u64,
}

/// Price result as it stood when the batch was frozen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub breakdown: CostBreakdown,
    pub trace: PricingTrace,
    pub frozen_by: String,
    pub frozen_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenBatch {
    pub id: BatchId,
    pub part_id: PartId,
    pub quantity: u32,
    pub snapshot: Snapshot,
    pub deleted: bool,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Batch {
    Live(LiveBatch),
    Frozen(FrozenBatch),
}

impl Batch {
    pub fn live(part_id: PartId, quantity: u32, breakdown: Option<CostBreakdown>) -> Self {
        Batch::Live(LiveBatch {
            id: BatchId::new(),
            part_id,
            quantity,
            breakdown,
            cloned_from: None,
            version: 1,
        })
    }

    pub fn id(&self) -> BatchId {
        match self {
            Batch::Live(b) => b.id,
            Batch::Frozen(b) => b.id,
        }
    }

    pub fn part_id(&self) -> PartId {
        match self {
            Batch::Live(b) => b.part_id,
            Batch::Frozen(b) => b.part_id,
        }
    }

    pub fn quantity(&self) -> u32 {
        match self {
            Batch::Live(b) => b.quantity,
            Batch::Frozen(b) => b.quantity,
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            Batch::Live(b) => b.version,
            Batch::Frozen(b) => b.version,
        }
    }

    pub fn breakdown(&self) -> Option<&CostBreakdown> {
        match self {
            Batch::Live(b) => b.breakdown.as_ref(),
            Batch::Frozen(b) => Some(&b.snapshot.breakdown),
        }
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self, Batch::Frozen(_))
    }

    pub fn label(&self) -> String {
        format!("batch {}", self.id())
    }

    /// Freeze a live batch with a price result computed against live data.
    /// The batch keeps its id; the version moves on.
    pub fn freeze(
        &self,
        result: PriceResult,
        frozen_by: impl Into<String>,
        frozen_at: DateTime<Utc>,
    ) -> Result<Batch> {
        let live = self.as_live("freeze")?;
        Ok(Batch::Frozen(FrozenBatch {
            id: live.id,
            part_id: live.part_id,
            quantity: live.quantity,
            snapshot: Snapshot {
                breakdown: result.breakdown,
                trace: result.trace,
                frozen_by: frozen_by.into(),
                frozen_at,
            },
            deleted: false,
            version: live.version + 1,
        }))
    }

    /// New live batch carrying this batch's current numbers
    pub fn clone_live(&self) -> Batch {
        let cloned_from = match self {
            Batch::Frozen(b) => Some(b.id),
            Batch::Live(b) => b.cloned_from,
        };
        Batch::Live(LiveBatch {
            id: BatchId::new(),
            part_id: self.part_id(),
            quantity: self.quantity(),
            breakdown: self.breakdown().cloned(),
            cloned_from,
            version: 1,
        })
    }

    /// Replace the numbers of a live batch by hand
    pub fn override_breakdown(&self, breakdown: CostBreakdown) -> Result<Batch> {
        let live = self.as_live("override its cost breakdown")?;
        Ok(Batch::Live(LiveBatch {
            quantity: breakdown.quantity,
            breakdown: Some(breakdown),
            version: live.version + 1,
            ..live.clone()
        }))
    }

    /// Install freshly computed numbers; a no-op on frozen batches
    pub fn refreshed(&self, breakdown: CostBreakdown) -> Batch {
        match self {
            Batch::Live(live) if live.breakdown.as_ref() != Some(&breakdown) => {
                Batch::Live(LiveBatch {
                    breakdown: Some(breakdown),
                    version: live.version + 1,
                    ..live.clone()
                })
            }
            _ => self.clone(),
        }
    }

    fn as_live(&self, action: &'static str) -> Result<&LiveBatch> {
        match self {
            Batch::Live(live) => Ok(live),
            Batch::Frozen(frozen) => Err(EstimateError::FrozenState {
                batch: frozen.id,
                action,
            }),
        }
    }
}
