//! Value locking
//!
//! A lockable value is either still waiting for its first recommendation,
//! holding the engine's latest recommendation, or pinned by the user.
//! Recomputation only ever replaces the first two.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Lockable {
    /// Null/zero sentinel: the next recomputation substitutes the recommendation
    #[default]
    Pending,
    Computed(f64),
    Locked(f64),
}

impl Lockable {
    /// Value entered by hand. `None` or zero resets to the sentinel and drops the lock.
    pub fn manual(value: Option<f64>) -> Self {
        match value {
            Some(v) if v != 0.0 => Lockable::Locked(v),
            _ => Lockable::Pending,
        }
    }

    /// Apply a fresh recommendation; locked values are kept verbatim.
    pub fn refresh(self, recommended: f64) -> Self {
        match self {
            Lockable::Locked(v) => Lockable::Locked(v),
            Lockable::Pending | Lockable::Computed(_) => Lockable::Computed(recommended),
        }
    }

    pub fn value(&self) -> Option<f64> {
        match *self {
            Lockable::Pending => None,
            Lockable::Computed(v) | Lockable::Locked(v) => Some(v),
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, Lockable::Locked(_))
    }

    /// Single-character marker used in reports
    pub fn marker(&self) -> &'static str {
        match self {
            Lockable::Locked(_) => "*",
            _ => "",
        }
    }
}
