//! chipquote - machining time and cost estimation
//!
//! A part is described by its raw stock and an ordered list of operations.
//! Machining operations hold cutting features; the engine resolves cutting
//! conditions for each feature from the reference library, times it, sums
//! the times per operation and prices the part for a batch quantity.
//! Batches can be frozen to keep a quote stable while reference data moves on.

pub mod aggregate;
pub mod ast;
pub mod config;
pub mod engine;
pub mod error;
pub mod lexer;
pub mod locking;
pub mod logging;
pub mod model;
pub mod parser;
pub mod pricing;
pub mod reference;
pub mod report;
pub mod resolver;
pub mod snapshot;
pub mod store;
pub mod timing;
pub mod validator;

pub use config::EngineConfig;
pub use engine::{Engine, Quote};
pub use error::{EstimateError, LoadError, Result};
pub use locking::Lockable;
pub use model::{CuttingMode, Feature, FeatureType, Geometry, Operation, Part, Stock};
pub use reference::{default_library, ReferenceLibrary};
pub use snapshot::Batch;
pub use store::QuoteStore;
