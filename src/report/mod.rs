//! Quote reports
//!
//! A report renders a `Quote`: the part and its stock, every operation with
//! its times, every feature with the cutting values it was timed with (locked
//! values marked), and one cost breakdown per quoted quantity.

use thiserror::Error;

use crate::engine::Quote;

pub mod json;
pub mod text;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Report writer trait - implemented for each output format
pub trait ReportWriter {
    /// Render the whole quote
    fn render(&self, quote: &Quote) -> Result<String, ReportError>;

    /// Format name
    fn name(&self) -> &str;

    /// File extension for written reports
    fn extension(&self) -> &str;
}

/// Available report formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    /// Plain-text tables
    #[default]
    Text,
    /// Pretty-printed JSON of the recomputed part and every price result
    Json,
}

impl ReportFormat {
    /// Get the writer implementation
    pub fn get_writer(&self) -> Box<dyn ReportWriter> {
        match self {
            ReportFormat::Text => Box::new(text::TextReport),
            ReportFormat::Json => Box::new(json::JsonReport),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::engine::{Engine, Quote};
    use crate::locking::Lockable;
    use crate::model::{CuttingMode, Feature, FeatureType, Geometry, Operation, Part, Stock};

    pub fn quote() -> Quote {
        let mut finish = Feature::new(
            FeatureType::OdFinish,
            Geometry {
                from_diameter: Some(50.0),
                to_diameter: Some(49.8),
                length: Some(100.0),
                ..Geometry::default()
            },
        );
        finish.speed = Lockable::Locked(220.0);

        let part = Part::new("Drive shaft", "C45", "steel-bar", Stock::bar(52.0, 105.0))
            .with_operation(
                Operation::machining(10, "LATHE-1", CuttingMode::Mid)
                    .with_feature(Feature::new(
                        FeatureType::OdRough,
                        Geometry {
                            from_diameter: Some(52.0),
                            to_diameter: Some(50.0),
                            length: Some(100.0),
                            ..Geometry::default()
                        },
                    ))
                    .with_feature(finish)
                    .with_feature(Feature::new(FeatureType::Deburring, Geometry::default())),
            )
            .with_operation(Operation::cooperation(20, "Hardening", 2.5, 80.0));

        Engine::with_defaults().quote(&part, &[1, 10]).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_get_writer() {
        assert_eq!(ReportFormat::default(), ReportFormat::Text);
        assert_eq!(ReportFormat::Text.get_writer().extension(), "txt");
        assert_eq!(ReportFormat::Json.get_writer().name(), "JSON");
    }
}
