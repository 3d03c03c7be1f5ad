//! JSON report
//!
//! The serialized quote as-is, for downstream tools and for diffing quotes.

use crate::engine::Quote;
use crate::report::{ReportError, ReportWriter};

pub struct JsonReport;

impl ReportWriter for JsonReport {
    fn render(&self, quote: &Quote) -> Result<String, ReportError> {
        let mut out = serde_json::to_string_pretty(quote)?;
        out.push('\n');
        Ok(out)
    }

    fn name(&self) -> &str {
        "JSON"
    }

    fn extension(&self) -> &str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_carries_lock_state() {
        let rendered = JsonReport.render(&fixtures::quote()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value["prices"].as_array().unwrap().len(), 2);
        let speed = &value["part"]["operations"][0]["kind"]["features"][1]["speed"];
        assert_eq!(speed["state"], "locked");
        assert_eq!(speed["value"], 220.0);
    }
}
