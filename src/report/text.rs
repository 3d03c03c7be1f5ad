//! Plain-text report

use std::fmt::Write;

use crate::engine::Quote;
use crate::locking::Lockable;
use crate::model::{Feature, Operation, OperationKind};
use crate::report::{ReportError, ReportWriter};

pub struct TextReport;

impl ReportWriter for TextReport {
    fn render(&self, quote: &Quote) -> Result<String, ReportError> {
        let part = &quote.part;
        let mut out = String::new();

        let _ = writeln!(out, "{} ({}, {})", part.name, part.material, part.price_category);
        let _ = writeln!(out, "stock {}, length {} mm", part.stock.shape, part.stock.length);
        let _ = writeln!(out);

        for op in &part.operations {
            render_operation(&mut out, op);
        }

        let _ = writeln!(
            out,
            "{:>8} {:>10} {:>10} {:>10} {:>10} {:>10} {:>12}",
            "qty", "material", "machining", "setup", "coop", "unit", "total"
        );
        for result in &quote.prices {
            let b = &result.breakdown;
            let _ = writeln!(
                out,
                "{:>8} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>12.2}",
                b.quantity, b.material, b.machining, b.setup, b.cooperation, b.unit, b.total
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "* locked value");

        Ok(out)
    }

    fn name(&self) -> &str {
        "Text"
    }

    fn extension(&self) -> &str {
        "txt"
    }
}

fn render_operation(out: &mut String, op: &Operation) {
    match &op.kind {
        OperationKind::Machining(step) => {
            let _ = writeln!(
                out,
                "op {:<4} {:<10} mode {:<5} setup {} min   time {} min/pc",
                op.sequence,
                step.work_center,
                step.mode,
                value(&step.setup_minutes, 2),
                value(&step.operation_minutes, 3),
            );
            for feature in &step.features {
                render_feature(out, feature);
            }
        }
        OperationKind::Cooperation(coop) => {
            let _ = writeln!(
                out,
                "op {:<4} coop {:<21} unit {:.2}   min lot {:.2}",
                op.sequence, coop.name, coop.unit_price, coop.minimum_lot_price
            );
        }
    }
    let _ = writeln!(out);
}

fn render_feature(out: &mut String, feature: &Feature) {
    let name = match feature.geometry.count {
        1 => feature.feature_type.to_string(),
        n => format!("{} x{}", feature.feature_type, n),
    };
    let cutting = match feature.passes {
        Some(passes) => {
            let mut line = format!(
                "Vc {:>8}  f {:>7}  ap {:>7}  passes {:>3}",
                value(&feature.speed, 1),
                value(&feature.feed, 3),
                value(&feature.depth_of_cut, 3),
                passes
            );
            if let Some(pecks) = feature.peck_cycles {
                let _ = write!(line, "  pecks {}", pecks);
            }
            line
        }
        None => String::new(),
    };
    let _ = writeln!(
        out,
        "  {:<22} {:<52} {:>9.1} s",
        name, cutting, feature.predicted_seconds
    );
}

/// Value with its lock marker, `-` while pending
fn value(v: &Lockable, precision: usize) -> String {
    match v.value() {
        Some(n) => format!("{:.*}{}", precision, n, v.marker()),
        None => "-".to_string(),
    }
}
