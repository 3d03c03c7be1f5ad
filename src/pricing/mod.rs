//! Price calculation
//!
//! Turns a recomputed part into a per-unit and per-batch cost breakdown for
//! one quantity. The stock price per kg comes from the part's price category,
//! tiered by batch mass or batch quantity; machining and setup are priced at
//! the work center's hourly rate; cooperation steps are billed by the
//! supplier's unit price with a minimum lot charge.

use serde::{Deserialize, Serialize};

use crate::error::{EstimateError, Lookup, Result};
use crate::model::{OperationKind, Part};
use crate::reference::{PriceTier, ReferenceLibrary, TierBasis};

/// Cost of one batch. Every component except `total` is per unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub quantity: u32,
    pub material: f64,
    pub machining: f64,
    pub setup: f64,
    pub cooperation: f64,
    pub unit: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    pub sequence: u32,
    pub work_center: String,
    pub hourly_rate: f64,
    pub operation_minutes: f64,
    pub setup_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooperationEntry {
    pub sequence: u32,
    pub name: String,
    pub unit_price: f64,
    pub minimum_lot_price: f64,
    /// Effective price per unit after the lot minimum
    pub per_unit: f64,
}

/// Every reference value a breakdown was derived from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingTrace {
    pub quantity: u32,
    pub material_id: String,
    pub density: f64,
    pub category: String,
    pub basis: TierBasis,
    pub breakpoint: f64,
    pub price_per_kg: f64,
    pub unit_volume_mm3: f64,
    pub unit_mass_kg: f64,
    pub batch_mass_kg: f64,
    pub rates: Vec<RateEntry>,
    pub cooperations: Vec<CooperationEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceResult {
    pub breakdown: CostBreakdown,
    pub trace: PricingTrace,
}

/// Applicable tier with the largest breakpoint, no interpolation
pub fn select_tier<'a>(
    library: &'a ReferenceLibrary,
    category: &'a str,
    batch_mass_kg: f64,
    quantity: u32,
) -> Result<&'a PriceTier> {
    library
        .tiers(category)
        .filter(|tier| tier.applies(batch_mass_kg, quantity))
        .max_by(|a, b| a.breakpoint.total_cmp(&b.breakpoint))
        .ok_or_else(|| {
            EstimateError::unresolved(Lookup::PriceTier {
                category: category.to_string(),
                batch_mass_kg,
                quantity,
            })
        })
}

/// Price a part whose operation times are already computed
pub fn price(library: &ReferenceLibrary, part: &Part, quantity: u32) -> Result<PriceResult> {
    if quantity == 0 {
        return Err(EstimateError::geometry(part.label(), "quantity", Some(0.0)));
    }
    part.stock.check(&part.label())?;
    let q = quantity as f64;

    let material = library.material(&part.material)?;
    let unit_volume_mm3 = part.stock.volume_mm3();
    let unit_mass_kg = material.mass_kg(unit_volume_mm3);
    let batch_mass_kg = unit_mass_kg * q;
    let tier = select_tier(library, &part.price_category, batch_mass_kg, quantity)?;
    let material_cost = unit_mass_kg * tier.price_per_kg;

    let mut machining = 0.0;
    let mut setup = 0.0;
    let mut cooperation = 0.0;
    let mut rates = Vec::new();
    let mut cooperations = Vec::new();

    for op in &part.operations {
        match &op.kind {
            OperationKind::Machining(step) => {
                let rate = library.work_center(&step.work_center)?.hourly_rate;
                let operation_minutes = step.operation_minutes.value().ok_or_else(|| {
                    EstimateError::geometry(op.label(), "operation_minutes", None)
                })?;
                let setup_minutes = step
                    .setup_minutes
                    .value()
                    .ok_or_else(|| EstimateError::geometry(op.label(), "setup_minutes", None))?;

                machining += operation_minutes / 60.0 * rate;
                setup += setup_minutes / 60.0 * rate / q;
                rates.push(RateEntry {
                    sequence: op.sequence,
                    work_center: step.work_center.clone(),
                    hourly_rate: rate,
                    operation_minutes,
                    setup_minutes,
                });
            }
            OperationKind::Cooperation(coop) => {
                let per_unit = (coop.unit_price * q).max(coop.minimum_lot_price) / q;
                cooperation += per_unit;
                cooperations.push(CooperationEntry {
                    sequence: op.sequence,
                    name: coop.name.clone(),
                    unit_price: coop.unit_price,
                    minimum_lot_price: coop.minimum_lot_price,
                    per_unit,
                });
            }
        }
    }

    let unit = material_cost + machining + setup + cooperation;
    let breakdown = CostBreakdown {
        quantity,
        material: material_cost,
        machining,
        setup,
        cooperation,
        unit,
        total: unit * q,
    };

    tracing::debug!(
        part = %part.id,
        quantity,
        tier = tier.breakpoint,
        unit,
        "priced batch"
    );

    Ok(PriceResult {
        breakdown,
        trace: PricingTrace {
            quantity,
            material_id: material.id.clone(),
            density: material.density,
            category: part.price_category.clone(),
            basis: tier.basis,
            breakpoint: tier.breakpoint,
            price_per_kg: tier.price_per_kg,
            unit_volume_mm3,
            unit_mass_kg,
            batch_mass_kg,
            rates,
            cooperations,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locking::Lockable;
    use crate::model::{CuttingMode, Operation, Stock};
    use crate::reference::default_library;
    use pretty_assertions::assert_eq;

    fn bar_part() -> Part {
        Part::new("Pin", "C45", "steel-bar", Stock::bar(50.0, 100.0))
    }

    fn timed_operation(minutes: f64, setup: f64) -> Operation {
        let mut op = Operation::machining(10, "LATHE-1", CuttingMode::Mid);
        if let OperationKind::Machining(step) = &mut op.kind {
            step.operation_minutes = Lockable::Computed(minutes);
            step.setup_minutes = Lockable::Computed(setup);
        }
        op
    }

    #[test]
    fn test_material_cost_of_bar() {
        let lib = default_library();
        let result = price(&lib, &bar_part(), 1).unwrap();

        assert!((result.trace.unit_volume_mm3 - 196_349.54).abs() < 0.01);
        assert!((result.trace.unit_mass_kg - 1.5413).abs() < 1e-4);
        assert_eq!(result.trace.price_per_kg, 30.0);
        assert_eq!(format!("{:.2}", result.breakdown.material), "46.24");
        assert_eq!(result.breakdown.unit, result.breakdown.material);
    }

    #[test]
    fn test_tier_by_batch_mass() {
        let lib = default_library();
        // 1.54 kg per piece: 32 pcs stay under 50 kg, 130 pcs pass 200 kg
        let small = price(&lib, &bar_part(), 32).unwrap();
        let medium = price(&lib, &bar_part(), 33).unwrap();
        let large = price(&lib, &bar_part(), 130).unwrap();

        assert_eq!(small.trace.breakpoint, 0.0);
        assert_eq!(medium.trace.breakpoint, 50.0);
        assert_eq!(large.trace.breakpoint, 200.0);
        assert_eq!(large.trace.price_per_kg, 26.0);
    }

    #[test]
    fn test_price_per_kg_never_rises_with_quantity() {
        let lib = default_library();
        let mut last = f64::INFINITY;
        for quantity in [1, 10, 32, 33, 50, 129, 130, 500, 649, 650, 2000] {
            let result = price(&lib, &bar_part(), quantity).unwrap();
            assert!(result.trace.price_per_kg <= last, "rose at {}", quantity);
            last = result.trace.price_per_kg;
        }
    }

    #[test]
    fn test_quantity_basis() {
        let lib = default_library();
        let part = Part::new("Bush", "POM-C", "plastic-bar", Stock::bar(30.0, 20.0));
        assert_eq!(price(&lib, &part, 99).unwrap().trace.price_per_kg, 25.0);
        assert_eq!(price(&lib, &part, 100).unwrap().trace.price_per_kg, 22.0);
        assert_eq!(price(&lib, &part, 100).unwrap().trace.basis, TierBasis::Quantity);
    }

    #[test]
    fn test_no_applicable_tier() {
        let lib = default_library();
        let mut part = bar_part();
        part.price_category = "gold-bar".to_string();
        let err = price(&lib, &part, 1).unwrap_err();
        assert!(matches!(
            err,
            EstimateError::UnresolvedCondition {
                lookup: Lookup::PriceTier { quantity: 1, .. }
            }
        ));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let lib = default_library();
        let err = price(&lib, &bar_part(), 0).unwrap_err();
        assert!(matches!(err, EstimateError::InvalidGeometry { field: "quantity", .. }));
    }

    #[test]
    fn test_setup_spread_over_quantity() {
        let lib = default_library();
        let part = bar_part().with_operation(timed_operation(6.0, 30.0));

        let one = price(&lib, &part, 1).unwrap().breakdown;
        let ten = price(&lib, &part, 10).unwrap().breakdown;

        // LATHE-1 at 85/h
        assert!((one.machining - 8.5).abs() < 1e-9);
        assert!((one.setup - 42.5).abs() < 1e-9);
        assert!((ten.setup - 4.25).abs() < 1e-9);
        assert!((ten.total - ten.unit * 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_cooperation_minimum_lot() {
        let lib = default_library();
        let part = bar_part().with_operation(Operation::cooperation(20, "Hardening", 2.5, 80.0));

        let ten = price(&lib, &part, 10).unwrap().breakdown;
        let hundred = price(&lib, &part, 100).unwrap().breakdown;
        assert!((ten.cooperation - 8.0).abs() < 1e-9);
        assert!((hundred.cooperation - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_pending_operation_time_is_rejected() {
        let lib = default_library();
        let part = bar_part().with_operation(Operation::machining(10, "LATHE-1", CuttingMode::Mid));
        let err = price(&lib, &part, 1).unwrap_err();
        assert!(matches!(
            err,
            EstimateError::InvalidGeometry {
                field: "operation_minutes",
                ..
            }
        ));
    }

    #[test]
    fn test_degenerate_stock_is_not_priced() {
        let lib = default_library();
        let flat = Part::new("Pin", "C45", "steel-bar", Stock::bar(0.0, 100.0));
        let err = price(&lib, &flat, 10).unwrap_err();
        assert!(matches!(
            err,
            EstimateError::InvalidGeometry {
                field: "stock diameter",
                ..
            }
        ));

        let short = Part::new("Pin", "C45", "steel-bar", Stock::bar(50.0, 0.0));
        assert!(matches!(
            price(&lib, &short, 10),
            Err(EstimateError::InvalidGeometry { field: "stock length", .. })
        ));
    }

    #[test]
    fn test_idempotent() {
        let lib = default_library();
        let part = bar_part()
            .with_operation(timed_operation(6.0, 30.0))
            .with_operation(Operation::cooperation(20, "Hardening", 2.5, 80.0));
        assert_eq!(price(&lib, &part, 7).unwrap(), price(&lib, &part, 7).unwrap());
    }
}
