use chipquote::model::OperationKind;
use chipquote::parser::parse_job;
use chipquote::report::ReportFormat;
use chipquote::{
    default_library, Engine, EngineConfig, EstimateError, FeatureType, Lockable, Part, QuoteStore,
};
use pretty_assertions::assert_eq;

const DRIVE_SHAFT: &str = include_str!("../demos/drive_shaft.job");
const FLANGE: &str = include_str!("../demos/flange.job");

fn load(source: &str) -> (Part, Vec<u32>) {
    let job = parse_job(source).expect("demo job parses");
    (job.to_part(), job.quantities)
}

#[test]
fn test_drive_shaft_quote() {
    chipquote::logging::init_test();
    let engine = Engine::with_defaults();
    let (part, quantities) = load(DRIVE_SHAFT);
    engine.validate(&part).expect("demo job is valid");

    let quote = engine.quote(&part, &quantities).unwrap();
    assert_eq!(quote.prices.len(), 3);

    let features = quote.part.operations[0].features();
    let rough = &features[1];
    assert_eq!(rough.feature_type, FeatureType::OdRough);
    assert_eq!(rough.passes, Some(1));
    assert!(
        rough.predicted_seconds > 18.0 && rough.predicted_seconds < 19.0,
        "od rough took {} s",
        rough.predicted_seconds
    );

    let finish = &features[2];
    assert_eq!(finish.speed, Lockable::Locked(220.0));

    let drill = &features[3];
    assert_eq!(drill.feature_type, FeatureType::Drilling);
    assert_eq!(drill.peck_cycles, Some(3));

    let thread = &features[4];
    assert_eq!(thread.passes, Some(8));

    // Hardening minimum lot charge dominates a single piece
    assert_eq!(quote.prices[0].trace.cooperations[0].per_unit, 80.0);
    assert_eq!(quote.prices[2].trace.cooperations[0].per_unit, 2.5);

    let units: Vec<f64> = quote.prices.iter().map(|p| p.breakdown.unit).collect();
    assert!(units[0] > units[1] && units[1] > units[2], "unit prices {:?}", units);
}

#[test]
fn test_operation_minutes_are_feature_sum() {
    let engine = Engine::with_defaults();
    let (part, _) = load(DRIVE_SHAFT);
    let part = engine.recompute_part(&part).unwrap();

    let op = &part.operations[0];
    let seconds: f64 = op.features().iter().map(|f| f.predicted_seconds).sum();
    let step = op.machining_step().unwrap();
    assert!((step.operation_minutes.value().unwrap() - seconds / 60.0).abs() < 1e-9);
    assert_eq!(step.setup_minutes, Lockable::Locked(30.0));
}

#[test]
fn test_flange_billet_quote() {
    let engine = Engine::with_defaults();
    let (part, quantities) = load(FLANGE);
    engine.validate(&part).expect("demo job is valid");

    let quote = engine.quote(&part, &quantities).unwrap();
    let qc = quote.part.operations[1].machining_step().unwrap();
    assert_eq!(qc.operation_minutes, Lockable::Locked(3.0));
    assert_eq!(qc.setup_minutes, Lockable::Computed(0.0));

    // 80 x 20 x 120 mm of S235
    let trace = &quote.prices[0].trace;
    assert!((trace.unit_volume_mm3 - 192_000.0).abs() < 1e-6);
    assert_eq!(trace.price_per_kg, 32.0);
}

#[test]
fn test_bar_material_cost() {
    let engine = Engine::with_defaults();
    let (part, _) = load(
        "part Pin material C45 category steel-bar stock bar dia 50 length 100 \
         op 10 coop \"Zinc plating\" unit 0.5",
    );
    let result = engine.calculate_price(&part, 1).unwrap();
    assert_eq!(format!("{:.2}", result.breakdown.material), "46.24");
    assert_eq!(result.breakdown.cooperation, 0.5);
}

#[test]
fn test_zero_diameter_bar_is_rejected() {
    let engine = Engine::with_defaults();
    let (part, _) = load(
        "part Pin material C45 category steel-bar stock bar dia 0 length 100 \
         op 10 coop \"Zinc plating\" unit 0.5",
    );
    let err = engine.calculate_price(&part, 10).unwrap_err();
    assert!(matches!(
        err,
        EstimateError::InvalidGeometry {
            field: "stock diameter",
            ..
        }
    ));
}

#[test]
fn test_reports_render_demo() {
    let engine = Engine::with_defaults();
    let (part, quantities) = load(DRIVE_SHAFT);
    let quote = engine.quote(&part, &quantities).unwrap();

    let text = ReportFormat::Text.get_writer().render(&quote).unwrap();
    assert!(text.contains("Drive shaft"));
    assert!(text.contains("thread_external"));

    let json = ReportFormat::Json.get_writer().render(&quote).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["part"]["name"], "Drive shaft");
}

#[test]
fn test_freeze_survives_price_change_and_clone_follows() {
    chipquote::logging::init_test();
    let (part, _) = load(DRIVE_SHAFT);
    let mut store = QuoteStore::new(Engine::with_defaults());
    let part_id = store.insert_part(part).unwrap();

    let frozen_id = store.create_batch(part_id, 10).unwrap();
    let live_id = store.create_batch(part_id, 10).unwrap();
    let version = store.batch(frozen_id).unwrap().version();
    store.freeze_batch(frozen_id, version, "estimator").unwrap();
    let frozen_unit = store.batch(frozen_id).unwrap().breakdown().unwrap().unit;

    // Steel gets more expensive
    let mut library = default_library();
    for tier in library.tiers_mut("steel-bar") {
        tier.price_per_kg += 5.0;
    }
    let report = store
        .apply_reference_change(Engine::new(library, EngineConfig::default()))
        .unwrap();
    assert_eq!(report.batches_refreshed, 1);

    let frozen = store.batch(frozen_id).unwrap();
    assert!(frozen.is_frozen());
    assert_eq!(frozen.breakdown().unwrap().unit, frozen_unit);

    let live_unit = store.batch(live_id).unwrap().breakdown().unwrap().unit;
    assert!(live_unit > frozen_unit);

    // A clone starts from the frozen numbers and follows live data once recomputed
    let clone_id = store.clone_batch(frozen_id).unwrap();
    assert_eq!(store.batch(clone_id).unwrap().breakdown().unwrap().unit, frozen_unit);
    let recomputed = store.recompute_batch(clone_id).unwrap();
    assert!((recomputed.breakdown().unwrap().unit - live_unit).abs() < 1e-9);

    let version = store.batch(frozen_id).unwrap().version();
    let err = store.freeze_batch(frozen_id, version, "estimator").unwrap_err();
    assert!(matches!(err, EstimateError::FrozenState { .. }));
}

#[test]
fn test_stale_edit_is_rejected() {
    let (part, _) = load(DRIVE_SHAFT);
    let mut store = QuoteStore::new(Engine::with_defaults());
    let part_id = store.insert_part(part).unwrap();
    let version = store.part(part_id).unwrap().version;

    store.set_material(part_id, version, "42CrMo4").unwrap();
    let err = store.set_material(part_id, version, "S235").unwrap_err();
    assert!(matches!(err, EstimateError::VersionConflict { .. }));
    assert_eq!(store.part(part_id).unwrap().material, "42CrMo4");
}

#[test]
fn test_cooperation_operation_has_no_features() {
    let (part, _) = load(DRIVE_SHAFT);
    match &part.operations[1].kind {
        OperationKind::Cooperation(coop) => assert_eq!(coop.name, "Hardening"),
        other => panic!("expected cooperation, got {:?}", other),
    }
    assert!(part.operations[1].features().is_empty());
}
