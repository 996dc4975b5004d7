//! Tests for the sensitivity scan

use super::fixtures::{degenerate_model, scenario_builder, scenario_model, two_channel_model};
use crate::classify::{Classification, HeuristicRule, LumiSettings, ParamKind};
use crate::config::CategoryBuilder;
use crate::error::{EvalError, InspectError};
use crate::model::Model;
use crate::scan::{BACKGROUND, SIGNAL, ScanSettings, SensitivityScanner, Shift};
use crate::snapshot::{NominalValues, Snapshot};
use crate::yields::YieldEvaluator;

fn settings() -> ScanSettings {
    ScanSettings {
        epsilon: 1e-5,
        lumi: LumiSettings {
            nominal: 1.0,
            relative_error: 0.1,
        },
    }
}

fn classify(model: &Model) -> Classification {
    let nominal = NominalValues::capture(model);
    Classification::classify(model, &nominal, &HeuristicRule::default())
}

fn percent(shift: Shift) -> f64 {
    shift.percent().expect("expected a measurable shift")
}

#[test]
fn test_generic_shape_nuisance_scenario() {
    let mut model = scenario_model();
    let classification = classify(&model);
    let scanner = SensitivityScanner::new(YieldEvaluator::new(&model).unwrap(), &classification, settings());
    let table = scanner.scan(&mut model).unwrap();

    for sample in [BACKGROUND, SIGNAL, "ttbar", "Zprime"] {
        let cell = table.cell(sample, "SR", "alpha_x").unwrap();
        assert!((percent(cell.up) - 10.0).abs() < 1e-9, "{sample} up");
        assert!((percent(cell.down) + 10.0).abs() < 1e-9, "{sample} down");
    }
}

#[test]
fn test_luminosity_scenario() {
    let mut model = scenario_model();
    let classification = classify(&model);
    let lumi = model.parameters.id("Lumi").unwrap();
    assert_eq!(classification.kind(lumi), ParamKind::Luminosity);

    let scanner = SensitivityScanner::new(YieldEvaluator::new(&model).unwrap(), &classification, settings());
    let table = scanner.scan(&mut model).unwrap();
    let cell = table.cell(BACKGROUND, "SR", "Lumi").unwrap();
    assert!((percent(cell.up) - 10.0).abs() < 1e-9);
    assert!((percent(cell.down) + 10.0).abs() < 1e-9);
}

#[test]
fn test_normalization_factor_scenario() {
    let mut model = scenario_model();
    let classification = classify(&model);
    let mu = model.parameters.id("mu_ttbar").unwrap();
    assert_eq!(classification.kind(mu), ParamKind::NormFactor);

    let scanner = SensitivityScanner::new(YieldEvaluator::new(&model).unwrap(), &classification, settings());
    let table = scanner.scan(&mut model).unwrap();
    let cell = table.cell("ttbar", "SR", "mu_ttbar").unwrap();
    assert_eq!(cell.up, Shift::Percent(0.0));
    assert_eq!(cell.down, Shift::Percent(0.0));
    assert_eq!(model.value("mu_ttbar").unwrap(), 1.0);
}

#[test]
fn test_stat_error_and_poi_are_not_scanned() {
    let mut model = scenario_model();
    let classification = classify(&model);
    let scanner = SensitivityScanner::new(YieldEvaluator::new(&model).unwrap(), &classification, settings());
    let table = scanner.scan(&mut model).unwrap();

    assert_eq!(table.parameters(), ["Lumi", "alpha_x", "mu_ttbar"]);
    assert!(table.cell("ttbar", "SR", "gamma_stat_SR_bin_0").is_none());
    assert!(table.cell("ttbar", "SR", "SigXsecOverSM").is_none());
}

#[test]
fn test_scan_leaves_parameters_untouched() {
    let mut model = two_channel_model();
    model.set_value("SigXsecOverSM", 0.37).unwrap();
    model.set_value("alpha_syst2", 0.5).unwrap();
    let before = Snapshot::capture_all(&model.parameters);

    let classification = classify(&model);
    let scanner = SensitivityScanner::new(YieldEvaluator::new(&model).unwrap(), &classification, settings());
    scanner.scan(&mut model).unwrap();

    assert_eq!(Snapshot::capture_all(&model.parameters), before);
}

#[test]
fn test_scan_is_idempotent() {
    let mut model = two_channel_model();
    let classification = classify(&model);
    let scanner = SensitivityScanner::new(YieldEvaluator::new(&model).unwrap(), &classification, settings());

    let first = scanner.scan(&mut model).unwrap();
    let second = scanner.scan(&mut model).unwrap();
    assert!(first.approx_eq(&second, 1e-9));
}

#[test]
fn test_shape_nuisance_away_from_zero_uses_two_and_zero() {
    let mut model = two_channel_model();
    // histo_sys on background1 bin 0: nominal 100, up template 110, down 95
    model.set_value("alpha_shape1", 0.5).unwrap();
    let classification = classify(&model);
    let scanner = SensitivityScanner::new(YieldEvaluator::new(&model).unwrap(), &classification, settings());
    let table = scanner.scan(&mut model).unwrap();

    // nominal 105, at +2 -> 120, at 0 -> 100
    let cell = table.cell("background1", "channel1", "alpha_shape1").unwrap();
    assert!((percent(cell.up) - (120.0 / 105.0 - 1.0) * 100.0).abs() < 1e-9);
    assert!((percent(cell.down) - (100.0 / 105.0 - 1.0) * 100.0).abs() < 1e-9);
    assert_eq!(model.value("alpha_shape1").unwrap(), 0.5);
}

#[test]
fn test_degenerate_yields_give_sentinel() {
    let mut model = degenerate_model();
    let classification = classify(&model);
    let scanner = SensitivityScanner::new(YieldEvaluator::new(&model).unwrap(), &classification, settings());
    let table = scanner.scan(&mut model).unwrap();

    let fakes = table.cell("fakes", "CR", "alpha_x").unwrap();
    assert_eq!(fakes.up, Shift::NoEffect);
    assert_eq!(fakes.down, Shift::NoEffect);
    let background = table.cell(BACKGROUND, "CR", "alpha_x").unwrap();
    assert_eq!(background.up, Shift::NoEffect);
    let signal = table.cell(SIGNAL, "CR", "alpha_x").unwrap();
    assert_eq!(signal.down, Shift::NoEffect);

    // The healthy region is unaffected
    assert!(table.cell(BACKGROUND, "SR", "alpha_x").unwrap().up.percent().is_some());
}

#[test]
fn test_failed_scan_still_restores_state() {
    let mut model = scenario_builder()
        .category(CategoryBuilder::new("VR", 1).without_observable())
        .build_model()
        .unwrap();
    let before = Snapshot::capture_all(&model.parameters);

    let classification = classify(&model);
    let scanner = SensitivityScanner::new(YieldEvaluator::new(&model).unwrap(), &classification, settings());
    let err = scanner.scan(&mut model).unwrap_err();

    assert!(matches!(
        err,
        InspectError::Eval(EvalError::NoObservableBinding { ref category }) if category == "VR"
    ));
    assert_eq!(Snapshot::capture_all(&model.parameters), before);
}
