//! Tests for full inspection runs and the auxiliary tables

use super::fixtures::{scenario_builder, scenario_model, two_channel_model};
use crate::classify::ParamKind;
use crate::config::{CategoryBuilder, ClassificationMode, InspectConfig, SampleBuilder};
use crate::error::{InspectError, ValidationError};
use crate::inspect::Inspector;
use crate::model::CategoryId;
use crate::snapshot::{NOMINAL_SNAPSHOT, Snapshot, load_or_save_nominal};
use crate::stat::DataMode;
use crate::yields::YieldKind;

fn quiet_config() -> InspectConfig {
    InspectConfig {
        show_inventory: false,
        show_yields: false,
        ..InspectConfig::default()
    }
}

#[test]
fn test_missing_sample_does_not_stop_later_reports() {
    let config = InspectConfig {
        samples: vec!["nonexistent".to_string(), "ttbar".to_string()],
        ..quiet_config()
    };
    let mut inspector = Inspector::new(scenario_model(), config).unwrap();
    let inspection = inspector.run().unwrap();

    assert_eq!(inspection.skipped_samples, vec!["nonexistent"]);
    assert!(inspection.report.contains("' ttbar '"));
    assert!(!inspection.report.contains("' nonexistent '"));
}

#[test]
fn test_default_run_reports_every_sample() {
    let mut inspector = Inspector::new(two_channel_model(), InspectConfig::default()).unwrap();
    let inspection = inspector.run().unwrap();

    assert!(inspection.skipped_samples.is_empty());
    for sample in ["Zprime", "background1", "background2", "signal", "background"] {
        assert!(
            inspection.report.contains(&format!("' {sample} '")),
            "missing report for {sample}"
        );
    }
    assert!(inspection.report.contains("List of nuisance parameters"));
    assert!(inspection.report.contains(" --> Yields for Background"));
    assert!(inspection.report.contains("Total number of gammas: 4"));
}

#[test]
fn test_lumi_settings_from_model() {
    let inspector = Inspector::new(scenario_model(), quiet_config()).unwrap();
    let lumi = inspector.lumi();
    assert_eq!(lumi.nominal, 1.0);
    assert_eq!(lumi.relative_error, 0.1);
    assert!((lumi.at_sigma(1.0) - 1.1).abs() < 1e-12);
    assert!((lumi.at_sigma(-1.0) - 0.9).abs() < 1e-12);
}

#[test]
fn test_config_overrides_lumi_error() {
    let config = InspectConfig {
        lumi_relative_error: Some(0.028),
        ..quiet_config()
    };
    let inspector = Inspector::new(scenario_model(), config).unwrap();
    assert_eq!(inspector.lumi().relative_error, 0.028);
}

#[test]
fn test_not_simultaneous_is_rejected() {
    let model = scenario_builder().pdf_kind("product").build_model().unwrap();
    let err = Inspector::new(model, quiet_config()).err().unwrap();
    assert!(matches!(
        err,
        InspectError::Validation(ValidationError::NotSimultaneous { .. })
    ));
}

#[test]
fn test_reserved_delimiter_is_rejected() {
    let model = scenario_builder()
        .category(CategoryBuilder::new("SR/low", 1).sample(SampleBuilder::new("ttbar", vec![1.0])))
        .build_model()
        .unwrap();
    let err = Inspector::new(model, quiet_config()).err().unwrap();
    assert!(matches!(
        err,
        InspectError::Validation(ValidationError::ReservedDelimiter { ref category }) if category == "SR/low"
    ));
}

#[test]
fn test_reserved_sample_name_is_rejected() {
    let model = scenario_builder()
        .category(CategoryBuilder::new("CR", 1).sample(SampleBuilder::new("signal", vec![1.0])))
        .build_model()
        .unwrap();
    let err = Inspector::new(model, quiet_config()).err().unwrap();
    assert!(matches!(
        err,
        InspectError::Validation(ValidationError::ReservedSampleName { .. })
    ));
}

#[test]
fn test_declared_kind_rule() {
    let model = scenario_builder()
        .declared_nuisance("alpha_scale", 1.0, ParamKind::Shape)
        .build_model()
        .unwrap();
    let id = model.parameters.id("alpha_scale").unwrap();

    let heuristic = Inspector::new(model.clone(), quiet_config()).unwrap();
    assert_eq!(heuristic.classification().kind(id), ParamKind::NormFactor);

    let config = InspectConfig {
        classification: ClassificationMode::Declared,
        ..quiet_config()
    };
    let declared = Inspector::new(model, config).unwrap();
    assert_eq!(declared.classification().kind(id), ParamKind::Shape);
}

#[test]
fn test_fixed_parameters_are_applied_before_capture() {
    let config = InspectConfig {
        fix_parameters: [("mu_ttbar".to_string(), 1.2), ("mu_unknown".to_string(), 3.0)]
            .into_iter()
            .collect(),
        ..quiet_config()
    };
    let mut inspector = Inspector::new(scenario_model(), config).unwrap();
    let mu = inspector.model().parameters.by_name("mu_ttbar").unwrap();
    assert_eq!(mu.value, 1.2);
    assert!(mu.constant);

    // nominal is now 1.2, so the parameter is a generic shape nuisance
    let id = inspector.model().parameters.id("mu_ttbar").unwrap();
    assert_eq!(inspector.classification().kind(id), ParamKind::Shape);

    inspector.set_all_nuisance_to_sigma(1.0);
    inspector.restore_nominal();
    assert_eq!(inspector.model().value("mu_ttbar").unwrap(), 1.2);
}

#[test]
fn test_fixed_parameters_override_stored_snapshot() {
    let mut saved = scenario_model();
    assert!(!load_or_save_nominal(&mut saved).unwrap());
    assert_eq!(saved.snapshots[NOMINAL_SNAPSHOT].get("mu_ttbar"), Some(1.0));

    let config = InspectConfig {
        fix_parameters: [("mu_ttbar".to_string(), 1.2)].into_iter().collect(),
        ..quiet_config()
    };
    let mut inspector = Inspector::new(saved, config).unwrap();
    let mu = inspector.model().parameters.by_name("mu_ttbar").unwrap();
    assert_eq!(mu.value, 1.2);
    assert!(mu.constant);

    inspector.set_all_nuisance_to_sigma(1.0);
    inspector.restore_nominal();
    assert_eq!(inspector.model().value("mu_ttbar").unwrap(), 1.2);
}

#[test]
fn test_stored_snapshot_values_are_kept_for_unfixed_parameters() {
    let stored = Snapshot::from_values([("alpha_x".to_string(), 0.5)].into_iter().collect());
    let model = scenario_builder()
        .snapshot(NOMINAL_SNAPSHOT, stored)
        .build_model()
        .unwrap();
    let config = InspectConfig {
        fix_parameters: [("mu_ttbar".to_string(), 0.8)].into_iter().collect(),
        ..quiet_config()
    };
    let inspector = Inspector::new(model, config).unwrap();
    assert_eq!(inspector.model().value("alpha_x").unwrap(), 0.5);
    assert_eq!(inspector.model().value("mu_ttbar").unwrap(), 0.8);
}

#[test]
fn test_yield_rows() {
    let mut inspector = Inspector::new(two_channel_model(), quiet_config()).unwrap();
    let background = inspector.yield_row(&YieldKind::Background).unwrap();
    let signal = inspector.yield_row(&YieldKind::Signal).unwrap();
    let missing = inspector
        .yield_row(&YieldKind::Sample("diboson".to_string()))
        .unwrap();

    assert_eq!(background, vec![Some(200.0), Some(200.0)]);
    assert_eq!(signal, vec![Some(30.0), Some(30.0)]);
    assert_eq!(missing, vec![None, None]);
    assert_eq!(inspector.model().value("SigXsecOverSM").unwrap(), 1.0);
}

#[test]
fn test_channel_impacts() {
    let mut inspector = Inspector::new(scenario_model(), quiet_config()).unwrap();
    let rows = inspector.channel_impacts(CategoryId(0)).unwrap();

    let names: Vec<&str> = rows.iter().map(|r| r.parameter.as_str()).collect();
    assert_eq!(names, vec!["Lumi", "alpha_x", "mu_ttbar"]);

    let alpha = &rows[1];
    assert_eq!(alpha.nominal_signal, 50.0);
    assert_eq!(alpha.nominal_background, 100.0);
    assert!((alpha.signal_up - 10.0).abs() < 1e-9);
    assert!((alpha.background_down + 10.0).abs() < 1e-9);
    assert_eq!(rows[2].background_up, 0.0);
}

#[test]
fn test_systematic_shifts_drop_small_rows() {
    let mut inspector = Inspector::new(scenario_model(), quiet_config()).unwrap();
    let rows = inspector
        .systematic_shifts(&YieldKind::Background)
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].parameter, "alpha_x");
    assert!((rows[0].shifts[0].unwrap() - 10.0).abs() < 1e-9);
}

#[test]
fn test_uncertainty_matrices() {
    let mut inspector = Inspector::new(scenario_model(), quiet_config()).unwrap();
    let matrices = inspector.uncertainty_matrices().unwrap();

    assert_eq!(matrices.categories, vec!["SR"]);
    assert!((matrices.data_stat[0][0] - 1.0 / 160f64.sqrt()).abs() < 1e-12);
    assert!((matrices.mc_stat[0][0] - 5.0 / 150.0).abs() < 1e-12);
    assert_eq!(inspector.model().value("gamma_stat_SR_bin_0").unwrap(), 1.0);
}

#[test]
fn test_asimov_and_toy_data_modes() {
    let asimov = InspectConfig {
        data_mode: DataMode::Asimov,
        ..quiet_config()
    };
    let mut inspector = Inspector::new(scenario_model(), asimov).unwrap();
    let matrices = inspector.uncertainty_matrices().unwrap();
    assert!((matrices.data_stat[0][0] - 1.0 / 150f64.sqrt()).abs() < 1e-12);

    let toy = InspectConfig {
        data_mode: DataMode::Toy { seed: 42 },
        ..quiet_config()
    };
    let first = Inspector::new(scenario_model(), toy.clone())
        .unwrap()
        .uncertainty_matrices()
        .unwrap();
    let second = Inspector::new(scenario_model(), toy)
        .unwrap()
        .uncertainty_matrices()
        .unwrap();
    assert_eq!(first, second);
}
