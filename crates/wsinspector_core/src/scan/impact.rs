//! Per-channel impact tables and "pulled to +1" shift tables
//!
//! Both run on top of the live model and restore its parameter state from a
//! snapshot before returning.

use crate::classify::{Classification, LumiSettings, ParamKind, symmetric_perturbation};
use crate::error::{EvalError, Result};
use crate::model::{CategoryId, Model};
use crate::snapshot::Snapshot;
use crate::yields::{YieldEvaluator, YieldKind, yield_row};

/// Effect of one nuisance parameter on a single category
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactRow {
    pub parameter: String,
    pub nominal_signal: f64,
    pub nominal_background: f64,
    pub signal_up: f64,
    pub signal_down: f64,
    pub background_up: f64,
    pub background_down: f64,
}

/// Effect of setting one parameter to 1.0 across all categories
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftRow {
    pub parameter: String,
    /// Percent change per category, `None` where the yield does not exist
    pub shifts: Vec<Option<f64>>,
}

impl ShiftRow {
    #[must_use]
    pub fn max_abs(&self) -> f64 {
        self.shifts
            .iter()
            .flatten()
            .fold(0.0_f64, |acc, s| acc.max(s.abs()))
    }
}

fn percent_change(varied: f64, nominal: f64) -> f64 {
    if nominal == 0.0 {
        0.0
    } else {
        (varied / nominal - 1.0) * 100.0
    }
}

/// Symmetric one-sigma impact of every nuisance parameter on `category`.
///
/// Statistical-error factors are skipped and normalization factors stay put.
pub fn channel_impacts(
    model: &mut Model,
    evaluator: &YieldEvaluator,
    classification: &Classification,
    lumi: &LumiSettings,
    category: CategoryId,
) -> Result<Vec<ImpactRow>> {
    let snapshot = Snapshot::capture_all(&model.parameters);
    let rows = impacts_of(model, evaluator, classification, lumi, category);
    snapshot.restore(&mut model.parameters)?;
    Ok(rows?)
}

fn impacts_of(
    model: &mut Model,
    evaluator: &YieldEvaluator,
    classification: &Classification,
    lumi: &LumiSettings,
    category: CategoryId,
) -> std::result::Result<Vec<ImpactRow>, EvalError> {
    let (nominal_bkg, nominal_sig) = evaluator.background_and_signal(model, category)?;
    let nuisance = model.nuisance.clone();

    let mut rows = Vec::with_capacity(nuisance.len());
    for param in nuisance {
        let saved = model.parameters.value(param);
        let Some(step) = symmetric_perturbation(classification.kind(param), saved, lumi) else {
            continue;
        };
        model.parameters.set_value(param, step.up);
        let (up_bkg, up_sig) = evaluator.background_and_signal(model, category)?;
        model.parameters.set_value(param, step.down);
        let (down_bkg, down_sig) = evaluator.background_and_signal(model, category)?;
        model.parameters.set_value(param, saved);

        rows.push(ImpactRow {
            parameter: model.param_name(param).to_string(),
            nominal_signal: nominal_sig,
            nominal_background: nominal_bkg,
            signal_up: percent_change(up_sig, nominal_sig),
            signal_down: percent_change(down_sig, nominal_sig),
            background_up: percent_change(up_bkg, nominal_bkg),
            background_down: percent_change(down_bkg, nominal_bkg),
        });
    }
    Ok(rows)
}

/// Percent change of `kind` in every category when each non-statistical
/// nuisance parameter is set to 1.0.
///
/// Rows whose largest absolute change is at most `threshold` percent are dropped.
pub fn systematic_shifts(
    model: &mut Model,
    evaluator: &YieldEvaluator,
    classification: &Classification,
    kind: &YieldKind,
    threshold: f64,
) -> Result<Vec<ShiftRow>> {
    let snapshot = Snapshot::capture_all(&model.parameters);
    let rows = shifts_of(model, evaluator, classification, kind, threshold);
    snapshot.restore(&mut model.parameters)?;
    Ok(rows?)
}

fn shifts_of(
    model: &mut Model,
    evaluator: &YieldEvaluator,
    classification: &Classification,
    kind: &YieldKind,
    threshold: f64,
) -> std::result::Result<Vec<ShiftRow>, EvalError> {
    let nominal = yield_row(model, evaluator, kind)?;
    let nuisance = model.nuisance.clone();

    let mut rows = Vec::new();
    for param in nuisance {
        if matches!(classification.kind(param), ParamKind::StatError | ParamKind::Poi) {
            continue;
        }
        let saved = model.parameters.value(param);
        model.parameters.set_value(param, 1.0);
        let varied = yield_row(model, evaluator, kind)?;
        model.parameters.set_value(param, saved);

        let row = ShiftRow {
            parameter: model.param_name(param).to_string(),
            shifts: nominal
                .iter()
                .zip(&varied)
                .map(|(n, v)| match (n, v) {
                    (Some(n), Some(v)) => Some(percent_change(*v, *n)),
                    _ => None,
                })
                .collect(),
        };
        if row.max_abs() > threshold {
            rows.push(row);
        }
    }
    Ok(rows)
}
