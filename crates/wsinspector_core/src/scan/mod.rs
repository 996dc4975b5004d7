//! Perturbation scan over nuisance parameters
//!
//! For every category (in registration order) and every scanned nuisance
//! parameter (in declaration order) the scanner moves the parameter to its up
//! and down values, re-evaluates the signal, background and per-component
//! yields, and records the percent shifts in a [`SensitivityTable`].
//!
//! The whole scan is bracketed by a snapshot capture/restore, so the model's
//! parameter state afterwards equals the state before, error paths included.

pub mod impact;
mod table;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub use impact::{ImpactRow, ShiftRow, channel_impacts, systematic_shifts};
pub use table::{
    BACKGROUND, Grid, SIGNAL, SampleGrid, SensitivityCell, SensitivityTable, Shift,
};

use crate::classify::{Classification, LumiSettings, ParamKind, scan_perturbation};
use crate::error::{EvalError, Result};
use crate::model::{CategoryId, Model, ParamId};
use crate::snapshot::Snapshot;
use crate::yields::YieldEvaluator;

/// Denominators below this are treated as "no measurable effect"
pub const DEFAULT_EPSILON: f64 = 1e-5;

/// Numeric knobs of one scan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanSettings {
    pub epsilon: f64,
    pub lumi: LumiSettings,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            lumi: LumiSettings {
                nominal: 1.0,
                relative_error: 0.0,
            },
        }
    }
}

/// One recorded cell, before it is merged into the table
#[derive(Debug, Clone)]
struct Record {
    sample: String,
    parameter: usize,
    cell: SensitivityCell,
}

pub struct SensitivityScanner<'a> {
    evaluator: YieldEvaluator,
    classification: &'a Classification,
    settings: ScanSettings,
}

impl<'a> SensitivityScanner<'a> {
    #[must_use]
    pub fn new(
        evaluator: YieldEvaluator,
        classification: &'a Classification,
        settings: ScanSettings,
    ) -> Self {
        Self {
            evaluator,
            classification,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Run the full scan. Parameter values are restored before returning.
    pub fn scan(&self, model: &mut Model) -> Result<SensitivityTable> {
        let snapshot = Snapshot::capture_all(&model.parameters);
        let result = self.scan_all(model);
        snapshot.restore(&mut model.parameters)?;
        Ok(result?)
    }

    fn scan_all(&self, model: &mut Model) -> std::result::Result<SensitivityTable, EvalError> {
        let scanned = self.classification.scanned(model);
        let mut table = SensitivityTable::new(
            model.categories.iter().map(|c| c.name.clone()).collect(),
            scanned
                .iter()
                .map(|&id| model.param_name(id).to_string())
                .collect(),
        );
        tracing::info!(
            categories = model.categories.len(),
            parameters = scanned.len(),
            "starting sensitivity scan"
        );

        let ids: Vec<CategoryId> = model.category_ids().collect();

        #[cfg(feature = "parallel")]
        let per_category: Vec<std::result::Result<Vec<Record>, EvalError>> = {
            let shared: &Model = model;
            ids.par_iter()
                .map(|&category| {
                    let mut local = shared.clone();
                    self.scan_category(&mut local, category, &scanned)
                })
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let per_category: Vec<std::result::Result<Vec<Record>, EvalError>> = ids
            .iter()
            .map(|&category| self.scan_category(model, category, &scanned))
            .collect();

        for (category, records) in ids.iter().zip(per_category) {
            for record in records? {
                table.record(&record.sample, category.index(), record.parameter, record.cell);
            }
        }
        Ok(table)
    }

    fn scan_category(
        &self,
        model: &mut Model,
        category: CategoryId,
        scanned: &[ParamId],
    ) -> std::result::Result<Vec<Record>, EvalError> {
        let epsilon = self.settings.epsilon;
        let evaluator = self.evaluator;
        tracing::debug!(category = %model.category(category)?.name, "scanning category");

        let mut records = Vec::new();
        let (nominal_bkg, nominal_sig) = evaluator.background_and_signal(model, category)?;
        for (row, &param) in scanned.iter().enumerate() {
            let shifted =
                self.perturbed(model, param, |m| evaluator.background_and_signal(m, category))?;
            let Some(((up_bkg, up_sig), (down_bkg, down_sig))) = shifted else {
                continue;
            };
            records.push(Record {
                sample: BACKGROUND.to_string(),
                parameter: row,
                cell: SensitivityCell::from_yields(up_bkg, down_bkg, nominal_bkg, epsilon),
            });
            records.push(Record {
                sample: SIGNAL.to_string(),
                parameter: row,
                cell: SensitivityCell::from_yields(up_sig, down_sig, nominal_sig, epsilon),
            });
        }

        evaluator.set_poi(model, 1.0);
        let components: Vec<String> = model
            .sample_decomposition(category)?
            .iter()
            .map(|c| c.name.clone())
            .collect();
        for (index, sample) in components.iter().enumerate() {
            let nominal = evaluator.component_yield(model, category, index)?;
            for (row, &param) in scanned.iter().enumerate() {
                let shifted =
                    self.perturbed(model, param, |m| evaluator.component_yield(m, category, index))?;
                if let Some((up, down)) = shifted {
                    records.push(Record {
                        sample: sample.clone(),
                        parameter: row,
                        cell: SensitivityCell::from_yields(up, down, nominal, epsilon),
                    });
                }
            }
        }
        Ok(records)
    }

    /// Evaluate at the up and down values of `param`, then put it back.
    ///
    /// Returns `None` for parameters whose kind is never scanned.
    fn perturbed<T, F>(
        &self,
        model: &mut Model,
        param: ParamId,
        mut evaluate: F,
    ) -> std::result::Result<Option<(T, T)>, EvalError>
    where
        F: FnMut(&mut Model) -> std::result::Result<T, EvalError>,
    {
        let kind = self.classification.kind(param);
        let saved = model.parameters.value(param);
        let Some(step) = scan_perturbation(kind, saved, &self.settings.lumi) else {
            return Ok(None);
        };
        if kind == ParamKind::NormFactor {
            tracing::trace!(parameter = %model.param_name(param), "normalization factor left at nominal");
        }

        model.parameters.set_value(param, step.up);
        let up = evaluate(model)?;
        model.parameters.set_value(param, step.down);
        let down = evaluate(model)?;
        model.parameters.set_value(param, saved);
        Ok(Some((up, down)))
    }
}
