//! One full inspection run over a loaded model

use crate::classify::{Classification, LumiSettings};
use crate::config::InspectConfig;
use crate::error::Result;
use crate::model::{CategoryId, Model};
use crate::report::ReportFormatter;
use crate::scan::{
    ImpactRow, ScanSettings, SensitivityScanner, SensitivityTable, ShiftRow, channel_impacts,
    systematic_shifts,
};
use crate::snapshot::{
    NominalValues, load_or_save_nominal, restore_nominal, set_all_nuisance_to_sigma,
    set_all_stat_error_to_sigma,
};
use crate::stat::{UncertaintyMatrices, uncertainty_matrices};
use crate::validate::validate;
use crate::yields::{YieldEvaluator, YieldKind, yield_row};

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct Inspection {
    /// Concatenated text reports, in print order
    pub report: String,
    pub table: SensitivityTable,
    pub matrices: UncertaintyMatrices,
    /// Requested samples that had no computed entries
    pub skipped_samples: Vec<String>,
}

/// A validated model with its nominal capture and classification fixed
pub struct Inspector {
    model: Model,
    config: InspectConfig,
    nominal: NominalValues,
    classification: Classification,
    evaluator: YieldEvaluator,
    lumi: LumiSettings,
}

impl Inspector {
    /// Validate, load the nominal snapshot, apply fixed parameters, capture
    /// nominals and classify.
    pub fn new(mut model: Model, config: InspectConfig) -> Result<Self> {
        validate(&model)?;
        let loaded = load_or_save_nominal(&mut model)?;
        tracing::debug!(loaded, "nominal snapshot ready");
        // after the stored snapshot, so fixed values become the nominals
        fix_parameters(&mut model, &config);

        let nominal = NominalValues::capture(&model);
        let rule = config.rule();
        let classification = Classification::classify(&model, &nominal, rule.as_ref());
        let evaluator = YieldEvaluator::new(&model)?;
        let lumi = resolve_lumi(&model, &config, &nominal);
        tracing::info!(
            categories = model.categories.len(),
            nuisance = model.nuisance.len(),
            lumi = lumi.nominal,
            lumi_relative_error = lumi.relative_error,
            "model ready for inspection"
        );

        Ok(Self {
            model,
            config,
            nominal,
            classification,
            evaluator,
            lumi,
        })
    }

    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    #[must_use]
    pub fn config(&self) -> &InspectConfig {
        &self.config
    }

    #[must_use]
    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    #[must_use]
    pub fn lumi(&self) -> LumiSettings {
        self.lumi
    }

    #[must_use]
    pub fn evaluator(&self) -> YieldEvaluator {
        self.evaluator
    }

    fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            epsilon: self.config.epsilon,
            lumi: self.lumi,
        }
    }

    pub fn scan(&mut self) -> Result<SensitivityTable> {
        SensitivityScanner::new(self.evaluator, &self.classification, self.scan_settings())
            .scan(&mut self.model)
    }

    pub fn yield_row(&mut self, kind: &YieldKind) -> Result<Vec<Option<f64>>> {
        Ok(yield_row(&mut self.model, &self.evaluator, kind)?)
    }

    pub fn channel_impacts(&mut self, category: CategoryId) -> Result<Vec<ImpactRow>> {
        channel_impacts(
            &mut self.model,
            &self.evaluator,
            &self.classification,
            &self.lumi,
            category,
        )
    }

    pub fn systematic_shifts(&mut self, kind: &YieldKind) -> Result<Vec<ShiftRow>> {
        systematic_shifts(
            &mut self.model,
            &self.evaluator,
            &self.classification,
            kind,
            self.config.systematic_threshold,
        )
    }

    pub fn uncertainty_matrices(&mut self) -> Result<UncertaintyMatrices> {
        uncertainty_matrices(
            &mut self.model,
            &self.evaluator,
            &self.classification,
            self.config.data_mode,
        )
    }

    pub fn set_all_nuisance_to_sigma(&mut self, n_sigma: f64) {
        set_all_nuisance_to_sigma(&mut self.model, &self.classification, &self.lumi, n_sigma);
    }

    pub fn set_all_stat_error_to_sigma(&mut self, n_sigma: f64) -> Result<()> {
        Ok(set_all_stat_error_to_sigma(
            &mut self.model,
            &self.classification,
            n_sigma,
        )?)
    }

    pub fn restore_nominal(&mut self) {
        restore_nominal(&mut self.model, &self.nominal);
    }

    /// Run every configured report and collect the results
    pub fn run(&mut self) -> Result<Inspection> {
        let config = self.config.clone();
        let formatter = ReportFormatter::new(&config.report, config.epsilon);
        let regions: Vec<String> = self.model.categories.iter().map(|c| c.name.clone()).collect();
        let mut sections = Vec::new();

        if config.show_inventory {
            sections.push(formatter.inventory(&self.model, &self.classification));
        }

        let table = self.scan()?;

        if config.show_yields {
            let mut kinds = vec![YieldKind::Background, YieldKind::Signal];
            kinds.extend(self.model.sample_names().into_iter().map(YieldKind::Sample));
            for kind in &kinds {
                let row = self.yield_row(kind)?;
                sections.push(formatter.yields(kind.label(), &regions, &row));
            }
        }

        let requested: Vec<String> = if config.samples.is_empty() {
            table.sample_names().into_iter().map(String::from).collect()
        } else {
            config.samples.clone()
        };
        let mut skipped_samples = Vec::new();
        for sample in requested {
            match formatter.sample_report(&table, &sample) {
                Ok(text) => sections.push(text),
                Err(err) => {
                    tracing::warn!("{err}");
                    skipped_samples.push(sample);
                }
            }
        }

        if config.show_impacts {
            for id in self.model.category_ids() {
                let rows = self.channel_impacts(id)?;
                sections.push(formatter.impacts(&regions[id.index()], &rows));
            }
        }

        if config.show_systematics {
            for kind in [YieldKind::Background, YieldKind::Signal] {
                let rows = self.systematic_shifts(&kind)?;
                sections.push(formatter.systematics(kind.label(), &regions, &rows));
            }
        }

        let matrices = self.uncertainty_matrices()?;
        tracing::info!(
            samples = table.sample_names().len(),
            skipped = skipped_samples.len(),
            "inspection complete"
        );

        Ok(Inspection {
            report: sections.join("\n"),
            table,
            matrices,
            skipped_samples,
        })
    }
}

/// Set and freeze the parameters named in `fix_parameters`.
///
/// Names absent from the model are logged and skipped.
fn fix_parameters(model: &mut Model, config: &InspectConfig) {
    for (name, value) in &config.fix_parameters {
        match model.parameters.id(name) {
            Some(id) => {
                let param = model.parameters.get_mut(id);
                param.value = *value;
                param.constant = true;
                tracing::debug!(parameter = %name, value, "fixed parameter");
            }
            None => tracing::warn!(parameter = %name, "cannot fix unknown parameter"),
        }
    }
}

/// Nominal luminosity and its relative error.
///
/// The relative error comes from the config, then the model; the nominal from
/// the model constant, then the luminosity parameter's captured value.
fn resolve_lumi(model: &Model, config: &InspectConfig, nominal: &NominalValues) -> LumiSettings {
    let relative_error = config
        .lumi_relative_error
        .or(model.lumi_relative_error)
        .unwrap_or_else(|| {
            tracing::warn!("no relative luminosity error configured, using 0");
            0.0
        });

    let lumi_param = model.parameters.id(&config.lumi_parameter);
    let nominal_lumi = match model.constant(&config.nominal_lumi_constant) {
        Ok(value) => value,
        Err(err) => {
            let fallback = lumi_param
                .and_then(|id| nominal.get(id).or(Some(model.parameters.value(id))))
                .unwrap_or(1.0);
            if lumi_param.is_some() {
                tracing::warn!("{err}, using the luminosity parameter's nominal value {fallback}");
            }
            fallback
        }
    };

    LumiSettings {
        nominal: nominal_lumi,
        relative_error,
    }
}
