//! Model Builder
//!
//! Fluent construction of workspaces in code, with HistFactory-style naming
//! conventions applied automatically:
//!
//! - components are named `L_x_<sample>_<category>_overallSyst_x_StatUncert`
//! - observables are named `obs_x_<category>`
//! - statistical-error factors are named `gamma_stat_<category>_bin_<i>` with
//!   the auxiliary count `nom_gamma_stat_<category>_bin_<i> = 1 / rel^2`
//! - parameters referenced by a modifier but never declared are added as
//!   nuisance parameters (alpha at 0, factors at 1)
//!
//! # Example
//!
//! ```
//! use wsinspector_core::config::{CategoryBuilder, ModelBuilder, SampleBuilder};
//!
//! # fn main() -> Result<(), wsinspector_core::error::LoadError> {
//! let model = ModelBuilder::new("combined")
//!     .poi("SigXsecOverSM", 1.0)
//!     .lumi(1.0, 0.1)
//!     .category(
//!         CategoryBuilder::new("channel1", 2)
//!             .stat_uncertainty(vec![0.05, 0.05])
//!             .sample(SampleBuilder::new("Zprime", vec![20.0, 10.0])
//!                 .norm_factor("SigXsecOverSM")
//!                 .overall_sys("alpha_syst1", 0.95, 1.05))
//!             .sample(SampleBuilder::new("background1", vec![100.0, 0.0])
//!                 .stat_error()
//!                 .overall_sys("alpha_syst2", 0.95, 1.05))
//!             .data(vec![122.0, 112.0]),
//!     )
//!     .build_model()?;
//!
//! assert_eq!(model.sample_names(), vec!["Zprime", "background1"]);
//! assert!(model.parameters.id("gamma_stat_channel1_bin_1").is_some());
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;

use crate::classify::ParamKind;
use crate::error::LoadError;
use crate::load::{CategoryDoc, ComponentDoc, ModelConfigDoc, ModelDocument, ModifierDoc, PdfDoc, WorkspaceDoc};
use crate::model::{Model, Observable, Parameter};
use crate::snapshot::Snapshot;

pub const PDF_NAME: &str = "simPdf";
pub const MODEL_CONFIG_NAME: &str = "ModelConfig";
pub const DATASET_NAME: &str = "obsData";
pub const LUMI_PARAMETER: &str = "Lumi";
pub const NOMINAL_LUMI_CONSTANT: &str = "nominalLumi";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Poi,
    Nuisance,
    /// Declared but in neither the POI nor the nuisance list
    Other,
}

/// Builder for one sample component
#[derive(Debug, Clone)]
pub struct SampleBuilder {
    name: String,
    nominal: Vec<f64>,
    modifiers: Vec<PendingModifier>,
}

#[derive(Debug, Clone)]
enum PendingModifier {
    Resolved(ModifierDoc),
    /// Uses the owning category's statistical-error factors
    StatError,
    /// Per-bin free factors named `<name>_bin_<i>`
    ShapeFactor(String),
}

impl SampleBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>, nominal: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            nominal,
            modifiers: Vec::new(),
        }
    }

    #[must_use]
    pub fn norm_factor(mut self, param: &str) -> Self {
        self.modifiers
            .push(PendingModifier::Resolved(ModifierDoc::NormFactor {
                param: param.to_string(),
            }));
        self
    }

    /// Scale by the luminosity parameter
    #[must_use]
    pub fn lumi(mut self) -> Self {
        self.modifiers.push(PendingModifier::Resolved(ModifierDoc::Lumi {
            param: LUMI_PARAMETER.to_string(),
        }));
        self
    }

    #[must_use]
    pub fn overall_sys(mut self, param: &str, lo: f64, hi: f64) -> Self {
        self.modifiers
            .push(PendingModifier::Resolved(ModifierDoc::OverallSys {
                param: param.to_string(),
                lo,
                hi,
            }));
        self
    }

    #[must_use]
    pub fn histo_sys(mut self, param: &str, lo: Vec<f64>, hi: Vec<f64>) -> Self {
        self.modifiers
            .push(PendingModifier::Resolved(ModifierDoc::HistoSys {
                param: param.to_string(),
                lo,
                hi,
            }));
        self
    }

    #[must_use]
    pub fn stat_error(mut self) -> Self {
        self.modifiers.push(PendingModifier::StatError);
        self
    }

    #[must_use]
    pub fn shape_factor(mut self, name: &str) -> Self {
        self.modifiers
            .push(PendingModifier::ShapeFactor(name.to_string()));
        self
    }
}

/// Builder for one category (region)
#[derive(Debug, Clone)]
pub struct CategoryBuilder {
    name: String,
    bins: usize,
    samples: Vec<SampleBuilder>,
    stat_uncertainty: Option<Vec<f64>>,
    data: Option<Vec<f64>>,
    bind_observable: bool,
}

impl CategoryBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>, bins: usize) -> Self {
        Self {
            name: name.into(),
            bins,
            samples: Vec::new(),
            stat_uncertainty: None,
            data: None,
            bind_observable: true,
        }
    }

    #[must_use]
    pub fn sample(mut self, sample: SampleBuilder) -> Self {
        self.samples.push(sample);
        self
    }

    /// Relative MC statistical uncertainty per bin, shared by samples using `stat_error()`
    #[must_use]
    pub fn stat_uncertainty(mut self, relative: Vec<f64>) -> Self {
        self.stat_uncertainty = Some(relative);
        self
    }

    #[must_use]
    pub fn data(mut self, counts: Vec<f64>) -> Self {
        self.data = Some(counts);
        self
    }

    /// Leave the category's observable out of the model config
    #[must_use]
    pub fn without_observable(mut self) -> Self {
        self.bind_observable = false;
        self
    }

    fn observable_name(&self) -> String {
        format!("obs_x_{}", self.name)
    }

    fn gamma_name(&self, bin: usize) -> String {
        format!("gamma_stat_{}_bin_{bin}", self.name)
    }
}

/// Builder for a whole workspace
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    workspace: String,
    pdf_kind: String,
    parameters: Vec<(Parameter, Role)>,
    constants: BTreeMap<String, f64>,
    lumi_relative_error: Option<f64>,
    categories: Vec<CategoryBuilder>,
    snapshots: BTreeMap<String, Snapshot>,
}

impl ModelBuilder {
    #[must_use]
    pub fn new(workspace: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            pdf_kind: "simultaneous".to_string(),
            parameters: Vec::new(),
            constants: BTreeMap::new(),
            lumi_relative_error: None,
            categories: Vec::new(),
            snapshots: BTreeMap::new(),
        }
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    #[must_use]
    pub fn poi(mut self, name: &str, value: f64) -> Self {
        self.parameters.push((Parameter::new(name, value), Role::Poi));
        self
    }

    /// Declare a nuisance parameter with unit error
    #[must_use]
    pub fn nuisance(mut self, name: &str, value: f64) -> Self {
        let mut param = Parameter::new(name, value);
        param.error = 1.0;
        self.parameters.push((param, Role::Nuisance));
        self
    }

    /// Declare a nuisance parameter with an explicit kind
    #[must_use]
    pub fn declared_nuisance(mut self, name: &str, value: f64, kind: ParamKind) -> Self {
        let mut param = Parameter::new(name, value);
        param.kind = Some(kind);
        self.parameters.push((param, Role::Nuisance));
        self
    }

    /// Declare a parameter in neither the POI nor the nuisance list
    #[must_use]
    pub fn parameter(mut self, param: Parameter) -> Self {
        self.parameters.push((param, Role::Other));
        self
    }

    /// Luminosity parameter, its nominal constant and relative error
    #[must_use]
    pub fn lumi(mut self, nominal: f64, relative_error: f64) -> Self {
        let mut param = Parameter::new(LUMI_PARAMETER, nominal);
        param.error = nominal * relative_error;
        self.parameters.push((param, Role::Nuisance));
        self.constants
            .insert(NOMINAL_LUMI_CONSTANT.to_string(), nominal);
        self.lumi_relative_error = Some(relative_error);
        self
    }

    #[must_use]
    pub fn constant(mut self, name: &str, value: f64) -> Self {
        self.constants.insert(name.to_string(), value);
        self
    }

    #[must_use]
    pub fn pdf_kind(mut self, kind: &str) -> Self {
        self.pdf_kind = kind.to_string();
        self
    }

    #[must_use]
    pub fn snapshot(mut self, name: &str, snapshot: Snapshot) -> Self {
        self.snapshots.insert(name.to_string(), snapshot);
        self
    }

    #[must_use]
    pub fn category(mut self, category: CategoryBuilder) -> Self {
        self.categories.push(category);
        self
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Produce the workspace document
    #[must_use]
    pub fn build(self) -> WorkspaceDoc {
        let mut declared: FxHashSet<String> = self
            .parameters
            .iter()
            .map(|(p, _)| p.name.clone())
            .collect();
        let mut parameters = self.parameters;
        let mut constants = self.constants;
        let mut ensure = |param: Parameter, parameters: &mut Vec<(Parameter, Role)>| {
            if declared.insert(param.name.clone()) {
                parameters.push((param, Role::Nuisance));
            }
        };

        let mut categories = Vec::with_capacity(self.categories.len());
        let mut observables = Vec::new();
        let mut data = BTreeMap::new();
        for cat in &self.categories {
            if let Some(relative) = &cat.stat_uncertainty {
                for (bin, rel) in relative.iter().enumerate() {
                    let name = cat.gamma_name(bin);
                    constants.insert(format!("nom_{name}"), 1.0 / (rel * rel));
                    let mut gamma = Parameter::new(&name, 1.0);
                    gamma.error = *rel;
                    ensure(gamma, &mut parameters);
                }
            }

            let mut components = Vec::with_capacity(cat.samples.len());
            for sample in &cat.samples {
                let mut modifiers = Vec::with_capacity(sample.modifiers.len());
                for pending in &sample.modifiers {
                    let doc = match pending {
                        PendingModifier::Resolved(doc) => doc.clone(),
                        PendingModifier::StatError => ModifierDoc::StatError {
                            params: (0..cat.bins).map(|b| cat.gamma_name(b)).collect(),
                        },
                        PendingModifier::ShapeFactor(name) => ModifierDoc::ShapeFactor {
                            params: (0..cat.bins).map(|b| format!("{name}_bin_{b}")).collect(),
                        },
                    };
                    match &doc {
                        ModifierDoc::NormFactor { param } => {
                            ensure(Parameter::new(param, 1.0), &mut parameters)
                        }
                        ModifierDoc::OverallSys { param, .. } | ModifierDoc::HistoSys { param, .. } => {
                            let mut alpha = Parameter::new(param, 0.0);
                            alpha.error = 1.0;
                            ensure(alpha, &mut parameters);
                        }
                        ModifierDoc::ShapeFactor { params } => {
                            for param in params {
                                ensure(Parameter::new(param, 1.0), &mut parameters);
                            }
                        }
                        ModifierDoc::Lumi { .. } | ModifierDoc::StatError { .. } => {}
                    }
                    modifiers.push(doc);
                }
                components.push(ComponentDoc {
                    name: format!(
                        "L_x_{}_{}_overallSyst_x_StatUncert",
                        sample.name, cat.name
                    ),
                    nominal: sample.nominal.clone(),
                    modifiers,
                });
            }

            if cat.bind_observable {
                observables.push(Observable {
                    name: cat.observable_name(),
                    bins: cat.bins,
                    low: 0.0,
                    high: 1.0,
                });
            }
            if let Some(counts) = &cat.data {
                data.insert(cat.name.clone(), counts.clone());
            }
            categories.push(CategoryDoc {
                name: cat.name.clone(),
                observable: cat.observable_name(),
                components,
            });
        }

        let names_with = |role: Role| -> Vec<String> {
            parameters
                .iter()
                .filter(|(_, r)| *r == role)
                .map(|(p, _)| p.name.clone())
                .collect()
        };
        let config = ModelConfigDoc {
            pdf: PDF_NAME.to_string(),
            pois: names_with(Role::Poi),
            nuisance_parameters: names_with(Role::Nuisance),
            observables,
        };

        let mut datasets = BTreeMap::new();
        if !data.is_empty() {
            datasets.insert(DATASET_NAME.to_string(), data);
        }

        WorkspaceDoc {
            parameters: parameters.into_iter().map(|(p, _)| p).collect(),
            constants,
            lumi_relative_error: self.lumi_relative_error,
            pdfs: BTreeMap::from([(
                PDF_NAME.to_string(),
                PdfDoc {
                    kind: self.pdf_kind,
                    categories,
                },
            )]),
            model_configs: BTreeMap::from([(MODEL_CONFIG_NAME.to_string(), config)]),
            datasets,
            snapshots: self.snapshots,
        }
    }

    /// Produce a one-workspace model file document
    #[must_use]
    pub fn build_document(self) -> ModelDocument {
        let name = self.workspace.clone();
        ModelDocument {
            workspaces: BTreeMap::from([(name, self.build())]),
        }
    }

    /// Build and resolve straight into a [`Model`]
    pub fn build_model(self) -> Result<Model, LoadError> {
        let name = self.workspace.clone();
        self.build().resolve(&name, MODEL_CONFIG_NAME, DATASET_NAME)
    }
}
