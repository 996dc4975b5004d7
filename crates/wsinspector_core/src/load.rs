//! Model file loader
//!
//! A model file (JSON or YAML) is a map of named workspaces. Each workspace
//! declares parameters, constants, pdfs, model configs, datasets and named
//! snapshots. Loading picks one workspace, one model config and one dataset
//! and resolves every name reference into typed ids.
//!
//! ```yaml
//! combined:
//!   parameters:
//!     - { name: SigXsecOverSM, value: 1.0 }
//!     - { name: alpha_syst1, value: 0.0, error: 1.0 }
//!   pdfs:
//!     simPdf:
//!       kind: simultaneous
//!       categories:
//!         - name: channel1
//!           observable: obs_x_channel1
//!           components:
//!             - name: L_x_signal_channel1_overallSyst_x_StatUncert
//!               nominal: [20.0, 10.0]
//!               modifiers:
//!                 - { type: norm_factor, param: SigXsecOverSM }
//!                 - { type: overall_sys, param: alpha_syst1, lo: 0.95, hi: 1.05 }
//!   model_configs:
//!     ModelConfig:
//!       pdf: simPdf
//!       pois: [SigXsecOverSM]
//!       nuisance_parameters: [alpha_syst1]
//!       observables: [{ name: obs_x_channel1, bins: 2 }]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::model::{
    Category, CategoryId, Dataset, Model, Modifier, Observable, ParamId, Parameter, ParameterSet, PdfKind,
    SampleComponent,
};
use crate::snapshot::Snapshot;

/// Top level of a model file: workspaces by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelDocument {
    pub workspaces: BTreeMap<String, WorkspaceDoc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceDoc {
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub constants: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lumi_relative_error: Option<f64>,
    #[serde(default)]
    pub pdfs: BTreeMap<String, PdfDoc>,
    #[serde(default)]
    pub model_configs: BTreeMap<String, ModelConfigDoc>,
    /// Dataset name -> category name -> per-bin counts
    #[serde(default)]
    pub datasets: BTreeMap<String, BTreeMap<String, Vec<f64>>>,
    #[serde(default)]
    pub snapshots: BTreeMap<String, Snapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfDoc {
    pub kind: String,
    #[serde(default)]
    pub categories: Vec<CategoryDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDoc {
    pub name: String,
    /// Name of the observable in the model config
    pub observable: String,
    #[serde(default)]
    pub components: Vec<ComponentDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDoc {
    /// Raw component name, e.g. `L_x_ttbar_SR_overallSyst_x_StatUncert`
    pub name: String,
    pub nominal: Vec<f64>,
    #[serde(default)]
    pub modifiers: Vec<ModifierDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModifierDoc {
    NormFactor { param: String },
    Lumi { param: String },
    OverallSys { param: String, lo: f64, hi: f64 },
    HistoSys { param: String, lo: Vec<f64>, hi: Vec<f64> },
    StatError { params: Vec<String> },
    ShapeFactor { params: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfigDoc {
    pub pdf: String,
    #[serde(default)]
    pub pois: Vec<String>,
    #[serde(default)]
    pub nuisance_parameters: Vec<String>,
    #[serde(default)]
    pub observables: Vec<Observable>,
}

/// Read `path` and resolve one workspace, model config and dataset from it
pub fn load_model(
    path: &Path,
    workspace: &str,
    model_config: &str,
    dataset: &str,
) -> Result<Model, LoadError> {
    let document = read_document(path)?;
    let ws = document
        .workspaces
        .get(workspace)
        .ok_or_else(|| LoadError::WorkspaceNotFound {
            file: path.display().to_string(),
            workspace: workspace.to_string(),
        })?;
    tracing::info!(file = %path.display(), workspace, "loaded model file");
    ws.resolve(workspace, model_config, dataset)
}

/// Parse a model file by extension
pub fn read_document(path: &Path) -> Result<ModelDocument, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let parse_error = |message: String| LoadError::Parse {
        path: path.to_path_buf(),
        message,
    };
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string())),
        Some("yaml" | "yml") => {
            serde_saphyr::from_str(&content).map_err(|e| parse_error(e.to_string()))
        }
        _ => Err(LoadError::UnsupportedFormat(path.to_path_buf())),
    }
}

impl WorkspaceDoc {
    /// Resolve names into a typed [`Model`].
    ///
    /// A missing dataset is not an error: the model is returned without one and
    /// consumers fall back to expected yields.
    pub fn resolve(
        &self,
        workspace: &str,
        model_config: &str,
        dataset: &str,
    ) -> Result<Model, LoadError> {
        let mut parameters = ParameterSet::new();
        for param in &self.parameters {
            parameters
                .insert(param.clone())
                .ok_or_else(|| LoadError::DuplicateParameter(param.name.clone()))?;
        }

        let config = self
            .model_configs
            .get(model_config)
            .ok_or_else(|| LoadError::ModelConfigNotFound {
                workspace: workspace.to_string(),
                model_config: model_config.to_string(),
            })?;
        let pdf = self
            .pdfs
            .get(&config.pdf)
            .ok_or_else(|| LoadError::PdfNotFound {
                model_config: model_config.to_string(),
                pdf: config.pdf.clone(),
            })?;

        let resolver = Resolver { params: &parameters };
        let pois = resolver.ids(&format!("model config '{model_config}'"), &config.pois)?;
        let nuisance = resolver.ids(
            &format!("model config '{model_config}'"),
            &config.nuisance_parameters,
        )?;

        let observables: FxHashMap<&str, &Observable> = config
            .observables
            .iter()
            .map(|o| (o.name.as_str(), o))
            .collect();
        if pdf.categories.len() > CategoryId::MAX_COUNT {
            return Err(LoadError::TooManyCategories {
                pdf: config.pdf.clone(),
                count: pdf.categories.len(),
            });
        }
        let mut categories = Vec::with_capacity(pdf.categories.len());
        for cat in &pdf.categories {
            let observable = observables.get(cat.observable.as_str()).map(|o| (*o).clone());
            if observable.is_none() {
                tracing::warn!(
                    category = %cat.name,
                    observable = %cat.observable,
                    "observable not provided by the model config"
                );
            }
            let components = cat
                .components
                .iter()
                .map(|c| {
                    let modifiers = c
                        .modifiers
                        .iter()
                        .map(|m| resolver.modifier(&c.name, m))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(SampleComponent::new(&c.name, &cat.name, c.nominal.clone(), modifiers))
                })
                .collect::<Result<Vec<_>, LoadError>>()?;
            categories.push(Category {
                name: cat.name.clone(),
                observable,
                components,
            });
        }

        let dataset = match self.datasets.get(dataset) {
            Some(counts) => Some(Dataset {
                name: dataset.to_string(),
                counts: categories
                    .iter()
                    .map(|c| counts.get(&c.name).cloned())
                    .collect(),
            }),
            None => {
                tracing::warn!(dataset, "dataset not found in workspace, using Asimov data");
                None
            }
        };

        Ok(Model {
            name: workspace.to_string(),
            pdf_name: config.pdf.clone(),
            pdf_kind: PdfKind::from_name(&pdf.kind),
            parameters,
            categories,
            pois,
            nuisance,
            constants: self
                .constants
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            lumi_relative_error: self.lumi_relative_error,
            snapshots: self.snapshots.clone(),
            dataset,
        })
    }
}

struct Resolver<'a> {
    params: &'a ParameterSet,
}

impl Resolver<'_> {
    fn id(&self, context: &str, name: &str) -> Result<ParamId, LoadError> {
        self.params
            .id(name)
            .ok_or_else(|| LoadError::UnknownParameter {
                context: context.to_string(),
                parameter: name.to_string(),
            })
    }

    fn ids(&self, context: &str, names: &[String]) -> Result<Vec<ParamId>, LoadError> {
        names.iter().map(|n| self.id(context, n)).collect()
    }

    fn modifier(&self, component: &str, doc: &ModifierDoc) -> Result<Modifier, LoadError> {
        let context = format!("component '{component}'");
        Ok(match doc {
            ModifierDoc::NormFactor { param } => Modifier::NormFactor {
                param: self.id(&context, param)?,
            },
            ModifierDoc::Lumi { param } => Modifier::Lumi {
                param: self.id(&context, param)?,
            },
            ModifierDoc::OverallSys { param, lo, hi } => Modifier::OverallSys {
                param: self.id(&context, param)?,
                lo: *lo,
                hi: *hi,
            },
            ModifierDoc::HistoSys { param, lo, hi } => Modifier::HistoSys {
                param: self.id(&context, param)?,
                lo: lo.clone(),
                hi: hi.clone(),
            },
            ModifierDoc::StatError { params } => Modifier::StatError {
                gammas: self.ids(&context, params)?,
            },
            ModifierDoc::ShapeFactor { params } => Modifier::ShapeFactor {
                params: self.ids(&context, params)?,
            },
        })
    }
}
