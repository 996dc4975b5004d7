//! In-memory statistical model
//!
//! A `Model` is resolved once from a workspace document (see [`crate::load`])
//! or built in code (see [`crate::config::ModelBuilder`]). After that only
//! parameter values change.

mod category;
mod ids;
mod modifier;
mod parameters;

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

pub use category::{COMPONENT_PREFIX, Category, Observable, SampleComponent, sample_name};
pub use ids::{CategoryId, ParamId};
pub use modifier::{Modifier, histo_sys_delta, overall_sys_factor};
pub use parameters::{Parameter, ParameterSet};

use crate::error::{EvalError, LookupError};
use crate::snapshot::Snapshot;

/// Kind of the model config's top-level pdf
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfKind {
    /// Multi-category composite, one sub-pdf per category
    Simultaneous,
    Other(String),
}

impl PdfKind {
    #[must_use]
    pub fn from_name(kind: &str) -> Self {
        if kind.eq_ignore_ascii_case("simultaneous") {
            PdfKind::Simultaneous
        } else {
            PdfKind::Other(kind.to_string())
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            PdfKind::Simultaneous => "simultaneous",
            PdfKind::Other(kind) => kind,
        }
    }
}

/// Observed (or substitute) per-bin counts, indexed like `Model::categories`
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub name: String,
    /// `None` for categories the dataset has no entry for
    pub counts: Vec<Option<Vec<f64>>>,
}

/// A loaded model: parameters, categories and the model config's roles
#[derive(Debug, Clone)]
pub struct Model {
    /// Workspace name
    pub name: String,
    pub pdf_name: String,
    pub pdf_kind: PdfKind,
    pub parameters: ParameterSet,
    pub categories: Vec<Category>,
    /// Parameters of interest, first one drives signal/background splitting
    pub pois: Vec<ParamId>,
    /// Nuisance parameters in declaration order
    pub nuisance: Vec<ParamId>,
    /// Named constants (`nominalLumi`, `nom_gamma_stat_*`, ...)
    pub constants: FxHashMap<String, f64>,
    /// Relative luminosity uncertainty recorded with the model
    pub lumi_relative_error: Option<f64>,
    pub snapshots: BTreeMap<String, Snapshot>,
    pub dataset: Option<Dataset>,
}

impl Model {
    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category_ids(&self) -> impl Iterator<Item = CategoryId> + use<> {
        (0..self.categories.len()).map_while(CategoryId::from_index)
    }

    pub fn category(&self, id: CategoryId) -> Result<&Category, EvalError> {
        self.categories
            .get(id.index())
            .ok_or(EvalError::UnknownCategory(id))
    }

    #[must_use]
    pub fn category_id(&self, name: &str) -> Option<CategoryId> {
        self.categories
            .iter()
            .position(|c| c.name == name)
            .and_then(CategoryId::from_index)
    }

    #[must_use]
    pub fn nuisance_parameters(&self) -> &[ParamId] {
        &self.nuisance
    }

    #[must_use]
    pub fn parameters_of_interest(&self) -> &[ParamId] {
        &self.pois
    }

    #[must_use]
    pub fn first_poi(&self) -> Option<ParamId> {
        self.pois.first().copied()
    }

    pub fn observable(&self, id: CategoryId) -> Result<&Observable, EvalError> {
        let category = self.category(id)?;
        category
            .observable
            .as_ref()
            .ok_or_else(|| EvalError::NoObservableBinding {
                category: category.name.clone(),
            })
    }

    pub fn sample_decomposition(&self, id: CategoryId) -> Result<&[SampleComponent], EvalError> {
        Ok(self.category(id)?.decomposition())
    }

    #[must_use]
    pub fn is_poi(&self, id: ParamId) -> bool {
        self.pois.contains(&id)
    }

    #[must_use]
    pub fn param_name(&self, id: ParamId) -> &str {
        &self.parameters.get(id).name
    }

    pub fn value(&self, name: &str) -> Result<f64, LookupError> {
        self.parameters
            .by_name(name)
            .map(|p| p.value)
            .ok_or_else(|| LookupError::ParameterNotFound(name.to_string()))
    }

    pub fn set_value(&mut self, name: &str, value: f64) -> Result<(), LookupError> {
        self.parameters.set_value_by_name(name, value)
    }

    pub fn constant(&self, name: &str) -> Result<f64, LookupError> {
        self.constants
            .get(name)
            .copied()
            .ok_or_else(|| LookupError::ConstantNotFound(name.to_string()))
    }

    /// Sorted, de-duplicated component names across all categories
    #[must_use]
    pub fn sample_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .categories
            .iter()
            .flat_map(|c| c.components.iter().map(|s| s.name.clone()))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Largest bin count over all bound observables
    #[must_use]
    pub fn max_bins(&self) -> usize {
        self.categories
            .iter()
            .filter_map(|c| c.observable.as_ref().map(|o| o.bins))
            .max()
            .unwrap_or(0)
    }

    /// Counts for one category from the attached dataset, if present
    #[must_use]
    pub fn data_counts(&self, id: CategoryId) -> Option<&[f64]> {
        self.dataset
            .as_ref()?
            .counts
            .get(id.index())?
            .as_deref()
    }
}
