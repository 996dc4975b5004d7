//! Model parameters and the name-indexed parameter set

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::ids::ParamId;
use crate::classify::ParamKind;
use crate::error::LookupError;

/// A single real-valued model parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Live value, mutated by scans and restored afterwards
    pub value: f64,
    /// Error estimate carried by the model (not used for perturbations)
    #[serde(default)]
    pub error: f64,
    #[serde(default)]
    pub constant: bool,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    /// Kind declared by whoever built the model, if any
    #[serde(default)]
    pub kind: Option<ParamKind>,
}

impl Parameter {
    #[must_use]
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            error: 0.0,
            constant: false,
            min: None,
            max: None,
            kind: None,
        }
    }
}

/// Parameters in declaration order with O(1) lookup by name
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    params: Vec<Parameter>,
    index: FxHashMap<String, ParamId>,
}

impl ParameterSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter. Returns `None` if the name is already taken.
    pub fn insert(&mut self, param: Parameter) -> Option<ParamId> {
        if self.index.contains_key(&param.name) {
            return None;
        }
        let id = ParamId(self.params.len() as u32);
        self.index.insert(param.name.clone(), id);
        self.params.push(param);
        Some(id)
    }

    #[must_use]
    pub fn id(&self, name: &str) -> Option<ParamId> {
        self.index.get(name).copied()
    }

    /// # Panics
    /// Panics if `id` did not come from this set.
    #[must_use]
    pub fn get(&self, id: ParamId) -> &Parameter {
        &self.params[id.index()]
    }

    #[must_use]
    pub fn get_mut(&mut self, id: ParamId) -> &mut Parameter {
        &mut self.params[id.index()]
    }

    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Parameter> {
        self.id(name).map(|id| self.get(id))
    }

    #[must_use]
    pub fn value(&self, id: ParamId) -> f64 {
        self.params[id.index()].value
    }

    pub fn set_value(&mut self, id: ParamId, value: f64) {
        self.params[id.index()].value = value;
    }

    pub fn set_value_by_name(&mut self, name: &str, value: f64) -> Result<(), LookupError> {
        let id = self
            .id(name)
            .ok_or_else(|| LookupError::ParameterNotFound(name.to_string()))?;
        self.set_value(id, value);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamId, &Parameter)> {
        self.params
            .iter()
            .enumerate()
            .map(|(i, p)| (ParamId(i as u32), p))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
