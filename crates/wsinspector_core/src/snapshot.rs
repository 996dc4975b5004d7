//! Parameter snapshots and bulk state operations
//!
//! Every scan step perturbs shared model state, so the scanner brackets its
//! work with a [`Snapshot`] capture and restore. [`NominalValues`] is the
//! separate, one-time capture that classification reads from.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::classify::{Classification, LumiSettings, ParamKind};
use crate::error::{LookupError, SnapshotError};
use crate::model::{Model, ParamId, ParameterSet};

/// Name of the snapshot stored in the model on first inspection
pub const NOMINAL_SNAPSHOT: &str = "NominalParamValues";

/// Immutable mapping from parameter name to captured value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    values: BTreeMap<String, f64>,
}

impl Snapshot {
    /// Capture every non-constant parameter
    #[must_use]
    pub fn capture(params: &ParameterSet) -> Self {
        Self {
            values: params
                .iter()
                .filter(|(_, p)| !p.constant)
                .map(|(_, p)| (p.name.clone(), p.value))
                .collect(),
        }
    }

    /// Capture every parameter, constant ones included
    #[must_use]
    pub fn capture_all(params: &ParameterSet) -> Self {
        Self {
            values: params
                .iter()
                .map(|(_, p)| (p.name.clone(), p.value))
                .collect(),
        }
    }

    #[must_use]
    pub fn from_values(values: BTreeMap<String, f64>) -> Self {
        Self { values }
    }

    /// Write every captured value back.
    ///
    /// Fails without modifying anything if a captured parameter no longer exists.
    pub fn restore(&self, params: &mut ParameterSet) -> Result<(), SnapshotError> {
        let mut resolved = Vec::with_capacity(self.values.len());
        for (name, value) in &self.values {
            let id = params
                .id(name)
                .ok_or_else(|| SnapshotError::MissingParameter(name.clone()))?;
            resolved.push((id, *value));
        }
        for (id, value) in resolved {
            params.set_value(id, value);
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Nominal values of all nuisance parameters and POIs, captured once per run
#[derive(Debug, Clone, Default)]
pub struct NominalValues {
    by_id: FxHashMap<ParamId, f64>,
}

impl NominalValues {
    #[must_use]
    pub fn capture(model: &Model) -> Self {
        let by_id = model
            .nuisance
            .iter()
            .chain(&model.pois)
            .map(|&id| (id, model.parameters.value(id)))
            .collect();
        Self { by_id }
    }

    #[must_use]
    pub fn get(&self, id: ParamId) -> Option<f64> {
        self.by_id.get(&id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Load the model's stored nominal snapshot, or store one if it has none.
///
/// Returns `true` when an existing snapshot was loaded.
pub fn load_or_save_nominal(model: &mut Model) -> Result<bool, SnapshotError> {
    if let Some(snapshot) = model.snapshots.get(NOMINAL_SNAPSHOT) {
        snapshot.restore(&mut model.parameters)?;
        tracing::info!(
            "snapshot '{NOMINAL_SNAPSHOT}' already exists in workspace, will not overwrite it"
        );
        return Ok(true);
    }
    let snapshot = Snapshot::capture(&model.parameters);
    model.snapshots.insert(NOMINAL_SNAPSHOT.to_string(), snapshot);
    Ok(false)
}

// ============================================================================
// Bulk state operations
// ============================================================================

/// Move every nuisance parameter to `n_sigma` under its classification.
///
/// Luminosity goes to `nominalLumi * (1 + n * relErr)`, normalization factors
/// are forced to 1.0 only for `n == 0` and otherwise left alone, statistical
/// error factors are skipped, everything else is set to `n` directly.
pub fn set_all_nuisance_to_sigma(
    model: &mut Model,
    classification: &Classification,
    lumi: &LumiSettings,
    n_sigma: f64,
) {
    for &id in &model.nuisance {
        match classification.kind(id) {
            ParamKind::StatError | ParamKind::Poi => {}
            ParamKind::Luminosity => model.parameters.set_value(id, lumi.at_sigma(n_sigma)),
            ParamKind::NormFactor => {
                if n_sigma == 0.0 {
                    model.parameters.set_value(id, 1.0);
                }
            }
            ParamKind::Shape => model.parameters.set_value(id, n_sigma),
        }
    }
}

/// Set every statistical-error factor to `1 + n * sigma`.
///
/// `sigma = 1 / sqrt(nom)` where `nom` is the model constant `nom_<name>`
/// holding the nominal auxiliary count.
pub fn set_all_stat_error_to_sigma(
    model: &mut Model,
    classification: &Classification,
    n_sigma: f64,
) -> Result<(), LookupError> {
    let mut updates = Vec::new();
    for &id in &model.nuisance {
        if classification.kind(id) != ParamKind::StatError {
            continue;
        }
        let name = model.param_name(id);
        let nominal_count = model.constant(&format!("nom_{name}"))?;
        let sigma = 1.0 / nominal_count.sqrt();
        updates.push((id, 1.0 + n_sigma * sigma));
    }
    for (id, value) in updates {
        model.parameters.set_value(id, value);
    }
    Ok(())
}

/// Put every nuisance parameter back to its captured nominal value
pub fn restore_nominal(model: &mut Model, nominal: &NominalValues) {
    for &id in &model.nuisance {
        if let Some(value) = nominal.get(id) {
            model.parameters.set_value(id, value);
        }
    }
}
