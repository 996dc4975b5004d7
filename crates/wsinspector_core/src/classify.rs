//! Parameter classification and perturbation policy
//!
//! Each parameter gets exactly one [`ParamKind`], assigned once after the
//! nominal values are captured. The scanner asks [`scan_perturbation`] for
//! the up/down values to use, which depends only on that tag.
//!
//! How the tag is decided is a [`ClassificationRule`]. The default
//! [`HeuristicRule`] reproduces the historical string-and-nominal matching;
//! [`DeclaredKindRule`] prefers kinds declared in the model file.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::model::{Model, ParamId};
use crate::snapshot::NominalValues;

/// Perturbation policy tag of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Generic shape nuisance, perturbed in its own unit
    Shape,
    Luminosity,
    /// Multiplicative factor with nominal 1.0, left untouched by the unit-sigma scan
    NormFactor,
    /// Per-bin MC statistical factor, handled only by the bulk operation
    StatError,
    /// Parameter of interest, driven directly by the yield evaluator
    Poi,
}

impl ParamKind {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ParamKind::Shape => "shape",
            ParamKind::Luminosity => "lumi",
            ParamKind::NormFactor => "normfactor",
            ParamKind::StatError => "staterror",
            ParamKind::Poi => "poi",
        }
    }
}

/// What a rule gets to see about one parameter
#[derive(Debug, Clone, Copy)]
pub struct ParamContext<'a> {
    pub name: &'a str,
    /// Value from the one-time nominal capture, never the live value
    pub nominal: f64,
    pub is_poi: bool,
    pub declared: Option<ParamKind>,
}

/// A policy for tagging parameters
pub trait ClassificationRule {
    fn classify(&self, ctx: &ParamContext<'_>) -> ParamKind;
}

/// Historical name-and-nominal heuristic.
///
/// Misclassifies a genuine shape parameter whose nominal is exactly 1.0 as a
/// normalization factor.
#[derive(Debug, Clone)]
pub struct HeuristicRule {
    pub stat_error_marker: String,
    pub lumi_name: String,
}

impl Default for HeuristicRule {
    fn default() -> Self {
        Self {
            stat_error_marker: "gamma_stat".to_string(),
            lumi_name: "Lumi".to_string(),
        }
    }
}

impl ClassificationRule for HeuristicRule {
    fn classify(&self, ctx: &ParamContext<'_>) -> ParamKind {
        if ctx.is_poi {
            ParamKind::Poi
        } else if ctx.name.contains(&self.stat_error_marker) {
            ParamKind::StatError
        } else if ctx.name == self.lumi_name {
            ParamKind::Luminosity
        } else if ctx.nominal == 1.0 {
            ParamKind::NormFactor
        } else {
            ParamKind::Shape
        }
    }
}

/// Uses the kind declared in the model when present, else the heuristic
#[derive(Debug, Clone, Default)]
pub struct DeclaredKindRule {
    pub fallback: HeuristicRule,
}

impl ClassificationRule for DeclaredKindRule {
    fn classify(&self, ctx: &ParamContext<'_>) -> ParamKind {
        if ctx.is_poi {
            return ParamKind::Poi;
        }
        ctx.declared
            .unwrap_or_else(|| self.fallback.classify(ctx))
    }
}

/// Tags for every nuisance parameter and POI of a model
#[derive(Debug, Clone, Default)]
pub struct Classification {
    kinds: FxHashMap<ParamId, ParamKind>,
}

impl Classification {
    /// Tag every parameter the nominal capture knows about
    #[must_use]
    pub fn classify(model: &Model, nominal: &NominalValues, rule: &dyn ClassificationRule) -> Self {
        let mut kinds = FxHashMap::default();
        for &id in model.nuisance.iter().chain(&model.pois) {
            let param = model.parameters.get(id);
            let ctx = ParamContext {
                name: &param.name,
                nominal: nominal.get(id).unwrap_or(param.value),
                is_poi: model.is_poi(id),
                declared: param.kind,
            };
            let kind = rule.classify(&ctx);
            tracing::debug!(parameter = %param.name, kind = kind.label(), "classified");
            kinds.insert(id, kind);
        }
        Self { kinds }
    }

    /// Kind of `id`; parameters outside the nuisance/POI sets count as shape nuisances
    #[must_use]
    pub fn kind(&self, id: ParamId) -> ParamKind {
        self.kinds.get(&id).copied().unwrap_or(ParamKind::Shape)
    }

    #[must_use]
    pub fn count(&self, kind: ParamKind) -> usize {
        self.kinds.values().filter(|&&k| k == kind).count()
    }

    /// Nuisance parameters the generic scan perturbs, in declaration order
    #[must_use]
    pub fn scanned(&self, model: &Model) -> Vec<ParamId> {
        model
            .nuisance
            .iter()
            .copied()
            .filter(|&id| !matches!(self.kind(id), ParamKind::StatError | ParamKind::Poi))
            .collect()
    }
}

/// Luminosity reference values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LumiSettings {
    pub nominal: f64,
    pub relative_error: f64,
}

impl LumiSettings {
    /// Luminosity value at `n_sigma` standard deviations
    #[must_use]
    pub fn at_sigma(&self, n_sigma: f64) -> f64 {
        self.nominal * (1.0 + n_sigma * self.relative_error)
    }
}

/// Up and down values for one scan step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perturbation {
    pub up: f64,
    pub down: f64,
}

/// Up/down values for the unit-sigma scan, or `None` if the kind is never scanned.
///
/// Shape nuisances use {+1, -1} when currently exactly 0 and {+2, 0}
/// otherwise. Normalization factors stay where they are.
#[must_use]
pub fn scan_perturbation(kind: ParamKind, current: f64, lumi: &LumiSettings) -> Option<Perturbation> {
    match kind {
        ParamKind::StatError | ParamKind::Poi => None,
        ParamKind::Luminosity => Some(Perturbation {
            up: lumi.at_sigma(1.0),
            down: lumi.at_sigma(-1.0),
        }),
        ParamKind::NormFactor => Some(Perturbation {
            up: current,
            down: current,
        }),
        ParamKind::Shape => Some(if current == 0.0 {
            Perturbation { up: 1.0, down: -1.0 }
        } else {
            Perturbation { up: 2.0, down: 0.0 }
        }),
    }
}

/// Up/down values for the symmetric one-sigma impact table
#[must_use]
pub fn symmetric_perturbation(kind: ParamKind, current: f64, lumi: &LumiSettings) -> Option<Perturbation> {
    match kind {
        ParamKind::Shape => Some(Perturbation { up: 1.0, down: -1.0 }),
        other => scan_perturbation(other, current, lumi),
    }
}
