//! Yield modifiers bound to model parameters
//!
//! A sample component's per-bin yield is
//! `(nominal[b] + additive[b]) * multiplicative[b]`, where every modifier
//! contributes either an additive delta or a multiplicative factor per bin.

use super::ids::ParamId;
use super::parameters::ParameterSet;

/// A modifier whose parameter references were resolved at load time
#[derive(Debug, Clone, PartialEq)]
pub enum Modifier {
    /// Unconstrained multiplicative normalization
    NormFactor { param: ParamId },
    /// Luminosity scaling
    Lumi { param: ParamId },
    /// Normalization uncertainty, piecewise-linear in its alpha parameter
    OverallSys { param: ParamId, lo: f64, hi: f64 },
    /// Shape uncertainty, piecewise-linear per bin between `lo` and `hi` templates
    HistoSys {
        param: ParamId,
        lo: Vec<f64>,
        hi: Vec<f64>,
    },
    /// Per-bin MC statistical factors (one gamma per bin)
    StatError { gammas: Vec<ParamId> },
    /// Per-bin free factors
    ShapeFactor { params: Vec<ParamId> },
}

impl Modifier {
    /// Parameters this modifier depends on
    pub fn params(&self) -> Box<dyn Iterator<Item = ParamId> + '_> {
        match self {
            Modifier::NormFactor { param }
            | Modifier::Lumi { param }
            | Modifier::OverallSys { param, .. }
            | Modifier::HistoSys { param, .. } => Box::new(std::iter::once(*param)),
            Modifier::StatError { gammas } => Box::new(gammas.iter().copied()),
            Modifier::ShapeFactor { params } => Box::new(params.iter().copied()),
        }
    }

    /// Number of bins this modifier carries per-bin data for, if any
    #[must_use]
    pub fn bin_count(&self) -> Option<usize> {
        match self {
            // Templates of unequal length report zero bins, which never matches a real binning
            Modifier::HistoSys { lo, hi, .. } => Some(if lo.len() == hi.len() { lo.len() } else { 0 }),
            Modifier::StatError { gammas } => Some(gammas.len()),
            Modifier::ShapeFactor { params } => Some(params.len()),
            _ => None,
        }
    }

    /// Accumulate this modifier's contribution into `additive` and `factors`.
    ///
    /// Both slices have the component's bin count; callers check that per-bin
    /// modifiers agree with it before evaluating.
    pub fn apply(
        &self,
        nominal: &[f64],
        params: &ParameterSet,
        additive: &mut [f64],
        factors: &mut [f64],
    ) {
        match self {
            Modifier::NormFactor { param } | Modifier::Lumi { param } => {
                let value = params.value(*param);
                factors.iter_mut().for_each(|f| *f *= value);
            }
            Modifier::OverallSys { param, lo, hi } => {
                let factor = overall_sys_factor(params.value(*param), *lo, *hi);
                factors.iter_mut().for_each(|f| *f *= factor);
            }
            Modifier::HistoSys { param, lo, hi } => {
                let alpha = params.value(*param);
                for (b, delta) in additive.iter_mut().enumerate() {
                    *delta += histo_sys_delta(alpha, nominal[b], lo[b], hi[b]);
                }
            }
            Modifier::StatError { gammas } => {
                for (f, gamma) in factors.iter_mut().zip(gammas) {
                    *f *= params.value(*gamma);
                }
            }
            Modifier::ShapeFactor { params: ids } => {
                for (f, id) in factors.iter_mut().zip(ids) {
                    *f *= params.value(*id);
                }
            }
        }
    }
}

/// Piecewise-linear normalization factor: `lo` at alpha = -1, `hi` at alpha = +1
#[must_use]
pub fn overall_sys_factor(alpha: f64, lo: f64, hi: f64) -> f64 {
    if alpha >= 0.0 {
        1.0 + alpha * (hi - 1.0)
    } else {
        1.0 + alpha * (1.0 - lo)
    }
}

/// Piecewise-linear additive shape delta for one bin
#[must_use]
pub fn histo_sys_delta(alpha: f64, nominal: f64, lo: f64, hi: f64) -> f64 {
    if alpha >= 0.0 {
        alpha * (hi - nominal)
    } else {
        alpha * (nominal - lo)
    }
}
