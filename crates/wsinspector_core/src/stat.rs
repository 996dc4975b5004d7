//! Per-bin statistical uncertainty matrices
//!
//! `data_stat[c][b]` is the relative Poisson uncertainty `1/sqrt(n)` of the
//! data count in bin `b` of category `c`. `mc_stat[c][b]` is the relative
//! change of the expected yield when every statistical-error factor is moved
//! up by one sigma. Both are zero-padded to the widest category.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand_distr::{Distribution, Poisson};
use serde::{Deserialize, Serialize};

use crate::classify::Classification;
use crate::error::{EvalError, Result};
use crate::model::{CategoryId, Model};
use crate::snapshot::{Snapshot, set_all_stat_error_to_sigma};
use crate::yields::YieldEvaluator;

/// Where the data counts for `data_stat` come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DataMode {
    /// The model's dataset, falling back to Asimov per missing category
    #[default]
    Observed,
    /// Expected yields at the current parameter state
    Asimov,
    /// One Poisson fluctuation of the Asimov counts
    Toy { seed: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyMatrices {
    pub categories: Vec<String>,
    pub max_bins: usize,
    pub data_stat: Vec<Vec<f64>>,
    pub mc_stat: Vec<Vec<f64>>,
}

impl UncertaintyMatrices {
    /// Largest relative MC statistical uncertainty over all bins
    #[must_use]
    pub fn max_mc_stat(&self) -> f64 {
        self.mc_stat
            .iter()
            .flatten()
            .fold(0.0_f64, |acc, v| acc.max(*v))
    }
}

/// Compute both matrices. Parameter values are restored before returning.
pub fn uncertainty_matrices(
    model: &mut Model,
    evaluator: &YieldEvaluator,
    classification: &Classification,
    mode: DataMode,
) -> Result<UncertaintyMatrices> {
    let snapshot = Snapshot::capture_all(&model.parameters);
    let result = compute(model, evaluator, classification, mode);
    snapshot.restore(&mut model.parameters)?;
    result
}

fn compute(
    model: &mut Model,
    evaluator: &YieldEvaluator,
    classification: &Classification,
    mode: DataMode,
) -> Result<UncertaintyMatrices> {
    let max_bins = model.max_bins();
    let ids: Vec<CategoryId> = model.category_ids().collect();
    let mut rng = match mode {
        DataMode::Toy { seed } => Some(SmallRng::seed_from_u64(seed)),
        _ => None,
    };

    let mut data_stat = Vec::with_capacity(ids.len());
    for &id in &ids {
        let counts = data_counts(model, evaluator, id, mode, rng.as_mut())?;
        let mut row = vec![0.0; max_bins];
        for (slot, n) in row.iter_mut().zip(&counts) {
            if *n != 0.0 {
                *slot = 1.0 / n.sqrt();
            }
        }
        data_stat.push(row);
    }

    evaluator.set_poi(model, 1.0);
    let mut central = Vec::with_capacity(ids.len());
    for &id in &ids {
        central.push(evaluator.category_bin_yields(model, id)?);
    }

    set_all_stat_error_to_sigma(model, classification, 1.0)?;
    let mut mc_stat = Vec::with_capacity(ids.len());
    for (&id, nominal) in ids.iter().zip(&central) {
        let up = evaluator.category_bin_yields(model, id)?;
        let mut row = vec![0.0; max_bins];
        for ((slot, nom), up) in row.iter_mut().zip(nominal).zip(&up) {
            if *nom != 0.0 {
                *slot = (up - nom) / nom;
            }
        }
        mc_stat.push(row);
    }

    Ok(UncertaintyMatrices {
        categories: model.categories.iter().map(|c| c.name.clone()).collect(),
        max_bins,
        data_stat,
        mc_stat,
    })
}

fn data_counts(
    model: &Model,
    evaluator: &YieldEvaluator,
    id: CategoryId,
    mode: DataMode,
    rng: Option<&mut SmallRng>,
) -> std::result::Result<Vec<f64>, EvalError> {
    if mode == DataMode::Observed {
        if let Some(counts) = model.data_counts(id) {
            return Ok(counts.to_vec());
        }
        tracing::warn!(
            category = %model.category(id)?.name,
            "no observed data for category, using Asimov counts"
        );
    }

    let expected = evaluator.category_bin_yields(model, id)?;
    Ok(match rng {
        Some(rng) => expected.iter().map(|&mu| poisson_draw(mu, rng)).collect(),
        None => expected,
    })
}

fn poisson_draw(mean: f64, rng: &mut SmallRng) -> f64 {
    match Poisson::new(mean) {
        Ok(dist) => dist.sample(rng),
        Err(_) => 0.0,
    }
}
