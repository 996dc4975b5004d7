//! Expected-yield evaluation at the current parameter state

use crate::error::{EvalError, ValidationError};
use crate::model::{CategoryId, Model, ParamId};

/// Evaluates category and component yields, driving the POI directly.
///
/// Neither evaluation restores the POI; callers that care bracket their work
/// with a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct YieldEvaluator {
    poi: ParamId,
}

impl YieldEvaluator {
    /// Bind to the model's first parameter of interest
    pub fn new(model: &Model) -> Result<Self, ValidationError> {
        model
            .first_poi()
            .map(|poi| Self { poi })
            .ok_or(ValidationError::NoParameterOfInterest)
    }

    #[must_use]
    pub fn poi(&self) -> ParamId {
        self.poi
    }

    pub fn set_poi(&self, model: &mut Model, value: f64) {
        model.parameters.set_value(self.poi, value);
    }

    /// Total expected events of `category` with the POI set to `poi_value`
    pub fn category_yield(
        &self,
        model: &mut Model,
        category: CategoryId,
        poi_value: f64,
    ) -> Result<f64, EvalError> {
        self.set_poi(model, poi_value);
        model.category(category)?.expected_events(&model.parameters)
    }

    /// Integrated yield of one component at the current state
    pub fn component_yield(
        &self,
        model: &Model,
        category: CategoryId,
        index: usize,
    ) -> Result<f64, EvalError> {
        let cat = model.category(category)?;
        let bins = cat.bins()?;
        let component = cat
            .components
            .get(index)
            .ok_or_else(|| EvalError::UnknownComponent {
                category: cat.name.clone(),
                index,
            })?;
        component.integral(&model.parameters, bins)
    }

    /// Per-bin category totals at the current state
    pub fn category_bin_yields(
        &self,
        model: &Model,
        category: CategoryId,
    ) -> Result<Vec<f64>, EvalError> {
        model.category(category)?.bin_yields(&model.parameters)
    }

    /// Background-only and signal yields: `(f(poi=0), f(poi=1) - f(poi=0))`
    pub fn background_and_signal(
        &self,
        model: &mut Model,
        category: CategoryId,
    ) -> Result<(f64, f64), EvalError> {
        let background = self.category_yield(model, category, 0.0)?;
        let total = self.category_yield(model, category, 1.0)?;
        Ok((background, total - background))
    }
}

/// Which yield a summary row shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YieldKind {
    /// Total with the POI at 0
    Background,
    /// Total at POI 1 minus total at POI 0
    Signal,
    /// One named sample at POI 1
    Sample(String),
}

impl YieldKind {
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            YieldKind::Background => "Background",
            YieldKind::Signal => "Signal",
            YieldKind::Sample(name) => name,
        }
    }
}

/// Per-category yields of one kind, `None` where a category lacks the sample.
///
/// The POI is put back to its value at entry.
pub fn yield_row(
    model: &mut Model,
    evaluator: &YieldEvaluator,
    kind: &YieldKind,
) -> Result<Vec<Option<f64>>, EvalError> {
    let saved_poi = model.parameters.value(evaluator.poi());
    let row = collect_row(model, evaluator, kind);
    evaluator.set_poi(model, saved_poi);
    row
}

fn collect_row(
    model: &mut Model,
    evaluator: &YieldEvaluator,
    kind: &YieldKind,
) -> Result<Vec<Option<f64>>, EvalError> {
    let mut row = Vec::with_capacity(model.categories.len());
    for category in model.category_ids() {
        let value = match kind {
            YieldKind::Background => Some(evaluator.category_yield(model, category, 0.0)?),
            YieldKind::Signal => Some(evaluator.background_and_signal(model, category)?.1),
            YieldKind::Sample(name) => {
                evaluator.set_poi(model, 1.0);
                let index = model
                    .category(category)?
                    .components
                    .iter()
                    .position(|c| &c.name == name);
                match index {
                    Some(i) => Some(evaluator.component_yield(model, category, i)?),
                    None => None,
                }
            }
        };
        row.push(value);
    }
    Ok(row)
}
