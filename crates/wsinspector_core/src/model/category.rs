//! Categories (regions) and their additive sample decomposition

use serde::{Deserialize, Serialize};

use super::modifier::Modifier;
use super::parameters::ParameterSet;
use crate::error::EvalError;

/// Structural prefix carried by every raw component name
pub const COMPONENT_PREFIX: &str = "L_x_";

/// Binned observable a category is defined over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observable {
    pub name: String,
    pub bins: usize,
    #[serde(default)]
    pub low: f64,
    #[serde(default = "default_high")]
    pub high: f64,
}

fn default_high() -> f64 {
    1.0
}

/// One additive term of a category's model
#[derive(Debug, Clone, PartialEq)]
pub struct SampleComponent {
    /// Display name derived from `raw_name`
    pub name: String,
    pub raw_name: String,
    pub nominal: Vec<f64>,
    pub modifiers: Vec<Modifier>,
}

impl SampleComponent {
    /// Build a component, deriving its sample name from the raw name.
    #[must_use]
    pub fn new(
        raw_name: impl Into<String>,
        category: &str,
        nominal: Vec<f64>,
        modifiers: Vec<Modifier>,
    ) -> Self {
        let raw_name = raw_name.into();
        Self {
            name: sample_name(&raw_name, category),
            raw_name,
            nominal,
            modifiers,
        }
    }

    /// Per-bin yields at the current parameter state.
    ///
    /// `bins` is the owning category's bin count; every per-bin array must agree with it.
    pub fn bin_yields(&self, params: &ParameterSet, bins: usize) -> Result<Vec<f64>, EvalError> {
        self.check_bins(bins)?;

        let mut additive = vec![0.0; bins];
        let mut factors = vec![1.0; bins];
        for modifier in &self.modifiers {
            modifier.apply(&self.nominal, params, &mut additive, &mut factors);
        }

        Ok(self
            .nominal
            .iter()
            .zip(additive)
            .zip(factors)
            .map(|((nom, add), factor)| ((nom + add) * factor).max(0.0))
            .collect())
    }

    /// Integrated yield over the observable at the current parameter state
    pub fn integral(&self, params: &ParameterSet, bins: usize) -> Result<f64, EvalError> {
        Ok(self.bin_yields(params, bins)?.iter().sum())
    }

    fn check_bins(&self, bins: usize) -> Result<(), EvalError> {
        let mismatch = |actual| EvalError::BinMismatch {
            component: self.raw_name.clone(),
            expected: bins,
            actual,
        };
        if self.nominal.len() != bins {
            return Err(mismatch(self.nominal.len()));
        }
        for modifier in &self.modifiers {
            match modifier.bin_count() {
                Some(n) if n != bins => return Err(mismatch(n)),
                _ => {}
            }
        }
        Ok(())
    }
}

/// One slice of the simultaneous model
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    /// `None` when the pdf names an observable the model config does not provide
    pub observable: Option<Observable>,
    pub components: Vec<SampleComponent>,
}

impl Category {
    /// Bin count of the bound observable
    pub fn bins(&self) -> Result<usize, EvalError> {
        match &self.observable {
            Some(obs) if obs.bins > 0 => Ok(obs.bins),
            _ => Err(EvalError::NoObservableBinding {
                category: self.name.clone(),
            }),
        }
    }

    /// Ordered sample decomposition
    #[must_use]
    pub fn decomposition(&self) -> &[SampleComponent] {
        &self.components
    }

    #[must_use]
    pub fn component(&self, name: &str) -> Option<&SampleComponent> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Per-bin total over all components
    pub fn bin_yields(&self, params: &ParameterSet) -> Result<Vec<f64>, EvalError> {
        let bins = self.bins()?;
        let mut total = vec![0.0; bins];
        for component in &self.components {
            for (t, y) in total.iter_mut().zip(component.bin_yields(params, bins)?) {
                *t += y;
            }
        }
        Ok(total)
    }

    /// Total expected yield
    pub fn expected_events(&self, params: &ParameterSet) -> Result<f64, EvalError> {
        let bins = self.bins()?;
        self.components
            .iter()
            .map(|c| c.integral(params, bins))
            .sum()
    }
}

/// Derive a sample name from a raw component name.
///
/// Everything from `_<category>` onwards is dropped, then the structural
/// `L_x_` prefix is removed. A raw name that does not mention the category is
/// only stripped of the prefix.
#[must_use]
pub fn sample_name(raw_name: &str, category: &str) -> String {
    let suffix = format!("_{category}");
    let head = raw_name
        .find(&suffix)
        .map_or(raw_name, |pos| &raw_name[..pos]);
    head.replace(COMPONENT_PREFIX, "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ParamId, Parameter};

    #[test]
    fn test_sample_name_strips_suffix_and_prefix() {
        assert_eq!(
            sample_name("L_x_ttbar_SR_overallSyst_x_StatUncert", "SR"),
            "ttbar"
        );
        assert_eq!(
            sample_name("L_x_Zprime_channel1_overallSyst_x_Exp", "channel1"),
            "Zprime"
        );
    }

    #[test]
    fn test_sample_name_without_category_token() {
        assert_eq!(sample_name("L_x_multijet", "SR"), "multijet");
        assert_eq!(sample_name("plain", "SR"), "plain");
    }

    #[test]
    fn test_bins_without_observable_fails() {
        let category = Category {
            name: "SR".to_string(),
            observable: None,
            components: Vec::new(),
        };
        assert_eq!(
            category.expected_events(&ParameterSet::new()),
            Err(EvalError::NoObservableBinding {
                category: "SR".to_string()
            })
        );
    }

    #[test]
    fn test_bin_mismatch_is_reported() {
        let mut params = ParameterSet::new();
        params.insert(Parameter::new("mu", 1.0));
        let component = SampleComponent::new(
            "L_x_sig_SR_overallSyst",
            "SR",
            vec![1.0, 2.0, 3.0],
            vec![Modifier::NormFactor { param: ParamId(0) }],
        );
        let err = component.integral(&params, 2).unwrap_err();
        assert!(matches!(
            err,
            EvalError::BinMismatch {
                expected: 2,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_expected_events_sums_components() {
        let mut params = ParameterSet::new();
        let mu = params.insert(Parameter::new("mu", 2.0)).unwrap();
        let category = Category {
            name: "SR".to_string(),
            observable: Some(Observable {
                name: "obs_x_SR".to_string(),
                bins: 2,
                low: 0.0,
                high: 1.0,
            }),
            components: vec![
                SampleComponent::new(
                    "L_x_sig_SR",
                    "SR",
                    vec![1.0, 2.0],
                    vec![Modifier::NormFactor { param: mu }],
                ),
                SampleComponent::new("L_x_bkg_SR", "SR", vec![10.0, 20.0], Vec::new()),
            ],
        };
        assert_eq!(category.expected_events(&params).unwrap(), 36.0);
        assert_eq!(category.bin_yields(&params).unwrap(), vec![12.0, 24.0]);
    }
}
