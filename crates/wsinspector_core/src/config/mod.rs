//! Run configuration and the model builder DSL

mod builder;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use builder::{CategoryBuilder, ModelBuilder, SampleBuilder};

use crate::classify::{ClassificationRule, DeclaredKindRule, HeuristicRule};
use crate::scan::DEFAULT_EPSILON;
use crate::stat::DataMode;

fn default_epsilon() -> f64 {
    DEFAULT_EPSILON
}

fn default_stat_error_marker() -> String {
    "gamma_stat".to_string()
}

fn default_lumi_parameter() -> String {
    "Lumi".to_string()
}

fn default_nominal_lumi_constant() -> String {
    "nominalLumi".to_string()
}

fn default_true() -> bool {
    true
}

fn default_systematic_threshold() -> f64 {
    0.1
}

fn default_parameter_width() -> usize {
    40
}

fn default_region_width() -> usize {
    18
}

fn default_name_replacements() -> Vec<NameReplacement> {
    vec![
        NameReplacement::new("alpha_", ""),
        NameReplacement::new("Intercalibration", "Inter"),
    ]
}

fn default_region_strip_tokens() -> Vec<String> {
    ["Region_", "_Y2015", "_distmva_DSR"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Which [`ClassificationRule`] tags the parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMode {
    /// Name and nominal-value heuristic
    #[default]
    Heuristic,
    /// Kinds declared in the model file, heuristic for the rest
    Declared,
}

/// A substring replacement applied to parameter display names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameReplacement {
    pub from: String,
    pub to: String,
}

impl NameReplacement {
    #[must_use]
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// Fixed-width report layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_name_replacements")]
    pub name_replacements: Vec<NameReplacement>,
    /// Tokens removed from region names in column headers
    #[serde(default = "default_region_strip_tokens")]
    pub region_strip_tokens: Vec<String>,
    #[serde(default = "default_parameter_width")]
    pub parameter_width: usize,
    #[serde(default = "default_region_width")]
    pub region_width: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            name_replacements: default_name_replacements(),
            region_strip_tokens: default_region_strip_tokens(),
            parameter_width: default_parameter_width(),
            region_width: default_region_width(),
        }
    }
}

/// Everything that steers one inspection run
///
/// Every field has a default, so an empty YAML document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectConfig {
    /// Nominal yields with a smaller magnitude give "no measurable effect"
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,

    // === Classification ===
    #[serde(default = "default_stat_error_marker")]
    pub stat_error_marker: String,
    #[serde(default = "default_lumi_parameter")]
    pub lumi_parameter: String,
    /// Model constant holding the nominal luminosity
    #[serde(default = "default_nominal_lumi_constant")]
    pub nominal_lumi_constant: String,
    /// Overrides the relative luminosity error stored in the model
    #[serde(default)]
    pub lumi_relative_error: Option<f64>,
    #[serde(default)]
    pub classification: ClassificationMode,

    /// Parameters set to a value and made constant before the nominal capture
    #[serde(default)]
    pub fix_parameters: BTreeMap<String, f64>,

    // === Output ===
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub data_mode: DataMode,
    /// Samples to print sensitivity reports for; empty means every computed sample
    #[serde(default)]
    pub samples: Vec<String>,
    #[serde(default = "default_true")]
    pub show_inventory: bool,
    #[serde(default = "default_true")]
    pub show_yields: bool,
    #[serde(default)]
    pub show_impacts: bool,
    #[serde(default)]
    pub show_systematics: bool,
    /// Rows of the systematic shift table at or below this percentage are omitted
    #[serde(default = "default_systematic_threshold")]
    pub systematic_threshold: f64,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            stat_error_marker: default_stat_error_marker(),
            lumi_parameter: default_lumi_parameter(),
            nominal_lumi_constant: default_nominal_lumi_constant(),
            lumi_relative_error: None,
            classification: ClassificationMode::default(),
            fix_parameters: BTreeMap::new(),
            report: ReportConfig::default(),
            data_mode: DataMode::default(),
            samples: Vec::new(),
            show_inventory: true,
            show_yields: true,
            show_impacts: false,
            show_systematics: false,
            systematic_threshold: default_systematic_threshold(),
        }
    }
}

impl InspectConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, serde_saphyr::Error> {
        serde_saphyr::from_str(yaml)
    }

    #[must_use]
    pub fn heuristic_rule(&self) -> HeuristicRule {
        HeuristicRule {
            stat_error_marker: self.stat_error_marker.clone(),
            lumi_name: self.lumi_parameter.clone(),
        }
    }

    /// The classification rule selected by `classification`
    #[must_use]
    pub fn rule(&self) -> Box<dyn ClassificationRule> {
        match self.classification {
            ClassificationMode::Heuristic => Box::new(self.heuristic_rule()),
            ClassificationMode::Declared => Box::new(DeclaredKindRule {
                fallback: self.heuristic_rule(),
            }),
        }
    }
}
