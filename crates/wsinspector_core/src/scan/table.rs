//! Sensitivity table: per-sample grids of (parameter x category) cells

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LookupError;

/// Reserved pseudo-sample aggregating the signal part of a category
pub const SIGNAL: &str = "signal";
/// Reserved pseudo-sample aggregating the background-only category total
pub const BACKGROUND: &str = "background";

/// Relative yield change of one perturbation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shift {
    /// `(varied / nominal - 1) * 100`
    Percent(f64),
    /// The nominal yield was too close to zero to divide by
    NoEffect,
}

impl Shift {
    /// Percent change of `varied` relative to `nominal`.
    ///
    /// Returns [`Shift::NoEffect`] when `|nominal| < epsilon`.
    #[must_use]
    pub fn relative(varied: f64, nominal: f64, epsilon: f64) -> Self {
        if nominal.abs() < epsilon {
            Shift::NoEffect
        } else {
            Shift::Percent((varied / nominal - 1.0) * 100.0)
        }
    }

    #[must_use]
    pub fn percent(self) -> Option<f64> {
        match self {
            Shift::Percent(p) => Some(p),
            Shift::NoEffect => None,
        }
    }

    /// True when there is nothing worth printing
    #[must_use]
    pub fn is_negligible(self, epsilon: f64) -> bool {
        match self {
            Shift::Percent(p) => p.abs() < epsilon,
            Shift::NoEffect => true,
        }
    }

    fn approx_eq(self, other: Shift, tolerance: f64) -> bool {
        match (self, other) {
            (Shift::Percent(a), Shift::Percent(b)) => (a - b).abs() <= tolerance,
            (Shift::NoEffect, Shift::NoEffect) => true,
            _ => false,
        }
    }
}

/// Up and down shifts for one (sample, category, parameter)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensitivityCell {
    pub up: Shift,
    pub down: Shift,
}

impl SensitivityCell {
    #[must_use]
    pub fn from_yields(up: f64, down: f64, nominal: f64, epsilon: f64) -> Self {
        Self {
            up: Shift::relative(up, nominal, epsilon),
            down: Shift::relative(down, nominal, epsilon),
        }
    }
}

/// Dense two-dimensional grid stored row-major with the column index varying fastest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: Clone> Grid<T> {
    pub fn new(rows: usize, cols: usize, default: T) -> Self {
        Self {
            data: vec![default; rows * cols],
            rows,
            cols,
        }
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn flat_index(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        self.flat_index(row, col).map(|i| &self.data[i])
    }

    /// Set a value, returning false if the index is out of range
    pub fn set(&mut self, row: usize, col: usize, value: T) -> bool {
        match self.flat_index(row, col) {
            Some(i) => {
                self.data[i] = value;
                true
            }
            None => false,
        }
    }

    /// One row as a slice
    #[must_use]
    pub fn row(&self, row: usize) -> Option<&[T]> {
        (row < self.rows).then(|| &self.data[row * self.cols..(row + 1) * self.cols])
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }
}

/// Cells of one sample, rows are parameters and columns are categories
pub type SampleGrid = Grid<Option<SensitivityCell>>;

/// All results of one sensitivity scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityTable {
    categories: Vec<String>,
    parameters: Vec<String>,
    samples: BTreeMap<String, SampleGrid>,
}

impl SensitivityTable {
    #[must_use]
    pub fn new(categories: Vec<String>, parameters: Vec<String>) -> Self {
        Self {
            categories,
            parameters,
            samples: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    #[must_use]
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Store one cell, creating the sample's grid on first use
    pub fn record(&mut self, sample: &str, category: usize, parameter: usize, cell: SensitivityCell) {
        let (rows, cols) = (self.parameters.len(), self.categories.len());
        let grid = self
            .samples
            .entry(sample.to_string())
            .or_insert_with(|| Grid::new(rows, cols, None));
        if !grid.set(parameter, category, Some(cell)) {
            tracing::warn!(sample, category, parameter, "cell index out of range, dropped");
        }
    }

    /// Grid of a sample, or a lookup failure if nothing was recorded for it
    pub fn sample(&self, name: &str) -> Result<&SampleGrid, LookupError> {
        self.samples
            .get(name)
            .ok_or_else(|| LookupError::SampleNotFound(name.to_string()))
    }

    #[must_use]
    pub fn has_sample(&self, name: &str) -> bool {
        self.samples.contains_key(name)
    }

    /// Cell for (sample, category, parameter) by name
    #[must_use]
    pub fn cell(&self, sample: &str, category: &str, parameter: &str) -> Option<SensitivityCell> {
        let col = self.categories.iter().position(|c| c == category)?;
        let row = self.parameters.iter().position(|p| p == parameter)?;
        self.samples.get(sample)?.get(row, col).copied().flatten()
    }

    /// Component samples in sorted order, followed by `signal` and `background`
    #[must_use]
    pub fn sample_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .samples
            .keys()
            .map(String::as_str)
            .filter(|name| *name != SIGNAL && *name != BACKGROUND)
            .collect();
        for reserved in [SIGNAL, BACKGROUND] {
            if self.has_sample(reserved) {
                names.push(reserved);
            }
        }
        names
    }

    /// Same shape, same samples and every shift within `tolerance`
    #[must_use]
    pub fn approx_eq(&self, other: &SensitivityTable, tolerance: f64) -> bool {
        if self.categories != other.categories
            || self.parameters != other.parameters
            || self.samples.len() != other.samples.len()
        {
            return false;
        }
        self.samples.iter().all(|(name, grid)| {
            let Some(other_grid) = other.samples.get(name) else {
                return false;
            };
            grid.data()
                .iter()
                .zip(other_grid.data())
                .all(|(a, b)| match (a, b) {
                    (Some(a), Some(b)) => {
                        a.up.approx_eq(b.up, tolerance) && a.down.approx_eq(b.down, tolerance)
                    }
                    (None, None) => true,
                    _ => false,
                })
        })
    }
}
