//! Workspace inspection library
//!
//! This crate inspects a binned statistical model without fitting it. It
//! provides:
//! - A typed model (categories, sample components, modifiers, parameters)
//! - JSON/YAML model loading and structural validation
//! - Parameter classification and side-effect-free snapshot/restore
//! - A perturbation scan giving per-category, per-sample percent yield shifts
//! - Impact tables, yield summaries and statistical uncertainty matrices
//! - Fixed-width text reports
//!
//! # Builder DSL
//!
//! ```
//! use wsinspector_core::{CategoryBuilder, InspectConfig, Inspector, ModelBuilder, SampleBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = ModelBuilder::new("combined")
//!     .poi("SigXsecOverSM", 1.0)
//!     .lumi(1.0, 0.1)
//!     .category(CategoryBuilder::new("SR", 2)
//!         .sample(SampleBuilder::new("Zprime", vec![20.0, 10.0])
//!             .norm_factor("SigXsecOverSM")
//!             .lumi())
//!         .sample(SampleBuilder::new("ttbar", vec![100.0, 50.0])
//!             .overall_sys("alpha_jes", 0.9, 1.1)))
//!     .build_model()?;
//!
//! let mut inspector = Inspector::new(model, InspectConfig::default())?;
//! let inspection = inspector.run()?;
//! assert!(inspection.report.contains("' Zprime '"));
//! println!("{}", inspection.report);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod classify;
pub mod error;
pub mod inspect;
pub mod scan;
pub mod snapshot;
pub mod stat;
pub mod yields;

// ============================================================================
// Model, loading and reporting
// ============================================================================

pub mod config;
pub mod load;
pub mod model;
pub mod report;
pub mod validate;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::{CategoryBuilder, InspectConfig, ModelBuilder, SampleBuilder};
pub use error::{InspectError, Result};
pub use inspect::{Inspection, Inspector};
pub use load::load_model;
pub use model::Model;
pub use scan::{SensitivityScanner, SensitivityTable};
