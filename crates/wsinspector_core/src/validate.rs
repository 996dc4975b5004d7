//! Structural checks run before any scanning

use rustc_hash::FxHashSet;

use crate::error::ValidationError;
use crate::model::{Model, PdfKind};
use crate::scan::{BACKGROUND, SIGNAL};

/// Reject models the scanner cannot handle.
///
/// The top-level pdf must be simultaneous, category names must not contain
/// `/`, a POI must be designated, and sample names must be unique per category
/// and distinct from the reserved pseudo-samples.
pub fn validate(model: &Model) -> Result<(), ValidationError> {
    if model.pdf_kind != PdfKind::Simultaneous {
        return Err(ValidationError::NotSimultaneous {
            pdf: model.pdf_name.clone(),
            kind: model.pdf_kind.name().to_string(),
        });
    }

    for category in &model.categories {
        if category.name.contains('/') {
            return Err(ValidationError::ReservedDelimiter {
                category: category.name.clone(),
            });
        }
        let mut seen = FxHashSet::default();
        for component in &category.components {
            if component.name == SIGNAL || component.name == BACKGROUND {
                return Err(ValidationError::ReservedSampleName {
                    category: category.name.clone(),
                    sample: component.name.clone(),
                });
            }
            if !seen.insert(component.name.as_str()) {
                return Err(ValidationError::DuplicateSample {
                    category: category.name.clone(),
                    sample: component.name.clone(),
                });
            }
        }
    }

    if model.pois.is_empty() {
        return Err(ValidationError::NoParameterOfInterest);
    }
    Ok(())
}
