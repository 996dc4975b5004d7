//! Unique identifiers for model entities
//!
//! Parameters and categories are addressed by position in the model's
//! declaration order. Each has its own ID type so the two cannot be mixed up.

use serde::{Deserialize, Serialize};

/// Position of a parameter in the model's declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParamId(pub u32);

impl ParamId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Position of a category in the simultaneous pdf's registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub u16);

impl CategoryId {
    /// Most categories a model can address
    pub const MAX_COUNT: usize = u16::MAX as usize + 1;

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// `None` when `index` does not fit the ID width
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        u16::try_from(index).ok().map(CategoryId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_id_from_index() {
        assert_eq!(CategoryId::from_index(7), Some(CategoryId(7)));
        assert_eq!(
            CategoryId::from_index(CategoryId::MAX_COUNT - 1),
            Some(CategoryId(u16::MAX))
        );
        assert_eq!(CategoryId::from_index(CategoryId::MAX_COUNT), None);
    }
}
