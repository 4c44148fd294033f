//! The quantity side of an endorsement, as submitted.

use serde::{Deserialize, Serialize};

use crate::category::{Category, CategoryBehavior};

/// Submitted total, declared weight per lot, excess flag and category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantityClaim {
    pub quantity: f64,
    pub weight_per_lot: f64,
    pub has_excess: bool,
    pub category: Category,
}

impl QuantityClaim {
    pub fn new(quantity: f64, weight_per_lot: f64, has_excess: bool, category: Category) -> Self {
        Self {
            quantity,
            weight_per_lot,
            has_excess,
            category,
        }
    }

    pub fn behavior(&self) -> CategoryBehavior {
        self.category.behavior()
    }

    pub fn splits_excess(&self) -> bool {
        self.behavior().splits_excess(self.has_excess)
    }
}
