//! Product categories and the apportionment behavior they select.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Endorsement product category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Multi-bag material: lots may end in a partial ("excess") lot.
    #[default]
    #[serde(rename = "MB")]
    Mb,
    #[serde(rename = "DC")]
    Dc,
}

/// How a category apportions quantity across lots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryBehavior {
    /// Weight per lot and the excess flag drive validation and splitting.
    ExcessCapable,
    /// Weight per lot and the excess flag are ignored for validation; no excess lines.
    FlatOnly,
}

impl Category {
    pub fn behavior(self) -> CategoryBehavior {
        match self {
            Category::Mb => CategoryBehavior::ExcessCapable,
            Category::Dc => CategoryBehavior::FlatOnly,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Mb => "MB",
            Category::Dc => "DC",
        }
    }
}

impl CategoryBehavior {
    /// Whether the excess flag is honored for this behavior.
    pub fn splits_excess(self, has_excess: bool) -> bool {
        matches!(self, CategoryBehavior::ExcessCapable) && has_excess
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown category '{0}' (expected MB or DC)")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MB" => Ok(Category::Mb),
            "DC" => Ok(Category::Dc),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}
