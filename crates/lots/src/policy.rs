//! Named business rules that the engine's behavior hinges on.
//!
//! Each field pins one decision that could reasonably go either way, so tests
//! and configuration can refer to it by name.

use serde::{Deserialize, Serialize};

use lotledger_core::{DomainError, DomainResult, Tolerance};

/// Enough for the longest possible range, `0001AA-9999AA`.
pub const DEFAULT_MAX_ALLOCATION_LINES: u32 = 10_000;

/// How ranges that wrap past `9999` are treated downstream of parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloverPolicy {
    /// Count, apportion and overlap-check both sides of the wrap.
    #[default]
    Expand,
    /// Refuse rollover ranges at validation time.
    Reject,
}

/// Which recorded lots a candidate is compared against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapScope {
    /// Lot numbers are physically unique regardless of product.
    #[default]
    Global,
    /// Only lots recorded under the same product code.
    PerProduct,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlapPolicy {
    /// Single-lot identifiers are exempt from overlap checking unless set.
    pub check_single_lots: bool,
    pub scope: OverlapScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotPolicy {
    pub tolerance: Tolerance,
    pub rollover: RolloverPolicy,
    pub overlap: OverlapPolicy,
    /// A single lot flagged with excess accepts any positive quantity. When
    /// cleared, the quantity must leave a partial lot.
    pub single_lot_excess_unbounded: bool,
    /// Upper bound on the lines one submission may generate.
    pub max_allocation_lines: u32,
}

impl Default for LotPolicy {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            rollover: RolloverPolicy::default(),
            overlap: OverlapPolicy::default(),
            single_lot_excess_unbounded: true,
            max_allocation_lines: DEFAULT_MAX_ALLOCATION_LINES,
        }
    }
}

impl LotPolicy {
    /// Reject settings that would make comparisons or generation meaningless.
    pub fn check(&self) -> DomainResult<()> {
        self.tolerance.check()?;
        if self.max_allocation_lines == 0 {
            return Err(DomainError::validation(
                "max_allocation_lines must be at least 1",
            ));
        }
        Ok(())
    }
}
