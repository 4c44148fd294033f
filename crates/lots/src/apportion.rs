//! Splitting a submitted total into per-lot allocation lines.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use lotledger_core::{ValueObject, is_positive_finite, round_to_cents};

use crate::category::CategoryBehavior;

use crate::code::LotCode;
use crate::identifier::{LotIdentifier, LotRange};
use crate::policy::{LotPolicy, RolloverPolicy};
use crate::quantity::QuantityClaim;

/// Per-submission data copied onto every line unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionMetadata {
    /// Bag number written on the submission form; descriptive, not a counter.
    pub bag_number: Option<u32>,
}

/// Quantity allocated to one lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationLine {
    pub lot_code: LotCode,
    pub quantity: f64,
    /// Set on the partial lot that closes an excess run.
    pub excess_amount: Option<f64>,
    pub metadata: SubmissionMetadata,
}

impl AllocationLine {
    fn full(lot_code: LotCode, quantity: f64, metadata: SubmissionMetadata) -> Self {
        Self {
            lot_code,
            quantity,
            excess_amount: None,
            metadata,
        }
    }

    fn excess(lot_code: LotCode, amount: f64, metadata: SubmissionMetadata) -> Self {
        Self {
            lot_code,
            quantity: amount,
            excess_amount: Some(amount),
            metadata,
        }
    }

    pub fn is_excess(&self) -> bool {
        self.excess_amount.is_some()
    }
}

impl ValueObject for AllocationLine {}

/// Ordered allocation lines plus whatever could not be placed on a declared lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apportionment {
    lines: Vec<AllocationLine>,
    unallocated: f64,
}

impl Apportionment {
    pub fn lines(&self) -> &[AllocationLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<AllocationLine> {
        self.lines
    }

    /// Quantity left over after the last declared lot was filled.
    pub fn unallocated(&self) -> f64 {
        self.unallocated
    }

    pub fn allocated_total(&self) -> f64 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    pub fn excess_line(&self) -> Option<&AllocationLine> {
        self.lines.iter().find(|line| line.is_excess())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApportionError {
    #[error("quantity must be a finite number greater than zero (got {quantity})")]
    NonPositiveQuantity { quantity: f64 },

    #[error("weight per lot must be a finite number greater than zero (got {weight})")]
    NonPositiveWeight { weight: f64 },

    #[error("{quantity} at {weight} per lot needs more than {limit} allocation lines")]
    TooManyLines { quantity: f64, weight: f64, limit: u32 },

    #[error("lot range {range} changes suffix without a 9999 rollover; cannot enumerate its lots")]
    SuffixMismatch { range: String },

    #[error("lot range {range} wraps past 9999, which is not permitted")]
    RolloverNotPermitted { range: String },
}

/// Produce the allocation lines for a claim that already passed
/// [`validate`](crate::consistency::validate).
pub fn apportion(
    identifier: &LotIdentifier,
    claim: &QuantityClaim,
    metadata: SubmissionMetadata,
    policy: &LotPolicy,
) -> Result<Apportionment, ApportionError> {
    let quantity = claim.quantity;
    if !is_positive_finite(quantity) {
        return Err(ApportionError::NonPositiveQuantity { quantity });
    }

    let flat = claim.behavior() == CategoryBehavior::FlatOnly;
    let needs_weight = !flat && (identifier.is_range() || claim.splits_excess());
    let weight = claim.weight_per_lot;
    if needs_weight && !is_positive_finite(weight) {
        return Err(ApportionError::NonPositiveWeight { weight });
    }

    let apportionment = match identifier {
        LotIdentifier::Range(range) => apportion_range(range, claim, metadata, policy)?,
        LotIdentifier::Single(code) => apportion_single(*code, claim, metadata, policy)?,
    };

    debug!(
        %identifier,
        lines = apportionment.lines.len(),
        allocated = apportionment.allocated_total(),
        "apportioned endorsement"
    );
    Ok(apportionment)
}

fn apportion_range(
    range: &LotRange,
    claim: &QuantityClaim,
    metadata: SubmissionMetadata,
    policy: &LotPolicy,
) -> Result<Apportionment, ApportionError> {
    if range.is_rollover() {
        if policy.rollover == RolloverPolicy::Reject {
            return Err(ApportionError::RolloverNotPermitted {
                range: range.to_string(),
            });
        }
    } else if !range.has_uniform_suffix() {
        return Err(ApportionError::SuffixMismatch {
            range: range.to_string(),
        });
    }

    if claim.behavior() == CategoryBehavior::FlatOnly {
        // The whole submitted quantity, recorded against the first lot.
        return Ok(Apportionment {
            lines: vec![AllocationLine::full(range.start(), claim.quantity, metadata)],
            unallocated: 0.0,
        });
    }

    let weight = claim.weight_per_lot;
    let codes = range.codes();
    let limit = policy.max_allocation_lines;
    if codes.len() > limit as usize {
        return Err(ApportionError::TooManyLines {
            quantity: claim.quantity,
            weight,
            limit,
        });
    }

    if !claim.splits_excess() {
        let lines = codes
            .into_iter()
            .map(|code| AllocationLine::full(code, weight, metadata))
            .collect();
        return Ok(Apportionment {
            lines,
            unallocated: 0.0,
        });
    }

    let tol = &policy.tolerance;
    let mut remaining = claim.quantity;
    let mut lines = Vec::with_capacity(codes.len());

    for code in codes {
        if tol.fills(remaining, weight) {
            lines.push(AllocationLine::full(code, weight, metadata));
            remaining -= weight;
            continue;
        }
        // First short lot closes the run; later lots in the range are not produced.
        if !tol.is_zero(remaining) {
            lines.push(AllocationLine::excess(code, round_to_cents(remaining), metadata));
        }
        remaining = 0.0;
        break;
    }

    let unallocated = if tol.is_zero(remaining) {
        0.0
    } else {
        let leftover = round_to_cents(remaining);
        warn!(%range, leftover, "quantity exceeds the declared lot range; surplus left unallocated");
        leftover
    };

    Ok(Apportionment { lines, unallocated })
}

fn apportion_single(
    code: LotCode,
    claim: &QuantityClaim,
    metadata: SubmissionMetadata,
    policy: &LotPolicy,
) -> Result<Apportionment, ApportionError> {
    if !claim.splits_excess() {
        return Ok(Apportionment {
            lines: vec![AllocationLine::full(code, claim.quantity, metadata)],
            unallocated: 0.0,
        });
    }

    let weight = claim.weight_per_lot;
    let limit = policy.max_allocation_lines;
    let too_many = || ApportionError::TooManyLines {
        quantity: claim.quantity,
        weight,
        limit,
    };
    let full_lots = policy
        .tolerance
        .whole_steps(claim.quantity, weight)
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n <= limit)
        .ok_or_else(too_many)?;
    let excess = round_to_cents(claim.quantity - f64::from(full_lots) * weight);
    if excess > 0.0 && full_lots == limit {
        return Err(too_many());
    }

    // One line per physical unit of the same lot.
    let mut lines: Vec<AllocationLine> = (0..full_lots)
        .map(|_| AllocationLine::full(code, weight, metadata))
        .collect();

    if excess > 0.0 {
        lines.push(AllocationLine::excess(code, excess, metadata));
    }

    Ok(Apportionment {
        lines,
        unallocated: 0.0,
    })
}
