//! Pre-apportionment guard: is a submitted quantity unambiguous for the
//! identifier, weight per lot and excess flag it came with?

use thiserror::Error;
use tracing::debug;

use lotledger_core::is_positive_finite;

use crate::category::CategoryBehavior;
use crate::identifier::LotIdentifier;
use crate::policy::{LotPolicy, RolloverPolicy};
use crate::quantity::QuantityClaim;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConsistencyError {
    #[error("quantity must be a finite number greater than zero (got {quantity})")]
    NonPositiveQuantity { quantity: f64 },

    #[error("weight per lot must be a finite number greater than zero (got {weight})")]
    NonPositiveWeight { weight: f64 },

    #[error("quantity {actual} doesn't match the lots declared; expected exactly {expected} (or check 'has excess')")]
    QuantityMismatch { expected: f64, actual: f64 },

    #[error("quantity {actual} is too small for the lot range; minimum with excess is {minimum}")]
    BelowMinimum { minimum: f64, actual: f64 },

    #[error("quantity {quantity} exceeds the full lots ({full}) but the surplus isn't a whole number of lots")]
    ExcessNotAligned { quantity: f64, full: f64 },

    #[error("quantity {quantity} fills whole lots of {weight}; uncheck 'has excess'")]
    ExcessWithoutRemainder { quantity: f64, weight: f64 },

    #[error("lot range {identifier} wraps past 9999, which is not permitted")]
    RolloverNotPermitted { identifier: String },
}

/// Check a claim against its identifier before any lines are generated.
///
/// Pure; never touches the record store.
pub fn validate(
    identifier: &LotIdentifier,
    claim: &QuantityClaim,
    policy: &LotPolicy,
) -> Result<(), ConsistencyError> {
    let tol = &policy.tolerance;
    let quantity = claim.quantity;

    if !is_positive_finite(quantity) {
        return Err(ConsistencyError::NonPositiveQuantity { quantity });
    }

    if policy.rollover == RolloverPolicy::Reject && identifier.is_rollover() {
        return Err(ConsistencyError::RolloverNotPermitted {
            identifier: identifier.to_string(),
        });
    }

    if claim.behavior() == CategoryBehavior::FlatOnly {
        debug!(%identifier, category = %claim.category, "flat category, quantity checked for sign only");
        return Ok(());
    }

    let weight = claim.weight_per_lot;
    if !is_positive_finite(weight) {
        return Err(ConsistencyError::NonPositiveWeight { weight });
    }

    match (identifier, claim.has_excess) {
        (LotIdentifier::Range(_), false) => {
            let expected = f64::from(identifier.lot_count()) * weight;
            if !tol.approx_eq(quantity, expected) {
                return Err(ConsistencyError::QuantityMismatch {
                    expected,
                    actual: quantity,
                });
            }
        }
        (LotIdentifier::Range(_), true) => {
            let full = f64::from(identifier.lot_count()) * weight;
            // Only the final lot may be short.
            let minimum = full - weight;
            if !tol.approx_ge(quantity, minimum) {
                return Err(ConsistencyError::BelowMinimum {
                    minimum,
                    actual: quantity,
                });
            }
            if tol.definitely_gt(quantity, full) && !tol.is_multiple_of(quantity - full, weight) {
                return Err(ConsistencyError::ExcessNotAligned { quantity, full });
            }
        }
        (LotIdentifier::Single(_), false) => {
            if !tol.approx_eq(quantity, weight) {
                return Err(ConsistencyError::QuantityMismatch {
                    expected: weight,
                    actual: quantity,
                });
            }
        }
        (LotIdentifier::Single(_), true) => {
            if !policy.single_lot_excess_unbounded && tol.is_multiple_of(quantity, weight) {
                return Err(ConsistencyError::ExcessWithoutRemainder { quantity, weight });
            }
        }
    }

    Ok(())
}
