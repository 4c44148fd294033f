//! Detecting lot ranges that claim physical lots already recorded elsewhere.
//!
//! The check is a read; it only prevents double assignment when the caller
//! runs it and the following insert in one serializable unit.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::code::LotSuffix;
use crate::identifier::{LotIdentifier, LotRange, LotSpan};
use crate::policy::{OverlapPolicy, OverlapScope};

/// A recorded, non-deleted endorsement's lot identifier as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingLotRecord {
    pub identifier_text: String,
    pub product_code: String,
}

/// What a lookup is asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotQuery {
    /// Records with any lot under this suffix.
    pub suffix: LotSuffix,
    /// Ranged records are always wanted; single lots only when set.
    pub include_single_lots: bool,
    /// Restrict to one product code.
    pub product_code: Option<String>,
}

impl LotQuery {
    /// Whether a stored identifier falls under this query.
    pub fn matches(&self, identifier: &LotIdentifier, product_code: &str) -> bool {
        if !identifier.is_range() && !self.include_single_lots {
            return false;
        }
        if !self.matches_product(product_code) {
            return false;
        }
        identifier.spans().iter().any(|span| span.suffix == self.suffix)
    }

    fn matches_product(&self, product_code: &str) -> bool {
        self.product_code
            .as_deref()
            .is_none_or(|wanted| wanted == product_code)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("existing lot lookup failed: {0}")]
pub struct LookupError(pub String);

/// Read access to previously recorded lots.
pub trait ExistingLotLookup {
    fn existing_lots(&self, query: &LotQuery) -> Result<Vec<ExistingLotRecord>, LookupError>;
}

impl<S> ExistingLotLookup for Arc<S>
where
    S: ExistingLotLookup + ?Sized,
{
    fn existing_lots(&self, query: &LotQuery) -> Result<Vec<ExistingLotRecord>, LookupError> {
        (**self).existing_lots(query)
    }
}

impl<S> ExistingLotLookup for &S
where
    S: ExistingLotLookup + ?Sized,
{
    fn existing_lots(&self, query: &LotQuery) -> Result<Vec<ExistingLotRecord>, LookupError> {
        (**self).existing_lots(query)
    }
}

/// A plain list of records acts as a lookup (tests, snapshots).
impl ExistingLotLookup for [ExistingLotRecord] {
    fn existing_lots(&self, query: &LotQuery) -> Result<Vec<ExistingLotRecord>, LookupError> {
        Ok(self
            .iter()
            .filter(|record| {
                LotIdentifier::parse_shape(&record.identifier_text)
                    .is_ok_and(|id| query.matches(&id, &record.product_code))
            })
            .cloned()
            .collect())
    }
}

impl ExistingLotLookup for Vec<ExistingLotRecord> {
    fn existing_lots(&self, query: &LotQuery) -> Result<Vec<ExistingLotRecord>, LookupError> {
        self.as_slice().existing_lots(query)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OverlapError {
    #[error("lot range {candidate} overlaps with existing lot {conflicting_identifier} (product code {conflicting_product_code}); use a non-overlapping range")]
    Overlap {
        candidate: String,
        conflicting_identifier: String,
        conflicting_product_code: String,
    },

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl OverlapError {
    /// An overlap is a data conflict for the submitter to resolve; retrying cannot help.
    pub fn is_fatal(&self) -> bool {
        matches!(self, OverlapError::Overlap { .. })
    }
}

/// Check any identifier, honoring the single-lot exemption in `policy`.
pub fn check_overlap<L>(
    candidate: &LotIdentifier,
    product_code: &str,
    lookup: &L,
    policy: &OverlapPolicy,
) -> Result<(), OverlapError>
where
    L: ExistingLotLookup + ?Sized,
{
    match candidate {
        LotIdentifier::Range(range) => check_range_overlap(range, product_code, lookup, policy),
        LotIdentifier::Single(code) if policy.check_single_lots => check_spans(
            &candidate.to_string(),
            &[LotSpan::single(*code)],
            product_code,
            lookup,
            policy,
        ),
        LotIdentifier::Single(_) => {
            debug!(%candidate, "single lot exempt from overlap check");
            Ok(())
        }
    }
}

/// Check a candidate range against recorded ranges sharing its suffix.
pub fn check_range_overlap<L>(
    candidate: &LotRange,
    product_code: &str,
    lookup: &L,
    policy: &OverlapPolicy,
) -> Result<(), OverlapError>
where
    L: ExistingLotLookup + ?Sized,
{
    check_spans(
        &candidate.to_string(),
        &candidate.spans(),
        product_code,
        lookup,
        policy,
    )
}

fn check_spans<L>(
    candidate_text: &str,
    spans: &[LotSpan],
    product_code: &str,
    lookup: &L,
    policy: &OverlapPolicy,
) -> Result<(), OverlapError>
where
    L: ExistingLotLookup + ?Sized,
{
    let scoped_product = match policy.scope {
        OverlapScope::Global => None,
        OverlapScope::PerProduct => Some(product_code.to_string()),
    };

    for span in spans.iter().filter(|span| !span.is_empty()) {
        let query = LotQuery {
            suffix: span.suffix,
            include_single_lots: policy.check_single_lots,
            product_code: scoped_product.clone(),
        };

        for record in lookup.existing_lots(&query)? {
            // Re-submitting the same identifier (e.g. an edit) is not an overlap.
            if record.identifier_text == candidate_text {
                continue;
            }
            if !query.matches_product(&record.product_code) {
                continue;
            }

            let existing = match LotIdentifier::parse_shape(&record.identifier_text) {
                Ok(existing) => existing,
                Err(err) => {
                    warn!(identifier = %record.identifier_text, error = %err, "skipping unreadable recorded lot identifier");
                    continue;
                }
            };
            if !existing.is_range() && !policy.check_single_lots {
                continue;
            }

            if existing.spans().iter().any(|other| span.intersects(other)) {
                debug!(candidate = candidate_text, conflicting = %record.identifier_text, "lot overlap detected");
                return Err(OverlapError::Overlap {
                    candidate: candidate_text.to_string(),
                    conflicting_identifier: record.identifier_text,
                    conflicting_product_code: record.product_code,
                });
            }
        }
    }

    Ok(())
}
