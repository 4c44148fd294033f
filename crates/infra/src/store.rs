//! Endorsement record store.
//!
//! The overlap check is a read followed by an insert. Both happen under the
//! store's write lock so two submissions can never both observe "no overlap"
//! and both insert. The insert path also enforces an exclusion constraint on
//! the stored spans themselves, independent of the detector.

use std::sync::RwLock;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use lotledger_core::{EndorsementId, Entity};
use lotledger_lots::{
    AllocationLine, Category, EndorsementStatus, EndorsementSubmission, ExistingLotLookup,
    ExistingLotRecord, Field, FieldError, LookupError, LotIdentifier, LotPolicy, LotQuery,
    OverlapError, OverlapScope, PreparedEndorsement, REFERENCE_PREFIX, SubmissionRejected,
    prepare_endorsement,
};

use crate::config::EngineConfig;

/// A committed endorsement and its allocation lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEndorsement {
    pub id: EndorsementId,
    /// Insertion order; also the number behind `EF-{n}` reference numbers.
    pub sequence: u64,
    pub reference_number: String,
    pub date_endorsed: NaiveDate,
    pub category: Category,
    pub product_code: String,
    pub identifier: LotIdentifier,
    pub quantity_kg: f64,
    pub weight_per_lot: f64,
    pub has_excess: bool,
    pub status: EndorsementStatus,
    pub endorsed_by: String,
    pub bag_number: Option<u32>,
    pub lines: Vec<AllocationLine>,
    /// Surplus beyond the declared range, kept for follow-up.
    pub unallocated: f64,
    pub deleted: bool,
    pub recorded_at: DateTime<Utc>,
}

impl StoredEndorsement {
    fn from_prepared(prepared: PreparedEndorsement, sequence: u64) -> Self {
        let PreparedEndorsement {
            submission,
            identifier,
            metadata,
            apportionment,
        } = prepared;
        let unallocated = apportionment.unallocated();

        Self {
            id: EndorsementId::new(),
            sequence,
            reference_number: submission.reference_number,
            date_endorsed: submission.date_endorsed,
            category: submission.category,
            product_code: submission.product_code,
            identifier,
            quantity_kg: submission.quantity_kg,
            weight_per_lot: submission.weight_per_lot,
            has_excess: submission.has_excess,
            status: submission.status,
            endorsed_by: submission.endorsed_by,
            bag_number: metadata.bag_number,
            lines: apportionment.into_lines(),
            unallocated,
            deleted: false,
            recorded_at: Utc::now(),
        }
    }

    fn as_existing(&self) -> ExistingLotRecord {
        ExistingLotRecord {
            identifier_text: self.identifier.to_string(),
            product_code: self.product_code.clone(),
        }
    }
}

impl Entity for StoredEndorsement {
    type Id = EndorsementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Rejected(#[from] SubmissionRejected),

    #[error("endorsement {0} not found")]
    NotFound(EndorsementId),

    #[error("endorsement store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// The submission collides with recorded lots.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Rejected(rejected) if rejected.is_fatal())
    }
}

/// Record store collaborator for endorsements.
pub trait EndorsementStore: ExistingLotLookup + Send + Sync {
    /// Validate, overlap-check, apportion and insert as one serializable unit.
    fn submit(&self, submission: &EndorsementSubmission) -> Result<StoredEndorsement, StoreError>;

    fn get(&self, id: EndorsementId) -> Result<StoredEndorsement, StoreError>;

    /// Non-deleted endorsements in insertion order.
    fn list(&self) -> Result<Vec<StoredEndorsement>, StoreError>;

    /// Hide an endorsement; its lots become available again.
    fn soft_delete(&self, id: EndorsementId) -> Result<(), StoreError>;

    /// The reference number the next submission is expected to carry.
    fn next_reference_number(&self) -> Result<String, StoreError>;
}

#[derive(Debug, Default)]
struct StoreState {
    rows: Vec<StoredEndorsement>,
    last_sequence: u64,
}

/// Read view over the rows while a lock is held.
struct LockedRows<'a>(&'a [StoredEndorsement]);

impl ExistingLotLookup for LockedRows<'_> {
    fn existing_lots(&self, query: &LotQuery) -> Result<Vec<ExistingLotRecord>, LookupError> {
        Ok(self
            .0
            .iter()
            .filter(|row| !row.deleted && query.matches(&row.identifier, &row.product_code))
            .map(StoredEndorsement::as_existing)
            .collect())
    }
}

/// In-memory store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryEndorsementStore {
    policy: LotPolicy,
    inner: RwLock<StoreState>,
}

impl InMemoryEndorsementStore {
    pub fn new(policy: LotPolicy) -> Self {
        Self {
            policy,
            inner: RwLock::new(StoreState::default()),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.policy)
    }

    pub fn policy(&self) -> &LotPolicy {
        &self.policy
    }

    /// Second line of defense: no two live rows may claim the same physical lot,
    /// whatever their text.
    fn check_exclusion(
        &self,
        rows: &[StoredEndorsement],
        prepared: &PreparedEndorsement,
    ) -> Result<(), FieldError> {
        let overlap = &self.policy.overlap;
        if !prepared.identifier.is_range() && !overlap.check_single_lots {
            return Ok(());
        }
        let spans = prepared.identifier.spans();
        let product = prepared.submission.product_code.as_str();

        let conflict = rows.iter().filter(|row| !row.deleted).find(|row| {
            if !row.identifier.is_range() && !overlap.check_single_lots {
                return false;
            }
            if overlap.scope == OverlapScope::PerProduct && row.product_code != product {
                return false;
            }
            let existing = row.identifier.spans();
            spans.iter().any(|span| existing.iter().any(|other| span.intersects(other)))
        });

        match conflict {
            None => Ok(()),
            Some(row) => {
                warn!(
                    candidate = %prepared.identifier,
                    conflicting = %row.identifier,
                    "exclusion constraint rejected endorsement"
                );
                Err(FieldError::new(
                    Field::Rule,
                    OverlapError::Overlap {
                        candidate: prepared.identifier.to_string(),
                        conflicting_identifier: row.identifier.to_string(),
                        conflicting_product_code: row.product_code.clone(),
                    },
                ))
            }
        }
    }
}

impl ExistingLotLookup for InMemoryEndorsementStore {
    fn existing_lots(&self, query: &LotQuery) -> Result<Vec<ExistingLotRecord>, LookupError> {
        let state = self
            .inner
            .read()
            .map_err(|_| LookupError("endorsement store lock poisoned".to_string()))?;
        LockedRows(&state.rows).existing_lots(query)
    }
}

impl EndorsementStore for InMemoryEndorsementStore {
    fn submit(&self, submission: &EndorsementSubmission) -> Result<StoredEndorsement, StoreError> {
        let mut state = self.inner.write().map_err(|_| StoreError::Poisoned)?;

        let prepared = prepare_endorsement(submission, &LockedRows(&state.rows), &self.policy)?;
        self.check_exclusion(&state.rows, &prepared)
            .map_err(SubmissionRejected::from)?;

        state.last_sequence += 1;
        let row = StoredEndorsement::from_prepared(prepared, state.last_sequence);
        info!(
            id = %row.id,
            reference = %row.reference_number,
            identifier = %row.identifier,
            lines = row.lines.len(),
            "endorsement recorded"
        );
        state.rows.push(row.clone());
        Ok(row)
    }

    fn get(&self, id: EndorsementId) -> Result<StoredEndorsement, StoreError> {
        let state = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        state
            .rows
            .iter()
            .find(|row| row.id == id && !row.deleted)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn list(&self) -> Result<Vec<StoredEndorsement>, StoreError> {
        let state = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(state.rows.iter().filter(|row| !row.deleted).cloned().collect())
    }

    fn soft_delete(&self, id: EndorsementId) -> Result<(), StoreError> {
        let mut state = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let row = state
            .rows
            .iter_mut()
            .find(|row| row.id == id && !row.deleted)
            .ok_or(StoreError::NotFound(id))?;
        row.deleted = true;
        info!(%id, reference = %row.reference_number, "endorsement soft-deleted");
        Ok(())
    }

    fn next_reference_number(&self) -> Result<String, StoreError> {
        let state = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(format!("{REFERENCE_PREFIX}{}", state.last_sequence + 1))
    }
}
