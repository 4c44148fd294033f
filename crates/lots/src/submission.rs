//! Endorsement submissions: form-level checks and the full
//! parse → validate → overlap → apportion pipeline.
//!
//! Errors come back labeled by the field they belong to so the calling layer
//! can attach them to the originating input.

use core::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use lotledger_core::{DomainError, is_positive_finite};

use crate::apportion::{ApportionError, Apportionment, SubmissionMetadata, apportion};
use crate::category::Category;
use crate::consistency::{ConsistencyError, validate};
use crate::identifier::{LotIdentifier, ParseError};
use crate::overlap::{ExistingLotLookup, OverlapError, check_overlap};
use crate::policy::LotPolicy;
use crate::quantity::QuantityClaim;

pub const REFERENCE_PREFIX: &str = "EF-";
pub const MIN_PRODUCT_CODE_LEN: usize = 16;
const MAX_TEXT_LEN: usize = 255;

/// QC outcome recorded with the endorsement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EndorsementStatus {
    #[default]
    Passed,
    Failed,
}

/// An endorsement as entered on the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndorsementSubmission {
    pub reference_number: String,
    pub date_endorsed: NaiveDate,
    #[serde(default)]
    pub category: Category,
    pub product_code: String,
    pub lot_identifier: String,
    pub quantity_kg: f64,
    pub weight_per_lot: f64,
    #[serde(default)]
    pub status: EndorsementStatus,
    pub endorsed_by: String,
    #[serde(default)]
    pub has_excess: bool,
    /// `0` and absent both mean "no bag number".
    #[serde(default)]
    pub bag_number: Option<i64>,
}

impl EndorsementSubmission {
    pub fn claim(&self) -> QuantityClaim {
        QuantityClaim::new(
            self.quantity_kg,
            self.weight_per_lot,
            self.has_excess,
            self.category,
        )
    }

    /// Field-level checks that need no recorded data: the parsed identifier
    /// and normalized metadata, or every field error at once.
    pub fn validate(&self) -> Result<(LotIdentifier, SubmissionMetadata), SubmissionRejected> {
        check_form(self)
    }
}

/// Input a rejection is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ReferenceNumber,
    ProductCode,
    LotIdentifier,
    Quantity,
    WeightPerLot,
    BagNumber,
    EndorsedBy,
    /// A rule spanning several inputs.
    Rule,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::ReferenceNumber => "reference_number",
            Field::ProductCode => "product_code",
            Field::LotIdentifier => "lot_identifier",
            Field::Quantity => "quantity",
            Field::WeightPerLot => "weight_per_lot",
            Field::BagNumber => "bag_number",
            Field::EndorsedBy => "endorsed_by",
            Field::Rule => "rule",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SubmissionError {
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
    #[error(transparent)]
    Overlap(#[from] OverlapError),
    #[error(transparent)]
    Apportion(#[from] ApportionError),
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{field}: {error}")]
pub struct FieldError {
    pub field: Field,
    pub error: SubmissionError,
}

impl FieldError {
    pub fn new(field: Field, error: impl Into<SubmissionError>) -> Self {
        Self {
            field,
            error: error.into(),
        }
    }

    fn invalid(field: Field, msg: impl Into<String>) -> Self {
        Self::new(field, DomainError::validation(msg))
    }

    /// Only overlaps are final; everything else is an input to fix and resubmit.
    pub fn is_fatal(&self) -> bool {
        matches!(&self.error, SubmissionError::Overlap(err) if err.is_fatal())
    }
}

/// Every reason a submission was turned down.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("endorsement rejected: {}", summarize(.errors))]
pub struct SubmissionRejected {
    pub errors: Vec<FieldError>,
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl SubmissionRejected {
    pub fn errors_for(&self, field: Field) -> impl Iterator<Item = &FieldError> {
        self.errors.iter().filter(move |e| e.field == field)
    }

    pub fn is_fatal(&self) -> bool {
        self.errors.iter().any(FieldError::is_fatal)
    }
}

impl From<FieldError> for SubmissionRejected {
    fn from(value: FieldError) -> Self {
        Self {
            errors: vec![value],
        }
    }
}

/// A submission that passed every check, with its allocation lines.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedEndorsement {
    pub submission: EndorsementSubmission,
    pub identifier: LotIdentifier,
    pub metadata: SubmissionMetadata,
    pub apportionment: Apportionment,
}

/// Run the whole pipeline for one submission.
///
/// Form checks and identifier parsing are collected together; the remaining
/// steps depend on their predecessors and stop at the first failure.
/// `lookup` is read once per suffix; run this and the insert that follows in
/// one serializable unit.
pub fn prepare_endorsement<L>(
    submission: &EndorsementSubmission,
    lookup: &L,
    policy: &LotPolicy,
) -> Result<PreparedEndorsement, SubmissionRejected>
where
    L: ExistingLotLookup + ?Sized,
{
    let (identifier, metadata) = submission.validate()?;
    let claim = submission.claim();

    validate(&identifier, &claim, policy).map_err(|err| {
        let field = match err {
            ConsistencyError::NonPositiveWeight { .. } => Field::WeightPerLot,
            ConsistencyError::RolloverNotPermitted { .. } => Field::LotIdentifier,
            _ => Field::Quantity,
        };
        FieldError::new(field, err)
    })?;

    check_overlap(
        &identifier,
        &submission.product_code,
        lookup,
        &policy.overlap,
    )
    .map_err(|err| FieldError::new(Field::Rule, err))?;

    let apportionment = apportion(&identifier, &claim, metadata, policy)
        .map_err(|err| FieldError::new(Field::Rule, err))?;

    debug!(
        reference = %submission.reference_number,
        %identifier,
        lines = apportionment.lines().len(),
        "endorsement prepared"
    );

    let mut normalized = submission.clone();
    normalized.lot_identifier = identifier.to_string();
    normalized.bag_number = metadata.bag_number.map(i64::from);

    Ok(PreparedEndorsement {
        submission: normalized,
        identifier,
        metadata,
        apportionment,
    })
}

fn check_form(
    submission: &EndorsementSubmission,
) -> Result<(LotIdentifier, SubmissionMetadata), SubmissionRejected> {
    let mut errors = Vec::new();

    let reference = submission.reference_number.as_str();
    if !reference.starts_with(REFERENCE_PREFIX) {
        errors.push(FieldError::invalid(
            Field::ReferenceNumber,
            format!("reference number must start with '{REFERENCE_PREFIX}'"),
        ));
    } else if reference.len() > MAX_TEXT_LEN {
        errors.push(FieldError::invalid(Field::ReferenceNumber, "reference number is too long"));
    }

    let product_len = submission.product_code.chars().count();
    if product_len < MIN_PRODUCT_CODE_LEN {
        errors.push(FieldError::invalid(
            Field::ProductCode,
            format!("product code must be at least {MIN_PRODUCT_CODE_LEN} characters"),
        ));
    } else if product_len > MAX_TEXT_LEN {
        errors.push(FieldError::invalid(Field::ProductCode, "product code is too long"));
    }

    let endorser = submission.endorsed_by.trim();
    if endorser.is_empty() || endorser.len() > MAX_TEXT_LEN {
        errors.push(FieldError::invalid(
            Field::EndorsedBy,
            "endorsed by must be between 1 and 255 characters",
        ));
    }

    let quantity = submission.quantity_kg;
    if !is_positive_finite(quantity) {
        errors.push(FieldError::new(
            Field::Quantity,
            ConsistencyError::NonPositiveQuantity { quantity },
        ));
    }

    let weight = submission.weight_per_lot;
    if !is_positive_finite(weight) {
        errors.push(FieldError::new(
            Field::WeightPerLot,
            ConsistencyError::NonPositiveWeight { weight },
        ));
    }

    let bag_number = match submission.bag_number {
        None | Some(0) => None,
        Some(n) => match u32::try_from(n) {
            Ok(n) => Some(n),
            Err(_) => {
                errors.push(FieldError::invalid(
                    Field::BagNumber,
                    "bag number must be a positive integer",
                ));
                None
            }
        },
    };

    // Fixed-width input masks pad with spaces.
    let identifier = match LotIdentifier::parse(submission.lot_identifier.trim()) {
        Ok(identifier) => Some(identifier),
        Err(err) => {
            errors.push(FieldError::new(Field::LotIdentifier, err));
            None
        }
    };

    match identifier {
        Some(identifier) if errors.is_empty() => {
            Ok((identifier, SubmissionMetadata { bag_number }))
        }
        _ => Err(SubmissionRejected { errors }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlap::ExistingLotRecord;
    use crate::policy::RolloverPolicy;

    fn submission(lots: &str, quantity: f64, weight: f64, has_excess: bool) -> EndorsementSubmission {
        EndorsementSubmission {
            reference_number: "EF-101".to_string(),
            date_endorsed: NaiveDate::from_ymd_opt(2025, 7, 10).unwrap(),
            category: Category::Mb,
            product_code: "PRD-2025-0710-0001".to_string(),
            lot_identifier: lots.to_string(),
            quantity_kg: quantity,
            weight_per_lot: weight,
            status: EndorsementStatus::Passed,
            endorsed_by: "QA Lab".to_string(),
            has_excess,
            bag_number: None,
        }
    }

    fn prepare(sub: &EndorsementSubmission) -> Result<PreparedEndorsement, SubmissionRejected> {
        let none: Vec<ExistingLotRecord> = Vec::new();
        prepare_endorsement(sub, &none, &LotPolicy::default())
    }

    #[test]
    fn valid_range_produces_lines() {
        let prepared = prepare(&submission("0001AA-0003AA", 75.0, 25.0, false)).unwrap();
        assert_eq!(prepared.apportionment.lines().len(), 3);
        assert_eq!(prepared.identifier.to_string(), "0001AA-0003AA");
    }

    #[test]
    fn form_errors_are_collected_per_field() {
        let mut sub = submission("12AB", -1.0, 25.0, false);
        sub.reference_number = "XX-1".to_string();
        sub.product_code = "SHORT".to_string();
        sub.bag_number = Some(-3);

        let rejected = prepare(&sub).unwrap_err();
        let fields: Vec<Field> = rejected.errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                Field::ReferenceNumber,
                Field::ProductCode,
                Field::Quantity,
                Field::BagNumber,
                Field::LotIdentifier,
            ]
        );
        assert!(!rejected.is_fatal());
    }

    #[test]
    fn infinite_quantity_and_weight_are_form_errors() {
        let mut sub = submission("0001AA", f64::INFINITY, 25.0, false);
        sub.weight_per_lot = f64::NEG_INFINITY;

        let rejected = prepare(&sub).unwrap_err();
        assert_eq!(rejected.errors_for(Field::Quantity).count(), 1);
        assert_eq!(rejected.errors_for(Field::WeightPerLot).count(), 1);
        assert!(!rejected.is_fatal());
    }

    #[test]
    fn flat_category_range_keeps_the_submitted_quantity() {
        let mut sub = submission("0001AA-0003AA", 3.0, 25.0, false);
        sub.category = Category::Dc;

        let prepared = prepare(&sub).unwrap();
        assert_eq!(prepared.apportionment.lines().len(), 1);
        assert_eq!(prepared.apportionment.allocated_total(), 3.0);
    }

    #[test]
    fn oversized_single_lot_excess_is_a_rule_error() {
        let sub = submission("0001AA", f64::MAX, 1e-300, true);

        let rejected = prepare(&sub).unwrap_err();
        assert!(matches!(
            rejected.errors[0].error,
            SubmissionError::Apportion(ApportionError::TooManyLines { .. })
        ));
        assert_eq!(rejected.errors[0].field, Field::Rule);
    }

    #[test]
    fn validate_trims_padded_identifier() {
        let (identifier, metadata) = submission("  0007AB  ", 25.0, 25.0, false)
            .validate()
            .unwrap();
        assert_eq!(identifier.to_string(), "0007AB");
        assert_eq!(metadata, SubmissionMetadata::default());
    }

    #[test]
    fn bag_number_zero_means_absent() {
        let mut sub = submission("0001AA", 57.0, 25.0, true);
        sub.bag_number = Some(0);
        let prepared = prepare(&sub).unwrap();
        assert_eq!(prepared.metadata.bag_number, None);

        sub.bag_number = Some(4);
        let prepared = prepare(&sub).unwrap();
        assert!(prepared
            .apportionment
            .lines()
            .iter()
            .all(|l| l.metadata.bag_number == Some(4)));
    }

    #[test]
    fn padded_identifier_is_trimmed() {
        let prepared = prepare(&submission("0001AA ", 25.0, 25.0, false)).unwrap();
        assert_eq!(prepared.submission.lot_identifier, "0001AA");
    }

    #[test]
    fn quantity_mismatch_is_labeled_quantity() {
        let rejected = prepare(&submission("0001AA", 26.0, 25.0, false)).unwrap_err();
        assert_eq!(rejected.errors.len(), 1);
        assert_eq!(rejected.errors[0].field, Field::Quantity);
        assert_eq!(
            rejected.errors[0].error,
            SubmissionError::Consistency(ConsistencyError::QuantityMismatch {
                expected: 25.0,
                actual: 26.0
            })
        );
    }

    #[test]
    fn overlap_is_a_fatal_rule_violation() {
        let existing = vec![ExistingLotRecord {
            identifier_text: "0002AA-0004AA".to_string(),
            product_code: "PRD-2025-0101-0009".to_string(),
        }];
        let rejected = prepare_endorsement(
            &submission("0001AA-0003AA", 75.0, 25.0, false),
            &existing,
            &LotPolicy::default(),
        )
        .unwrap_err();
        assert_eq!(rejected.errors_for(Field::Rule).count(), 1);
        assert!(rejected.is_fatal());
        assert!(rejected.to_string().contains("overlaps with existing lot 0002AA-0004AA"));
    }

    #[test]
    fn rollover_refusal_is_labeled_identifier() {
        let policy = LotPolicy {
            rollover: RolloverPolicy::Reject,
            ..LotPolicy::default()
        };
        let none: Vec<ExistingLotRecord> = Vec::new();
        let rejected =
            prepare_endorsement(&submission("9999AB-0001AC", 50.0, 25.0, false), &none, &policy)
                .unwrap_err();
        assert_eq!(rejected.errors[0].field, Field::LotIdentifier);
    }

    #[test]
    fn mixed_suffix_range_fails_at_apportionment() {
        let rejected = prepare(&submission("0001AA-0003AB", 75.0, 25.0, false)).unwrap_err();
        assert_eq!(rejected.errors[0].field, Field::Rule);
        assert!(matches!(
            rejected.errors[0].error,
            SubmissionError::Apportion(ApportionError::SuffixMismatch { .. })
        ));
    }

    #[test]
    fn deserializes_with_form_defaults() {
        let sub: EndorsementSubmission = serde_json::from_str(
            r#"{
                "reference_number": "EF-7",
                "date_endorsed": "2025-07-10",
                "product_code": "PRD-2025-0710-0001",
                "lot_identifier": "0001AA",
                "quantity_kg": 25.0,
                "weight_per_lot": 25.0,
                "endorsed_by": "QA Lab"
            }"#,
        )
        .unwrap();
        assert_eq!(sub.category, Category::Mb);
        assert_eq!(sub.status, EndorsementStatus::Passed);
        assert!(!sub.has_excess);
        assert!(prepare(&sub).is_ok());
    }
}
