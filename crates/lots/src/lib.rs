//! Lot identifier and quantity apportionment engine.
//!
//! This crate contains the business rules for endorsements, implemented purely
//! as deterministic domain logic (no IO, no storage). The one external read it
//! needs, the lookup of already recorded lots, is injected as an
//! [`ExistingLotLookup`].
//!
//! ```text
//! text ─ LotIdentifier::parse ─ validate ─ check_overlap ─ apportion ─ [AllocationLine]
//! ```

pub mod apportion;
pub mod category;
pub mod code;
pub mod consistency;
pub mod identifier;
pub mod overlap;
pub mod policy;
pub mod quantity;
pub mod submission;

pub use apportion::{AllocationLine, ApportionError, Apportionment, SubmissionMetadata, apportion};
pub use category::{Category, CategoryBehavior, UnknownCategory};
pub use code::{LotCode, LotSuffix, MAX_LOT_NUMBER};
pub use consistency::{ConsistencyError, validate};
pub use identifier::{LotIdentifier, LotRange, LotSpan, ParseError};
pub use overlap::{
    ExistingLotLookup, ExistingLotRecord, LookupError, LotQuery, OverlapError, check_overlap,
    check_range_overlap,
};
pub use policy::{
    DEFAULT_MAX_ALLOCATION_LINES, LotPolicy, OverlapPolicy, OverlapScope, RolloverPolicy,
};
pub use quantity::QuantityClaim;
pub use submission::{
    EndorsementStatus, EndorsementSubmission, Field, FieldError, MIN_PRODUCT_CODE_LEN,
    PreparedEndorsement, REFERENCE_PREFIX, SubmissionError, SubmissionRejected,
    prepare_endorsement,
};
