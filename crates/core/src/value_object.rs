//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**; they are defined entirely by their
//! attribute values. `LotCode("0001AA")` parsed twice yields two equal values.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one. Lot codes, lot ranges and allocation lines all follow this
/// shape: once constructed they are known to be well-formed and never change.
///
/// The trait requires:
/// - **Clone**: value objects are cheap to copy
/// - **PartialEq**: compared by their attribute values
/// - **Debug**: printable in logs and test failures
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct LotSuffix([u8; 2]);
///
/// impl ValueObject for LotSuffix {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
