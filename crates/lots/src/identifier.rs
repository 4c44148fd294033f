//! Composite lot identifiers: a single lot (`0001AA`) or a contiguous range
//! (`0001AA-0005AA`), including the `9999` rollover (`9999AB-0001AC`).

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lotledger_core::ValueObject;

use crate::code::{LotCode, LotSuffix, MAX_LOT_NUMBER};

/// Why a lot identifier was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("lot number format must be '1234AB' or '1234AB-1235AB' (got '{input}')")]
    InvalidFormat { input: String },

    #[error("starting lot {start} must be less than or equal to ending lot {end}")]
    StartAfterEnd { start: LotCode, end: LotCode },

    #[error("ending letter code {} comes before starting letter code {}", end.suffix(), start.suffix())]
    LetterRegression { start: LotCode, end: LotCode },

    #[error("after 9999, lot number must reset to 0001 (got {end})")]
    RolloverMustResetToOne { end: LotCode },

    #[error("letter code must increment after the 9999 reset ({start} -> {end})")]
    LetterMustIncrementOnRollover { start: LotCode, end: LotCode },
}

impl ParseError {
    pub(crate) fn invalid_format(input: &str) -> Self {
        Self::InvalidFormat {
            input: input.to_string(),
        }
    }
}

/// Contiguous run of lot numbers sharing one suffix.
///
/// A normal range is one span; a rollover range is two (`9999AB` then `0001AC`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LotSpan {
    pub suffix: LotSuffix,
    pub first: u16,
    pub last: u16,
}

impl LotSpan {
    pub fn single(code: LotCode) -> Self {
        Self {
            suffix: code.suffix(),
            first: code.number(),
            last: code.number(),
        }
    }

    pub fn len(&self) -> u32 {
        if self.last < self.first {
            0
        } else {
            u32::from(self.last - self.first) + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closed-interval intersection; spans with different suffixes never meet.
    pub fn intersects(&self, other: &LotSpan) -> bool {
        self.suffix == other.suffix && self.first <= other.last && self.last >= other.first
    }

    pub fn codes(&self) -> impl Iterator<Item = LotCode> + '_ {
        (self.first..=self.last).filter_map(|number| LotCode::new(number, self.suffix))
    }
}

impl ValueObject for LotSpan {}

/// Ordered pair of lot codes.
///
/// Constructed through [`LotRange::new`] the ordering rules hold; ranges read
/// back from historical records via [`LotIdentifier::parse_shape`] only
/// guarantee the textual shape.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LotRange {
    start: LotCode,
    end: LotCode,
}

impl LotRange {
    pub fn new(start: LotCode, end: LotCode) -> Result<Self, ParseError> {
        let rollover = start.number() == MAX_LOT_NUMBER && end.number() == 1;

        if start.number() > end.number() && !rollover {
            return Err(ParseError::StartAfterEnd { start, end });
        }

        // Letters never move backward, rollover or not.
        if end.suffix().index() < start.suffix().index() {
            return Err(ParseError::LetterRegression { start, end });
        }

        if start.number() == MAX_LOT_NUMBER {
            if end.number() != 1 {
                return Err(ParseError::RolloverMustResetToOne { end });
            }
            if end.suffix().index() <= start.suffix().index() {
                return Err(ParseError::LetterMustIncrementOnRollover { start, end });
            }
        }

        Ok(Self { start, end })
    }

    pub fn start(&self) -> LotCode {
        self.start
    }

    pub fn end(&self) -> LotCode {
        self.end
    }

    /// Wraps past `9999` into the next suffix.
    pub fn is_rollover(&self) -> bool {
        self.start.number() == MAX_LOT_NUMBER && self.end.number() < self.start.number()
    }

    pub fn has_uniform_suffix(&self) -> bool {
        self.start.suffix() == self.end.suffix()
    }

    pub fn spans(&self) -> Vec<LotSpan> {
        if self.is_rollover() {
            vec![
                LotSpan {
                    suffix: self.start.suffix(),
                    first: self.start.number(),
                    last: MAX_LOT_NUMBER,
                },
                LotSpan {
                    suffix: self.end.suffix(),
                    first: 1,
                    last: self.end.number(),
                },
            ]
        } else {
            vec![LotSpan {
                suffix: self.start.suffix(),
                first: self.start.number(),
                last: self.end.number(),
            }]
        }
    }

    /// Number of physical lots covered. A rollover range counts the lots on both
    /// sides of the wrap, so `9999AB-0001AC` is 2.
    pub fn lot_count(&self) -> u32 {
        self.spans().iter().map(LotSpan::len).sum()
    }

    /// Every lot code in the range, in production order.
    pub fn codes(&self) -> Vec<LotCode> {
        self.spans().iter().flat_map(|span| span.codes()).collect()
    }
}

impl ValueObject for LotRange {}

impl fmt::Display for LotRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A single lot or a range of lots, as entered on an endorsement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LotIdentifier {
    Single(LotCode),
    Range(LotRange),
}

impl LotIdentifier {
    /// Parse and enforce the ordering and rollover rules.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        match split_shape(text)? {
            (start, None) => Ok(Self::Single(start)),
            (start, Some(end)) => LotRange::new(start, end).map(Self::Range),
        }
    }

    /// Decode the textual shape only, skipping the ordering rules.
    ///
    /// For identifiers that were accepted under earlier rules and now live in
    /// the record store.
    pub fn parse_shape(text: &str) -> Result<Self, ParseError> {
        match split_shape(text)? {
            (start, None) => Ok(Self::Single(start)),
            (start, Some(end)) => Ok(Self::Range(LotRange { start, end })),
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, Self::Range(_))
    }

    pub fn is_rollover(&self) -> bool {
        match self {
            Self::Single(_) => false,
            Self::Range(range) => range.is_rollover(),
        }
    }

    pub fn first_code(&self) -> LotCode {
        match self {
            Self::Single(code) => *code,
            Self::Range(range) => range.start(),
        }
    }

    pub fn spans(&self) -> Vec<LotSpan> {
        match self {
            Self::Single(code) => vec![LotSpan::single(*code)],
            Self::Range(range) => range.spans(),
        }
    }

    pub fn lot_count(&self) -> u32 {
        match self {
            Self::Single(_) => 1,
            Self::Range(range) => range.lot_count(),
        }
    }
}

fn split_shape(text: &str) -> Result<(LotCode, Option<LotCode>), ParseError> {
    let decode = |part: &str| LotCode::decode(part).ok_or_else(|| ParseError::invalid_format(text));
    match text.split_once('-') {
        None => Ok((decode(text)?, None)),
        Some((start, end)) => Ok((decode(start)?, Some(decode(end)?))),
    }
}

impl fmt::Display for LotIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(code) => fmt::Display::fmt(code, f),
            Self::Range(range) => fmt::Display::fmt(range, f),
        }
    }
}

impl FromStr for LotIdentifier {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LotIdentifier {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LotIdentifier> for String {
    fn from(value: LotIdentifier) -> Self {
        value.to_string()
    }
}

impl ValueObject for LotIdentifier {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn range(text: &str) -> LotRange {
        match LotIdentifier::parse(text).unwrap() {
            LotIdentifier::Range(range) => range,
            other => panic!("Expected range, got {other:?}"),
        }
    }

    #[test]
    fn parses_single_lot() {
        let id = LotIdentifier::parse("1234AB").unwrap();
        assert!(matches!(id, LotIdentifier::Single(_)));
        assert_eq!(id.lot_count(), 1);
        assert_eq!(id.to_string(), "1234AB");
    }

    #[test]
    fn parses_plain_range() {
        let r = range("0001AA-0003AA");
        assert_eq!(r.start().to_string(), "0001AA");
        assert_eq!(r.end().to_string(), "0003AA");
        assert_eq!(r.lot_count(), 3);
        assert!(!r.is_rollover());
        let codes: Vec<String> = r.codes().iter().map(ToString::to_string).collect();
        assert_eq!(codes, vec!["0001AA", "0002AA", "0003AA"]);
    }

    #[test]
    fn accepts_rollover_with_incremented_letters() {
        let r = range("9999AB-0001AC");
        assert!(r.is_rollover());
        assert_eq!(r.lot_count(), 2);
        let codes: Vec<String> = r.codes().iter().map(ToString::to_string).collect();
        assert_eq!(codes, vec!["9999AB", "0001AC"]);
    }

    #[test]
    fn rejects_rollover_without_letter_increment() {
        let err = LotIdentifier::parse("9999AB-0001AB").unwrap_err();
        assert!(matches!(err, ParseError::LetterMustIncrementOnRollover { .. }));
    }

    #[test]
    fn rejects_rollover_not_resetting_to_one() {
        let err = LotIdentifier::parse("9999AB-0002AC").unwrap_err();
        assert!(matches!(err, ParseError::StartAfterEnd { .. }));

        let err = LotIdentifier::parse("9999AB-9999AC").unwrap_err();
        assert!(matches!(err, ParseError::RolloverMustResetToOne { .. }));
    }

    #[test]
    fn rejects_start_after_end() {
        let err = LotIdentifier::parse("1234AB-1200AB").unwrap_err();
        match err {
            ParseError::StartAfterEnd { start, end } => {
                assert_eq!(start.to_string(), "1234AB");
                assert_eq!(end.to_string(), "1200AB");
            }
            other => panic!("Expected StartAfterEnd, got {other:?}"),
        }
    }

    #[test]
    fn rejects_letter_regression() {
        let err = LotIdentifier::parse("0001AC-0005AB").unwrap_err();
        assert!(matches!(err, ParseError::LetterRegression { .. }));

        let err = LotIdentifier::parse("9999AC-0001AB").unwrap_err();
        assert!(matches!(err, ParseError::LetterRegression { .. }));
    }

    #[test]
    fn accepts_forward_letters_without_rollover() {
        let r = range("0001AA-0005AB");
        assert!(!r.has_uniform_suffix());
        assert!(!r.is_rollover());
    }

    #[test]
    fn rejects_other_shapes() {
        for text in [
            "",
            "1234",
            "1234AB-",
            "-1234AB",
            "1234AB - 1235AB",
            "1234AB-1235AB-1236AB",
            "1234ab",
            "12345AB",
            "1234AB1235AB",
        ] {
            let err = LotIdentifier::parse(text).unwrap_err();
            assert_eq!(err, ParseError::invalid_format(text), "{text:?}");
        }
    }

    #[test]
    fn parse_shape_keeps_historical_out_of_order_ranges() {
        let id = LotIdentifier::parse_shape("1234AB-1200AB").unwrap();
        assert!(id.is_range());
        assert_eq!(id.lot_count(), 0);
        assert!(LotIdentifier::parse_shape("garbage").is_err());
    }

    #[test]
    fn span_intersection_is_closed_and_suffix_bound() {
        let a = range("0005AA-0010AA").spans()[0];
        let b = range("0010AA-0012AA").spans()[0];
        let c = range("0011AA-0015AA").spans()[0];
        let d = range("0005AB-0010AB").spans()[0];
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(!a.intersects(&d));
    }

    #[test]
    fn serializes_as_text() {
        let id = LotIdentifier::parse("0001AA-0003AA").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"0001AA-0003AA\"");
        let back: LotIdentifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<LotIdentifier>("\"0003AA-0001AA\"").is_err());
    }

    proptest! {
        #[test]
        fn valid_ranges_round_trip_and_stay_ordered(
            a in 0u16..=9998,
            b in 0u16..=9998,
            suffix in 0u16..676,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let letters = LotSuffix::from_index(suffix).unwrap();
            let text = format!("{lo:04}{letters}-{hi:04}{letters}");
            let id = LotIdentifier::parse(&text).unwrap();
            prop_assert_eq!(id.to_string(), text);
            prop_assert_eq!(id.lot_count(), u32::from(hi - lo) + 1);
        }

        #[test]
        fn descending_ranges_are_rejected(a in 1u16..=9998, gap in 1u16..=100, suffix in 0u16..676) {
            let lo = a.saturating_sub(gap);
            prop_assume!(lo < a);
            let letters = LotSuffix::from_index(suffix).unwrap();
            let text = format!("{a:04}{letters}-{lo:04}{letters}");
            prop_assert!(
                matches!(
                    LotIdentifier::parse(&text),
                    Err(ParseError::StartAfterEnd { .. })
                ),
                "expected StartAfterEnd"
            );
        }
    }
}
