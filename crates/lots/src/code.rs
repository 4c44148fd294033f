//! Single lot codes: a 4-digit number plus a 2-letter suffix (`0042AB`).

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use lotledger_core::ValueObject;

use crate::identifier::ParseError;

/// Highest lot number; the next lot after `9999` restarts at `0001` with the
/// suffix moved forward.
pub const MAX_LOT_NUMBER: u16 = 9999;

const SUFFIX_LETTERS: u16 = 26;

/// Two uppercase ASCII letters.
///
/// Ordered by their base-26 pair index (`AA` = 0, `AB` = 1, ..., `ZZ` = 675).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LotSuffix([u8; 2]);

impl LotSuffix {
    /// Accepts exactly two uppercase ASCII letters.
    pub fn new(letters: &str) -> Option<Self> {
        match letters.as_bytes() {
            &[a, b] if a.is_ascii_uppercase() && b.is_ascii_uppercase() => Some(Self([a, b])),
            _ => None,
        }
    }

    pub fn from_index(index: u16) -> Option<Self> {
        if index >= SUFFIX_LETTERS * SUFFIX_LETTERS {
            return None;
        }
        let first = b'A' + (index / SUFFIX_LETTERS) as u8;
        let second = b'A' + (index % SUFFIX_LETTERS) as u8;
        Some(Self([first, second]))
    }

    /// Base-26 pair index in `0..=675`.
    pub fn index(&self) -> u16 {
        let [a, b] = self.0;
        u16::from(a - b'A') * SUFFIX_LETTERS + u16::from(b - b'A')
    }
}

impl ValueObject for LotSuffix {}

impl fmt::Display for LotSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b] = self.0;
        write!(f, "{}{}", a as char, b as char)
    }
}

/// One physical inventory lot.
///
/// Ordering follows production order: suffix first, then number, so `9999AA`
/// sorts before `0001AB`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LotCode {
    number: u16,
    suffix: LotSuffix,
}

impl LotCode {
    pub fn new(number: u16, suffix: LotSuffix) -> Option<Self> {
        (number <= MAX_LOT_NUMBER).then_some(Self { number, suffix })
    }

    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn suffix(&self) -> LotSuffix {
        self.suffix
    }

    /// Parse a fixed-width `NNNNLL` fragment. `None` when the shape is wrong.
    pub(crate) fn decode(text: &str) -> Option<Self> {
        if text.len() != 6 || !text.is_ascii() {
            return None;
        }
        let (digits, letters) = text.split_at(4);
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let number = digits.parse::<u16>().ok()?;
        let suffix = LotSuffix::new(letters)?;
        Self::new(number, suffix)
    }
}

impl ValueObject for LotCode {}

impl PartialOrd for LotCode {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LotCode {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.suffix
            .cmp(&other.suffix)
            .then(self.number.cmp(&other.number))
    }
}

impl fmt::Display for LotCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{}", self.number, self.suffix)
    }
}

impl FromStr for LotCode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s).ok_or_else(|| ParseError::invalid_format(s))
    }
}

impl TryFrom<String> for LotCode {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LotCode> for String {
    fn from(value: LotCode) -> Self {
        value.to_string()
    }
}
