//! Machine words and located storage slots.
//!
//! A [`Word`] is a signed integer of unbounded magnitude with a derived
//! binary projection. The projection is never stored: it is recomputed from
//! the value on every read, so the two views cannot drift apart.

use std::fmt;
use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Minimum number of digits in a binary projection unless a caller asks otherwise.
pub const DEFAULT_WIDTH: usize = 8;

/// An integer machine word.
#[derive(Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Word {
    value: BigInt,
}

impl Word {
    /// Create a word holding `value`.
    pub fn new(value: impl Into<BigInt>) -> Self {
        Self { value: value.into() }
    }

    /// The zero word.
    pub fn zero() -> Self {
        Self::default()
    }

    /// The integer view.
    #[inline]
    pub fn value(&self) -> &BigInt {
        &self.value
    }

    /// Replace the integer view.
    pub fn set_value(&mut self, value: impl Into<BigInt>) {
        self.value = value.into();
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.value.is_positive()
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.value.is_negative()
    }

    /// Natural bit width: the fewest bits that hold the value, minimum 1.
    ///
    /// Negative values report their minimal two's complement width.
    pub fn width(&self) -> usize {
        let bits = if self.value.is_negative() {
            (-&self.value - 1u8).bits() + 1
        } else {
            self.value.bits()
        };
        (bits as usize).max(1)
    }

    /// The low `width` bits of the value in two's complement, as a
    /// non-negative integer. A `width` of 0 selects the natural width.
    pub fn bits(&self, width: usize) -> BigInt {
        let width = if width == 0 { self.width() } else { width };
        &self.value & mask(width)
    }

    /// The low `width` bits (at most 128) as a machine integer.
    pub fn low_bits(&self, width: usize) -> u128 {
        self.bits(width.min(u128::BITS as usize)).to_u128().unwrap_or_default()
    }

    /// Binary projection, left-padded with zeros to at least `width` digits.
    ///
    /// Values wider than `width` keep every significant digit. Negative
    /// values project as two's complement at the wider of `width` and
    /// their natural width.
    pub fn binary(&self, width: usize) -> String {
        let width = width.max(self.width());
        format!("{:0>width$}", self.bits(width).to_str_radix(2), width = width)
    }

    /// Parse a base-2 digit string into a word.
    pub fn from_binary(digits: &str) -> Result<Self, WordError> {
        let digits = digits.trim();
        if digits.is_empty() || !digits.bytes().all(|b| b == b'0' || b == b'1') {
            return Err(WordError::InvalidBinary(digits.to_string()));
        }
        BigInt::parse_bytes(digits.as_bytes(), 2)
            .map(Self::new)
            .ok_or_else(|| WordError::InvalidBinary(digits.to_string()))
    }

    /// Replace the value with the one encoded by a base-2 digit string.
    pub fn set_binary(&mut self, digits: &str) -> Result<(), WordError> {
        *self = Self::from_binary(digits)?;
        Ok(())
    }

    /// Parse digits in `radix`, with an optional leading minus sign.
    pub fn from_str_radix(text: &str, radix: u32) -> Option<Self> {
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        let magnitude = BigInt::parse_bytes(digits.as_bytes(), radix)?;
        Some(Self::new(if negative { -magnitude } else { magnitude }))
    }
}

/// Mask selecting the low `width` bits.
pub(crate) fn mask(width: usize) -> BigInt {
    (BigInt::one() << width) - 1u8
}

impl From<BigInt> for Word {
    fn from(value: BigInt) -> Self {
        Self { value }
    }
}

macro_rules! word_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Word {
                fn from(value: $t) -> Self {
                    Self::new(value)
                }
            }
        )*
    };
}

word_from_int!(i32, i64, i128, u8, u32, u64, u128, usize);

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word({} = 0b{})", self.value, self.binary(0))
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0b{})", self.value, self.binary(DEFAULT_WIDTH))
    }
}

// ============================================================================
// Serde: JSON numbers where they fit, decimal strings beyond that
// ============================================================================

impl Serialize for Word {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.value.to_i64() {
            Some(v) => serializer.serialize_i64(v),
            None => serializer.serialize_str(&self.value.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Word {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(WordVisitor)
    }
}

struct WordVisitor;

impl<'de> Visitor<'de> for WordVisitor {
    type Value = Word;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an integer or a decimal integer string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Word, E> {
        Ok(Word::new(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Word, E> {
        Ok(Word::new(v))
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<Word, E> {
        Ok(Word::new(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Word, E> {
        Ok(Word::new(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Word, E> {
        Word::from_str_radix(v.trim(), 10)
            .ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

/// A word bound to a named storage slot.
///
/// Two located words name the same slot iff their locations are equal.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatedWord {
    /// Register name (`"R1"`) or memory address (`"1204"`).
    pub location: String,
    /// Current contents.
    pub word: Word,
}

impl LocatedWord {
    /// Create a slot at `location` holding `value`.
    pub fn new(location: impl Into<String>, value: impl Into<Word>) -> Self {
        Self {
            location: location.into(),
            word: value.into(),
        }
    }

    /// A zero-valued slot at `location`.
    pub fn zeroed(location: impl Into<String>) -> Self {
        Self::new(location, Word::zero())
    }

    #[inline]
    pub fn value(&self) -> &BigInt {
        self.word.value()
    }

    #[inline]
    pub fn same_slot(&self, other: &LocatedWord) -> bool {
        self.location == other.location
    }
}

impl fmt::Debug for LocatedWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {:?}", self.location, self.word)
    }
}

impl fmt::Display for LocatedWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.location, self.word)
    }
}

/// Errors produced when converting between views of a word.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WordError {
    #[error("invalid binary digits: {0:?}")]
    InvalidBinary(String),
}
