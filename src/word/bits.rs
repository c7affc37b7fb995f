//! Bit-level kernels for the logic, shift and rotate instructions.
//!
//! Each kernel takes words and returns the unsigned result of
//! working on a binary projection. Width policy differs per
//! operation:
//! - [`not`] works on the default 8-bit projection
//! - [`and`] works on the wider of the two operands' natural widths
//! - shifts and rotates always work on an 8-bit projection
//!
//! Step counts below 1 leave the projection unchanged.

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use tracing::trace;
use crate::word::value::{mask, Word, DEFAULT_WIDTH};

/// Width of the shift/rotate register image.
pub const SHIFT_WIDTH: usize = DEFAULT_WIDTH;

const TOP_BIT: u128 = 1 << (SHIFT_WIDTH - 1);
const SHIFT_MASK: u128 = (1 << SHIFT_WIDTH) - 1;

/// Number of single-bit steps worth performing.
///
/// Shifts saturate after `SHIFT_WIDTH` steps; rotates repeat with period
/// `period`.
fn steps(count: &Word, period: Option<usize>) -> usize {
    if !count.is_positive() {
        return 0;
    }
    match period {
        Some(p) => {
            let rem = count.value() % BigInt::from(p);
            rem.to_usize().unwrap_or_default()
        }
        None => count.value().to_usize().map_or(SHIFT_WIDTH, |n| n.min(SHIFT_WIDTH)),
    }
}

/// Bitwise complement of the `width`-bit projection (0 = natural width).
pub fn not(value: &Word, width: usize) -> Word {
    let width = if width == 0 { value.width() } else { width };
    Word::new(mask(width) - value.bits(width))
}

/// Bitwise AND over `max(width(a), width(b))` bits.
pub fn and(a: &Word, b: &Word) -> Word {
    let width = a.width().max(b.width());
    Word::new(a.bits(width) & b.bits(width))
}

/// Logical left shift, zero-filling on the right.
pub fn shift_left(value: &Word, count: &Word) -> Word {
    let mut image = value.low_bits(SHIFT_WIDTH);
    for _ in 0..steps(count, None) {
        image = (image << 1) & SHIFT_MASK;
    }
    Word::new(image)
}

/// Logical right shift, zero-filling on the left.
pub fn shift_right(value: &Word, count: &Word) -> Word {
    let mut image = value.low_bits(SHIFT_WIDTH);
    for _ in 0..steps(count, None) {
        image >>= 1;
    }
    Word::new(image)
}

/// Arithmetic right shift: each step re-samples the leftmost bit and
/// copies it into the vacated position.
pub fn arithmetic_shift_right(value: &Word, count: &Word) -> Word {
    let mut image = value.low_bits(SHIFT_WIDTH);
    for _ in 0..steps(count, None) {
        let lead = image & TOP_BIT;
        image = (image >> 1) | lead;
    }
    Word::new(image)
}

/// Circular left rotation.
pub fn rotate_left(value: &Word, count: &Word) -> Word {
    let mut image = value.low_bits(SHIFT_WIDTH);
    for _ in 0..steps(count, Some(SHIFT_WIDTH)) {
        let out = (image & TOP_BIT) >> (SHIFT_WIDTH - 1);
        image = ((image << 1) | out) & SHIFT_MASK;
    }
    Word::new(image)
}

/// Circular right rotation.
pub fn rotate_right(value: &Word, count: &Word) -> Word {
    let mut image = value.low_bits(SHIFT_WIDTH);
    for _ in 0..steps(count, Some(SHIFT_WIDTH)) {
        let out = image & 1;
        image = (image >> 1) | (out << (SHIFT_WIDTH - 1));
    }
    Word::new(image)
}

/// Left rotation through the carry bit.
///
/// Every single-bit step pushes the old carry in on the right and latches
/// the bit falling off the left into the carry. Returns `(result, carry)`.
pub fn rotate_left_carry(value: &Word, count: &Word, carry: bool) -> (Word, bool) {
    let mut image = value.low_bits(SHIFT_WIDTH);
    let mut carry = carry;
    for _ in 0..steps(count, Some(SHIFT_WIDTH + 1)) {
        let out = image & TOP_BIT != 0;
        image = ((image << 1) | carry as u128) & SHIFT_MASK;
        carry = out;
        trace!("rotate left through carry: {:08b} c={}", image, carry as u8);
    }
    (Word::new(image), carry)
}

/// Right rotation through the carry bit.
///
/// Mirror image of [`rotate_left_carry`]: the old carry enters on the
/// left, the bit falling off the right becomes the new carry.
pub fn rotate_right_carry(value: &Word, count: &Word, carry: bool) -> (Word, bool) {
    let mut image = value.low_bits(SHIFT_WIDTH);
    let mut carry = carry;
    for _ in 0..steps(count, Some(SHIFT_WIDTH + 1)) {
        let out = image & 1 != 0;
        image = (image >> 1) | ((carry as u128) << (SHIFT_WIDTH - 1));
        carry = out;
        trace!("rotate right through carry: {:08b} c={}", image, carry as u8);
    }
    (Word::new(image), carry)
}
