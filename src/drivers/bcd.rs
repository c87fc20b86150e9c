// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Packed binary-coded decimal helpers.
//!
//! One decimal digit per nibble, so `0x59` is 59. Only values 0..=99 are representable.

/// Decode a packed BCD byte into binary.
#[inline]
pub fn to_binary(value: u8) -> u8 {
    value - 6 * (value >> 4)
}

/// Encode a binary value (0..=99) as packed BCD.
#[inline]
pub fn to_bcd(value: u8) -> u8 {
    debug_assert!(value <= 99, "BCD value out of range: {}", value);
    value + 6 * (value / 10)
}
