//! # AMT22 Check Bits
//!
//! The top two bits of every AMT22 response are odd/even parity check bits
//! over the 14 position bits:
//!
//! ```text
//! K1 = !(H5^H3^H1^L7^L5^L3^L1)   (bit 15, odd positions)
//! K0 = !(H4^H2^H0^L6^L4^L2^L0)   (bit 14, even positions)
//! ```
//!
//! In other words K1 is set iff the number of ones at odd indices is even,
//! and K0 is set iff the number of ones at even indices is even.

/// Mask selecting the 14 position bits of a response
pub const POSITION_MASK: u16 = 0x3FFF;

/// Position bits at odd indices {1, 3, 5, 7, 9, 11, 13}
const ODD_BITS: u16 = 0x2AAA;

/// Position bits at even indices {0, 2, 4, 6, 8, 10, 12}
const EVEN_BITS: u16 = 0x1555;

/// Odd check bit K1
const K1: u16 = 1 << 15;

/// Even check bit K0
const K0: u16 = 1 << 14;

/// Compute the two check bits (already shifted into bits 15 and 14) for a
/// 14-bit position.
#[inline]
const fn check_bits(position: u16) -> u16 {
    let position = position & POSITION_MASK;
    let mut bits = 0;

    if (position & ODD_BITS).count_ones() % 2 == 0 {
        bits |= K1;
    }
    if (position & EVEN_BITS).count_ones() % 2 == 0 {
        bits |= K0;
    }

    bits
}

/// Verify the check bits of a raw 16-bit encoder response
///
/// # Examples
///
/// ```
/// use eqmount::encoder::parity::parity_ok;
///
/// // Worked example from the AMT22 datasheet
/// assert!(parity_ok(0x61AB));
/// assert!(!parity_ok(0x61AA));
/// ```
pub fn parity_ok(response: u16) -> bool {
    check_bits(response) == response & (K1 | K0)
}

/// Build a valid response for a 14-bit position by prefixing its check bits
///
/// Used by the simulated encoder; the inverse of masking with
/// [`POSITION_MASK`].
pub fn with_parity(position: u16) -> u16 {
    let position = position & POSITION_MASK;
    check_bits(position) | position
}
