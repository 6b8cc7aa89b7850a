//! Difficulty decoding for BEAM shares
//!
//! Two packed encodings show up in share logs:
//!
//! - `block_bits`: BEAM's own packing of the network difficulty, an 8-bit
//!   order and a 24-bit mantissa with an implicit leading one.
//! - `bits_reached`: a compact encoding of the 256-bit target the share met.
//!   Older logs stored the bit length of the target (values up to `0xff`),
//!   newer ones store the Bitcoin-style compact form for better precision.

use primitive_types::U256;

/// Implicit leading bit of a BEAM mantissa
const BEAM_LEADING_BIT: u32 = 1 << 24;

/// Exponent bias of a BEAM order byte
const BEAM_ORDER_BIAS: i32 = 24;

/// Largest value stored as a plain bit length by older share logs
const LEGACY_BITS_MAX: u32 = 0xff;

/// Decode BEAM packed bits into a difficulty.
///
/// `mantissa * 2^(order - 24)`, where the mantissa carries an implicit 25th
/// bit. Zero means "not recorded" and decodes to `0.0`.
pub fn packed_to_beam_difficulty(packed: u32) -> f64 {
    if packed == 0 {
        return 0.0;
    }

    let order = (packed >> 24) as i32;
    let mantissa = BEAM_LEADING_BIT | (packed & (BEAM_LEADING_BIT - 1));

    f64::from(mantissa) * 2f64.powi(order - BEAM_ORDER_BIAS)
}

/// Decode the reached target of a share into a difficulty.
///
/// The difficulty is `(2^256 - 1) / target`, divided exactly in 256 bits
/// before converting to `f64`. Values up to `0xff` are legacy bit lengths
/// (`target = 2^bits - 1`), anything larger is a compact target.
pub fn compact_target_to_difficulty(bits: u32) -> f64 {
    if bits == 0 {
        return 0.0;
    }

    let target = if bits <= LEGACY_BITS_MAX {
        (U256::one() << bits) - U256::one()
    } else {
        expand_compact(bits)
    };

    match U256::MAX.checked_div(target) {
        Some(difficulty) => u256_to_f64(difficulty),
        // Zero target: nothing meaningful to report
        None => 0.0,
    }
}

/// Expand a compact target into its full 256-bit value.
///
/// Byte 3 is the size in bytes, the low 23 bits the mantissa. The sign bit
/// (`0x00800000`) is ignored; targets are never negative. Bits shifted past
/// the top of the 256-bit range are dropped.
pub fn expand_compact(bits: u32) -> U256 {
    let size = bits >> 24;
    let word = bits & 0x007f_ffff;

    if size <= 3 {
        return U256::from(word >> (8 * (3 - size)));
    }

    let shift = 8 * (size - 3);
    if shift >= 256 {
        return U256::zero();
    }
    U256::from(word) << shift
}

/// Convert a 256-bit integer to the nearest `f64`, summing 32-bit words from
/// the least significant end.
pub fn u256_to_f64(value: U256) -> f64 {
    let mut result = 0.0;
    let mut factor = 1.0;
    for limb in value.0 {
        for word in [limb as u32, (limb >> 32) as u32] {
            result += factor * f64::from(word);
            factor *= 4_294_967_296.0;
        }
    }
    result
}
