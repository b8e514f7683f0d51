//! bfloat16 bit layout.
//!
//! A bfloat16 word is `sign(1) | exponent(8) | mantissa(7)`. DFloat11
//! splits it into the entropy-coded exponent byte and a raw
//! sign/mantissa byte (`sign(1) | mantissa(7)`), stored uncompressed
//! one per element.

/// Number of mantissa bits.
pub const MANTISSA_BITS: u32 = 7;

/// Number of exponent bits.
pub const EXPONENT_BITS: u32 = 8;

/// Mask selecting the mantissa field of a bfloat16 word.
pub const MANTISSA_MASK: u16 = (1 << MANTISSA_BITS) - 1;

/// Split a bfloat16 word into its exponent byte and sign/mantissa byte.
#[inline]
pub fn split(word: u16) -> (u8, u8) {
    let exponent = ((word >> MANTISSA_BITS) & 0xFF) as u8;
    let sign_mantissa = (((word >> 8) & 0x80) | (word & MANTISSA_MASK)) as u8;
    (exponent, sign_mantissa)
}

/// Assemble a bfloat16 word from a decoded exponent and the raw
/// sign/mantissa byte. The inverse of [`split`].
#[inline]
pub fn assemble(exponent: u8, sign_mantissa: u8) -> u16 {
    ((sign_mantissa as u16 & 0x80) << 8)
        | ((exponent as u16) << MANTISSA_BITS)
        | (sign_mantissa as u16 & MANTISSA_MASK)
}

/// Truncate an f32 to its bfloat16 bit pattern (round-toward-zero).
/// Test helper for building realistic tensors.
#[inline]
pub fn from_f32(value: f32) -> u16 {
    (value.to_bits() >> 16) as u16
}

/// Widen a bfloat16 bit pattern back to f32.
#[inline]
pub fn to_f32(word: u16) -> f32 {
    f32::from_bits((word as u32) << 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_assemble_round_trip() {
        for word in [0u16, 1, 0x3F80, 0xBF80, 0x7F7F, 0x8000, 0xFFFF, 0x7FC0] {
            let (exp, sm) = split(word);
            assert_eq!(assemble(exp, sm), word, "word {word:#06x}");
        }
    }

    #[test]
    fn test_split_fields() {
        // 1.0f32 as bfloat16: sign 0, exponent 127, mantissa 0.
        let (exp, sm) = split(from_f32(1.0));
        assert_eq!(exp, 127);
        assert_eq!(sm, 0);

        // -2.5: sign 1, exponent 128, mantissa 0b0100000.
        let (exp, sm) = split(from_f32(-2.5));
        assert_eq!(exp, 128);
        assert_eq!(sm, 0x80 | 0b0100000);
    }

    #[test]
    fn test_assemble_places_exponent_at_bit_7() {
        assert_eq!(assemble(3, 0), 3u16 << 7);
        assert_eq!(assemble(0xFF, 0), 0xFFu16 << 7);
        assert_eq!(assemble(0, 0x80), 1u16 << 15);
        assert_eq!(assemble(0, 0x7F), 0x7F);
    }

    #[test]
    fn test_f32_round_trip_exact_values() {
        // Values exactly representable in bfloat16 survive the trip.
        for v in [0.0f32, 1.0, -1.0, 0.5, -2.5, 256.0] {
            assert_eq!(to_f32(from_f32(v)), v);
        }
    }
}
