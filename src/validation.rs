/// Validation tests for the codec as a whole.
///
/// These tests verify:
/// 1. **Round-trip correctness** across realistic tensor shapes
/// 2. **Cross-path equivalence** - sequential and parallel decode agree
/// 3. **Compression behavior** - skewed exponents actually shrink
/// 4. **Edge cases** - adversarial distributions, boundary conditions
#[cfg(test)]
mod tests {
    use crate::bf16;
    use crate::decode::{decode, decode_into, decode_parallel};
    use crate::encode::{encode, encode_with, EncoderConfig};
    use crate::frequency;

    // ---------------------------------------------------------------
    // Helper: generate diverse tensors
    // ---------------------------------------------------------------

    /// Gaussian-ish weights the way trained models look: exponents
    /// clustered in a narrow band around 2^-3, signs and mantissas
    /// effectively random.
    fn data_model_weights(n: usize) -> Vec<u16> {
        let mut state = 0x2545F4914F6CDD1Du64;
        (0..n)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                // Sum of four uniform nibbles approximates a bell curve.
                let u = (state & 0xF) + ((state >> 4) & 0xF) + ((state >> 8) & 0xF)
                    + ((state >> 12) & 0xF);
                let x = (u as f32 - 30.0) / 30.0;
                bf16::from_f32(x * 0.125)
            })
            .collect()
    }

    /// Constant tensor: single exponent, single sign/mantissa.
    fn data_constant(n: usize) -> Vec<u16> {
        vec![bf16::from_f32(1.0); n]
    }

    /// Adversarial: all 256 exponents equally likely (8 bits entropy,
    /// nothing to gain).
    fn data_uniform_exponents(n: usize) -> Vec<u16> {
        (0..n).map(|i| bf16::assemble((i % 256) as u8, (i / 256) as u8)).collect()
    }

    /// Heavy skew with a long rare tail, forcing codes past 8 bits.
    fn data_long_tail(n: usize) -> Vec<u16> {
        let mut v: Vec<u16> = (0..=255u16).map(|e| bf16::assemble(e as u8, 3)).collect();
        v.extend(std::iter::repeat(bf16::from_f32(0.25)).take(n));
        v
    }

    // ---------------------------------------------------------------
    // Round trips
    // ---------------------------------------------------------------

    #[test]
    fn test_round_trip_model_weights() {
        let values = data_model_weights(100_000);
        let bundle = encode(&values);
        bundle.validate().unwrap();
        assert_eq!(decode(&bundle).unwrap(), values);
    }

    #[test]
    fn test_round_trip_constant() {
        let values = data_constant(10_000);
        let bundle = encode(&values);
        assert_eq!(decode(&bundle).unwrap(), values);
        // One bit per element, plus tables and metadata.
        assert_eq!(bundle.codes.len(), 10_000usize.div_ceil(8));
    }

    #[test]
    fn test_round_trip_uniform_exponents() {
        let values = data_uniform_exponents(65_536);
        let bundle = encode(&values);
        assert_eq!(decode(&bundle).unwrap(), values);
    }

    #[test]
    fn test_round_trip_long_tail() {
        let values = data_long_tail(50_000);
        let bundle = encode(&values);
        assert!(bundle.n_luts >= 2, "expected multi-level code");
        assert_eq!(decode(&bundle).unwrap(), values);
    }

    #[test]
    fn test_round_trip_tiny_inputs() {
        for n in 0..20 {
            let values = data_model_weights(n);
            let bundle = encode(&values);
            assert_eq!(decode(&bundle).unwrap(), values, "n = {n}");
        }
    }

    #[test]
    fn test_round_trip_all_group_sizes() {
        let values = data_model_weights(1000);
        for group_size in [1, 2, 3, 7, 64, 255, 1000, 5000] {
            let cfg = EncoderConfig {
                group_size,
                ..Default::default()
            };
            let bundle = encode_with(&values, &cfg).unwrap();
            assert_eq!(decode(&bundle).unwrap(), values, "group_size = {group_size}");
        }
    }

    #[test]
    fn test_round_trip_every_max_luts() {
        let values = data_long_tail(20_000);
        for max_luts in 1..=4 {
            let cfg = EncoderConfig {
                max_luts,
                ..Default::default()
            };
            let bundle = encode_with(&values, &cfg).unwrap();
            assert!(bundle.n_luts <= max_luts);
            assert_eq!(decode(&bundle).unwrap(), values, "max_luts = {max_luts}");
        }
    }

    // ---------------------------------------------------------------
    // Cross-path equivalence
    // ---------------------------------------------------------------

    #[test]
    fn test_parallel_equals_sequential_on_all_shapes() {
        for values in [
            data_model_weights(33_333),
            data_constant(4096),
            data_uniform_exponents(8192),
            data_long_tail(10_000),
        ] {
            let bundle = encode(&values);
            let mut seq = vec![0u16; values.len()];
            decode_into(&bundle, &mut seq).unwrap();
            let mut par = vec![0u16; values.len()];
            decode_parallel(&bundle, &mut par, 8).unwrap();
            assert_eq!(seq, par);
            assert_eq!(seq, values);
        }
    }

    // ---------------------------------------------------------------
    // Compression behavior
    // ---------------------------------------------------------------

    #[test]
    fn test_skewed_exponents_compress() {
        let values = data_model_weights(100_000);
        let bundle = encode(&values);
        let raw = values.len() * 2;
        assert!(
            bundle.compressed_len() < raw,
            "compressed {} >= raw {}",
            bundle.compressed_len(),
            raw
        );
    }

    #[test]
    fn test_code_stream_tracks_entropy() {
        // The packed exponent stream should track the Shannon bound;
        // Huffman redundancy tops out near p_max + 0.086 bits/symbol,
        // well under one extra bit per element here.
        let values = data_model_weights(200_000);
        let freq = frequency::exponent_frequencies(&values);
        let bound_bits = freq.entropy() * values.len() as f64;
        let actual_bits = (encode(&values).codes.len() * 8) as f64;
        assert!(
            actual_bits <= bound_bits + values.len() as f64 + 64.0,
            "stream {actual_bits} bits vs entropy bound {bound_bits}"
        );
    }

    #[test]
    fn test_uniform_exponents_do_not_explode() {
        // A flat 256-symbol source would fill an 8-bit code space
        // exactly, but one window per non-final table is reserved for
        // the escape, pushing one rare symbol to 16 bits. Overhead
        // stays a small fraction of the raw exponent bytes.
        let values = data_uniform_exponents(65_536);
        let bundle = encode(&values);
        assert!(bundle.codes.len() <= values.len() * 105 / 100);
    }
}
