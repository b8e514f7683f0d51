//! Frequency analysis for exponent streams.
//!
//! Counts the occurrence of each exponent byte (0-255) across a tensor
//! and computes Shannon entropy. The skew of this distribution is what
//! makes the exponent field worth entropy-coding at all.

/// A frequency table that tracks exponent occurrence counts.
#[derive(Debug, Clone)]
pub struct FrequencyTable {
    /// Count of each exponent value (index = exponent, value = count).
    pub count: [u64; 256],
    /// Sum of all counts.
    pub total: u64,
    /// Number of distinct exponent values with nonzero count.
    pub used: u32,
}

impl FrequencyTable {
    /// Create a new, zeroed frequency table.
    pub fn new() -> Self {
        Self {
            count: [0u64; 256],
            total: 0,
            used: 0,
        }
    }

    /// Count exponent frequencies across a slice of bfloat16 words.
    pub fn count_exponents(&mut self, values: &[u16]) {
        for &word in values {
            let (exponent, _) = crate::bf16::split(word);
            self.count[exponent as usize] += 1;
        }
        self.finish();
    }

    /// Count frequencies of raw exponent bytes.
    pub fn count_bytes(&mut self, exponents: &[u8]) {
        for &e in exponents {
            self.count[e as usize] += 1;
        }
        self.finish();
    }

    fn finish(&mut self) {
        let mut total = 0u64;
        let mut used = 0u32;
        for &c in &self.count {
            total += c;
            used += (c > 0) as u32;
        }
        self.total = total;
        self.used = used;
    }

    /// Compute the Shannon entropy of the distribution (in bits per symbol).
    ///
    /// Returns 0.0 if the table is empty.
    pub fn entropy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let total = self.total as f64;
        self.count
            .iter()
            .filter(|&&c| c > 0)
            .map(|&c| {
                let prob = c as f64 / total;
                -prob * prob.log2()
            })
            .sum()
    }

    /// Get the count for a specific exponent value.
    pub fn get(&self, exponent: u8) -> u64 {
        self.count[exponent as usize]
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function: exponent frequency table for a tensor.
pub fn exponent_frequencies(values: &[u16]) -> FrequencyTable {
    let mut table = FrequencyTable::new();
    table.count_exponents(values);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bf16;

    #[test]
    fn test_empty_input() {
        let table = exponent_frequencies(&[]);
        assert_eq!(table.total, 0);
        assert_eq!(table.used, 0);
        assert_eq!(table.entropy(), 0.0);
    }

    #[test]
    fn test_single_exponent() {
        // 1.0 and -1.5 share exponent 127; sign/mantissa differ.
        let values = [bf16::from_f32(1.0), bf16::from_f32(-1.5)];
        let table = exponent_frequencies(&values);
        assert_eq!(table.used, 1);
        assert_eq!(table.get(127), 2);
        assert_eq!(table.entropy(), 0.0);
    }

    #[test]
    fn test_known_counts() {
        let values = [
            bf16::assemble(10, 0),
            bf16::assemble(10, 1),
            bf16::assemble(10, 2),
            bf16::assemble(20, 0),
        ];
        let table = exponent_frequencies(&values);
        assert_eq!(table.get(10), 3);
        assert_eq!(table.get(20), 1);
        assert_eq!(table.total, 4);
        assert_eq!(table.used, 2);
    }

    #[test]
    fn test_two_equal_symbols_one_bit() {
        let mut values = vec![bf16::assemble(5, 0); 50];
        values.extend(vec![bf16::assemble(6, 0); 50]);
        let table = exponent_frequencies(&values);
        let entropy = table.entropy();
        assert!((entropy - 1.0).abs() < 0.01, "entropy was {entropy}");
    }

    #[test]
    fn test_uniform_distribution() {
        let exponents: Vec<u8> = (0..=255).collect();
        let mut table = FrequencyTable::new();
        table.count_bytes(&exponents);
        assert_eq!(table.used, 256);
        let entropy = table.entropy();
        assert!((entropy - 8.0).abs() < 0.01, "entropy was {entropy}");
    }
}
