//! Compressed tensor bundle.
//!
//! A [`Bundle`] carries everything a decoder lane needs to reconstruct a
//! bfloat16 tensor: the serialized code tables, the packed exponent
//! bitstream, the raw sign/mantissa bytes, and the per-group resume
//! points that let lanes enter the bitstream mid-way without touching
//! any earlier byte.

use crate::table::{DecodeTables, MAX_LUTS, TABLE_BYTES};
use crate::{Df11Error, Df11Result};

/// A self-contained compressed representation of one bfloat16 tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// Serialized code tables (`n_luts` × 256 × `[symbol, bits]`).
    pub luts: Vec<u8>,
    /// Number of chained tables in `luts`.
    pub n_luts: usize,
    /// Packed exponent bitstream, MSB-first within each byte.
    pub codes: Vec<u8>,
    /// One raw `sign | mantissa` byte per element.
    pub sign_mantissa: Vec<u8>,
    /// Per-group byte offset into `codes` where the group's first code
    /// begins (possibly mid-byte, see `gaps`).
    pub position_offsets: Vec<u32>,
    /// Per-group bit gap in `[0, 7]`: bits of the offset byte already
    /// consumed by the previous group.
    pub gaps: Vec<u8>,
    /// Per-group index of the group's first output element.
    pub output_positions: Vec<u32>,
    /// Total number of bfloat16 elements.
    pub n_elements: usize,
}

impl Bundle {
    /// Number of decode groups.
    pub fn n_groups(&self) -> usize {
        self.position_offsets.len()
    }

    /// Length of the packed exponent bitstream in bytes.
    pub fn n_bytes(&self) -> usize {
        self.codes.len()
    }

    /// Compressed size in bytes (tables + bitstream + raw bytes + resume
    /// metadata). Useful for reporting compression ratios.
    pub fn compressed_len(&self) -> usize {
        self.luts.len()
            + self.codes.len()
            + self.sign_mantissa.len()
            + self.position_offsets.len() * 4
            + self.gaps.len()
            + self.output_positions.len() * 4
    }

    /// Element range of group `g` as `(first_element, count)`.
    ///
    /// The count is the distance to the next group's first element, or
    /// to `n_elements` for the last group.
    pub fn group_range(&self, g: usize) -> (usize, usize) {
        let first = self.output_positions[g] as usize;
        let end = self
            .output_positions
            .get(g + 1)
            .map(|&p| p as usize)
            .unwrap_or(self.n_elements);
        (first, end - first)
    }

    /// Parse and validate the bundle's code tables.
    pub fn tables(&self) -> Df11Result<DecodeTables> {
        DecodeTables::from_bytes(&self.luts, self.n_luts)
    }

    /// Check structural consistency of the bundle's buffers.
    ///
    /// This is a layout check, not a decode: it catches mismatched
    /// lengths, out-of-range resume points, and non-monotone group
    /// starts before any lane dereferences them.
    pub fn validate(&self) -> Df11Result<()> {
        if self.n_luts == 0
            || self.n_luts > MAX_LUTS
            || self.luts.len() != self.n_luts * TABLE_BYTES
        {
            return Err(Df11Error::InvalidBundle);
        }
        if self.sign_mantissa.len() != self.n_elements {
            return Err(Df11Error::InvalidBundle);
        }
        let n_groups = self.position_offsets.len();
        if self.gaps.len() != n_groups || self.output_positions.len() != n_groups {
            return Err(Df11Error::InvalidBundle);
        }
        if self.n_elements > 0 && n_groups == 0 {
            return Err(Df11Error::InvalidBundle);
        }

        let mut prev_element = 0u32;
        for g in 0..n_groups {
            if self.gaps[g] > 7 {
                return Err(Df11Error::InvalidBundle);
            }
            // A group may start at n_bytes only if it is empty and its
            // gap is zero; any real code needs at least one byte.
            if self.position_offsets[g] as usize > self.codes.len() {
                return Err(Df11Error::InvalidBundle);
            }
            let first = self.output_positions[g];
            if g == 0 {
                if first != 0 {
                    return Err(Df11Error::InvalidBundle);
                }
            } else if first < prev_element {
                return Err(Df11Error::InvalidBundle);
            }
            if first as usize > self.n_elements {
                return Err(Df11Error::InvalidBundle);
            }
            prev_element = first;
        }

        Ok(())
    }
}
