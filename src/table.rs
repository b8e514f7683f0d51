//! Code Table Set: flat lookup tables for prefix decoding.
//!
//! The variable-length exponent code is resolved by indexing a 256-entry
//! table with the next 8 stream bits (the "peek window"). Every window
//! value maps to exactly one `(symbol, consumed_bits)` pair, so the hot
//! path is a single table lookup and a cursor advance — no bit-by-bit
//! tree walking.
//!
//! Codes longer than 8 bits escape: all of them share a full-window
//! all-ones prefix per extra level, and the escape entry (`bits == 0`)
//! directs the lookup to the next table, indexed by the following 8
//! bits. A symbol resolved in table `k` consumed `8k + entry.bits` bits
//! in total. This mirrors the subtable design of table-driven DEFLATE
//! decoders, restricted to a fixed chain of at most [`MAX_LUTS`] levels.

use crate::{Df11Error, Df11Result};

/// Width of the peek window in bits.
pub const WINDOW_BITS: u32 = 8;

/// Number of entries per table (one per window value).
pub const WINDOW_SIZE: usize = 1 << WINDOW_BITS;

/// Maximum number of chained tables (longest code = 32 bits).
pub const MAX_LUTS: usize = 4;

/// Serialized size of one table in bytes (2 bytes per entry).
pub const TABLE_BYTES: usize = WINDOW_SIZE * 2;

/// One lookup table entry.
///
/// `bits == 0` marks an escape to the next table; resolving entries have
/// `bits` in `[1, 8]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LutEntry {
    /// Decoded exponent symbol (or next-level marker for escapes).
    pub symbol: u8,
    /// Bits consumed within this table's window; 0 = escape.
    pub bits: u8,
}

/// The full code table set: `n_luts` chained 256-entry tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeTables {
    tables: Vec<[LutEntry; WINDOW_SIZE]>,
}

/// Assemble the 8-bit peek window starting at `(byte, bit)`.
///
/// When `bit` is nonzero the window spans a byte boundary: the tail of
/// the current byte supplies the high bits and the head of the next byte
/// the low bits. Reads past the end of the stream return zero — trailing
/// padding bits are never interpreted as a symbol by a well-formed
/// bundle, so their value is immaterial.
#[inline]
pub(crate) fn peek_window(stream: &[u8], byte: usize, bit: u8) -> u8 {
    let hi = stream.get(byte).copied().unwrap_or(0);
    if bit == 0 {
        return hi;
    }
    let lo = stream.get(byte + 1).copied().unwrap_or(0);
    (hi << bit) | (lo >> (8 - bit))
}

impl DecodeTables {
    /// Wrap pre-built tables. The encoder constructs these directly.
    pub(crate) fn new(tables: Vec<[LutEntry; WINDOW_SIZE]>) -> Self {
        debug_assert!(!tables.is_empty() && tables.len() <= MAX_LUTS);
        Self { tables }
    }

    /// Number of chained tables.
    pub fn n_luts(&self) -> usize {
        self.tables.len()
    }

    /// Parse tables from their serialized byte form: `n_luts` tables of
    /// 256 `[symbol, bits]` pairs each.
    ///
    /// Validates layout only: buffer length, `n_luts` range, `bits <= 8`
    /// per entry, and no escape entries in the final table (an escape
    /// there could never resolve). Whether the tables describe a code
    /// that agrees with any particular stream is the encoder's problem.
    pub fn from_bytes(luts: &[u8], n_luts: usize) -> Df11Result<Self> {
        if n_luts == 0 || n_luts > MAX_LUTS || luts.len() != n_luts * TABLE_BYTES {
            return Err(Df11Error::InvalidBundle);
        }

        let mut tables = Vec::with_capacity(n_luts);
        for level in 0..n_luts {
            let mut table = [LutEntry::default(); WINDOW_SIZE];
            for (window, entry) in table.iter_mut().enumerate() {
                let offset = level * TABLE_BYTES + window * 2;
                let symbol = luts[offset];
                let bits = luts[offset + 1];
                if bits > WINDOW_BITS as u8 {
                    return Err(Df11Error::InvalidBundle);
                }
                if bits == 0 && level == n_luts - 1 {
                    return Err(Df11Error::InvalidBundle);
                }
                *entry = LutEntry { symbol, bits };
            }
            tables.push(table);
        }

        Ok(Self { tables })
    }

    /// Serialize to the flat byte layout consumed by [`from_bytes`].
    pub fn as_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.tables.len() * TABLE_BYTES);
        for table in &self.tables {
            for entry in table {
                out.push(entry.symbol);
                out.push(entry.bits);
            }
        }
        out
    }

    /// Pack each entry as `symbol | bits << 8` for GPU upload.
    #[cfg(feature = "webgpu")]
    pub(crate) fn packed_u32(&self) -> Vec<u32> {
        self.tables
            .iter()
            .flat_map(|table| table.iter())
            .map(|e| (e.symbol as u32) | ((e.bits as u32) << 8))
            .collect()
    }

    /// Resolve one symbol starting at `(byte, bit)`.
    ///
    /// Returns `(symbol, consumed_bits_total)`. Each escape walks one
    /// table deeper and shifts the window a full byte ahead; the walk is
    /// bounded by `n_luts`. A corrupt table set (escape in every level's
    /// window) yields symbol 0 and a full-chain advance — wrong output,
    /// but the cursor always makes progress.
    #[inline]
    pub fn lookup(&self, stream: &[u8], byte: usize, bit: u8) -> (u8, u32) {
        for (level, table) in self.tables.iter().enumerate() {
            let window = peek_window(stream, byte + level, bit);
            let entry = table[window as usize];
            if entry.bits != 0 {
                return (entry.symbol, WINDOW_BITS * level as u32 + entry.bits as u32);
            }
        }
        (0, WINDOW_BITS * self.tables.len() as u32)
    }
}
