pub mod bf16;
pub mod bundle;
pub mod decode;
pub mod encode;
pub mod frequency;
pub mod table;

#[cfg(feature = "webgpu")]
pub mod webgpu;

#[cfg(test)]
mod validation;

pub use bundle::Bundle;
pub use decode::{decode, decode_into, decode_parallel};
pub use encode::{encode, encode_with, EncoderConfig};
pub use table::DecodeTables;

/// Error types for df11 operations.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Df11Error {
    /// Output buffer does not match the bundle's element count.
    BufferTooSmall,
    /// Bundle buffer layout is inconsistent (lengths, offsets, gap range).
    InvalidBundle,
    /// The requested operation or device is not available.
    Unsupported,
}

impl std::fmt::Display for Df11Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BufferTooSmall => write!(f, "output buffer too small"),
            Self::InvalidBundle => write!(f, "invalid bundle layout"),
            Self::Unsupported => write!(f, "unsupported operation"),
        }
    }
}

impl std::error::Error for Df11Error {}

pub type Df11Result<T> = Result<T, Df11Error>;
