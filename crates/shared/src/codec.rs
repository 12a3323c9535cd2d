//! Canonical binary encoding (BCS) used by the chain for transactions and authenticators.
//!
//! Wire types derive serde traits and go through `bcs`; enum variant order is the chain's tag
//! order. Decoding is strict: trailing input, non-canonical ULEB128 prefixes and container
//! nesting deeper than [`MAX_CONTAINER_DEPTH`] are all errors.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Decoder nesting cap, counted in structs and enums.
pub const MAX_CONTAINER_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("trailing bytes after value")]
    TrailingBytes,
    #[error("container nesting too deep at {0}")]
    DepthExceeded(&'static str),
    #[error("invalid uleb128 length prefix")]
    InvalidUleb128,
    #[error("invalid bool byte")]
    InvalidBool,
    #[error("invalid utf-8 string")]
    InvalidUtf8,
    #[error("{0}")]
    Invalid(String),
}

impl From<bcs::Error> for CodecError {
    fn from(err: bcs::Error) -> Self {
        match err {
            bcs::Error::Eof => CodecError::UnexpectedEnd,
            bcs::Error::RemainingInput => CodecError::TrailingBytes,
            bcs::Error::ExceededContainerDepthLimit(name) => CodecError::DepthExceeded(name),
            bcs::Error::NonCanonicalUleb128Encoding
            | bcs::Error::IntegerOverflowDuringUleb128Decoding => CodecError::InvalidUleb128,
            bcs::Error::ExpectedBoolean => CodecError::InvalidBool,
            bcs::Error::Utf8 => CodecError::InvalidUtf8,
            other => CodecError::Invalid(other.to_string()),
        }
    }
}

pub fn to_bytes<T>(value: &T) -> Result<Vec<u8>, CodecError>
where
    T: Serialize + ?Sized,
{
    Ok(bcs::to_bytes(value)?)
}

/// Decodes a complete value; any bytes left over are an error.
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    Ok(bcs::from_bytes_with_limit(bytes, MAX_CONTAINER_DEPTH)?)
}
