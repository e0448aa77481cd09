//! Errors raised while constructing data structures.
//!
//! Once a data structure exists, none of its operations can fail, so this is the only error type
//! of the crate.
use thiserror::Error;

/// Error type for constructors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The requested parameters do not describe a usable data structure (e.g. zero bits, an
    /// empty list of hash functions or too many registers).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type that defaults to [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Log and return an [`Error::InvalidConfiguration`].
#[cfg_attr(
    not(any(feature = "bytecount", feature = "fixedbitset", feature = "num-traits")),
    allow(dead_code)
)]
pub(crate) fn invalid_configuration<T>(reason: String) -> Result<T> {
    tracing::warn!(%reason, "rejected construction");
    Err(Error::InvalidConfiguration(reason))
}
