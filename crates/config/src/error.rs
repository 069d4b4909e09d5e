//! Configuration Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction, matching the other crates in this workspace.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A provider failed to read or the merged values did not deserialize.
    #[display("unable to load configuration")]
    Load,
    /// An explicitly requested file does not exist.
    #[display("configuration file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// An explicitly requested file has an extension we can't parse.
    #[display("unsupported configuration format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// Values parsed fine but make no sense (e.g. a page size of zero).
    #[display("invalid configuration value: {_0}")]
    Invalid(#[error(not(source))] &'static str),
}
