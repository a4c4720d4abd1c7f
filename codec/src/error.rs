//! Error types for layout operations

use thiserror::Error;

/// Error type for layout operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid layout: {0}")]
    Schema(String),
    #[error("size of {0} depends on data")]
    SizeIndeterminate(String),
    #[error("value mismatch: {0}")]
    ValueMismatch(String),
    #[error("buffer too small: needed {needed} bytes, {remaining} remaining")]
    BufferBounds { needed: usize, remaining: usize },
    #[error("extra data found: {0} bytes")]
    ExtraData(usize),
    #[error("length out of range: {0}")]
    LengthExceeded(usize),
    #[error("unknown discriminant: {0}")]
    UnknownDiscriminant(String),
    #[error("layouts cannot be uniquely distinguished")]
    AmbiguousLayoutSet,
    #[error("value out of range: {0}")]
    EncodingRange(String),
    #[error("{path}: {source}")]
    Field { path: String, source: Box<Error> },
}

impl Error {
    /// Prefixes the error's field path with `name`.
    pub fn in_field(self, name: &str) -> Self {
        match self {
            Error::Field { path, source } => Error::Field {
                path: format!("{name}.{path}"),
                source,
            },
            err => Error::Field {
                path: name.to_string(),
                source: Box::new(err),
            },
        }
    }

    /// Returns the error without any field annotation.
    pub fn root(&self) -> &Error {
        match self {
            Error::Field { source, .. } => source.root(),
            err => err,
        }
    }

    /// Returns the dotted path of the field that caused the error, if known.
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::Field { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Annotates errors with the field they originated from.
pub trait ResultExt<T> {
    /// Prefixes the error's field path with `name`.
    fn field(self, name: &str) -> Result<T, Error>;
}

impl<T> ResultExt<T> for Result<T, Error> {
    #[inline]
    fn field(self, name: &str) -> Result<T, Error> {
        self.map_err(|err| err.in_field(name))
    }
}
