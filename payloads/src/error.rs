use crate::PayloadKind;
use thiserror::Error;

/// Errors that can occur when handling messages and payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("codec error: {0}")]
    Codec(#[from] binlayout_codec::Error),
    #[error("unknown payload")]
    UnknownPayload,
    #[error("payload does not match {0:?}")]
    KindMismatch(PayloadKind),
    #[error("invalid field: {0}")]
    InvalidField(&'static str),
}
