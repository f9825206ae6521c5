use thiserror::Error;

use crate::key::{TypeTag, UnknownTypeName};

/// Errors surfaced across the client-facing engine API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("unknown type-tag: {0}")]
    UnknownType(UnknownTypeName),

    #[error("invalid operation {op:?} for type {type_tag:?}")]
    InvalidOp { type_tag: TypeTag, op: String },

    #[error("downstream rejected operation: {0}")]
    DownstreamFailed(String),

    #[error("I/O failure: {0}")]
    Io(String),

    #[error("request timed out waiting for causal dependencies")]
    CausalTimeout,
}
