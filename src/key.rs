//! Object identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Names one of the registered CRDT types. The engine dispatches on this
/// tag as a closed set — there is no runtime type registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    PnCounterOp,
    PnCounterState,
    AwSet,
    TpSet,
    MvRegister,
    EwFlag,
}

/// A `(namespace, type-tag, id)` triple. Two keys differing only in
/// `type_tag` denote different objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: Vec<u8>,
    pub type_tag: TypeTag,
    pub id: Vec<u8>,
}

impl TypeTag {
    /// Parses an external (e.g. CLI/config) type name into a registered
    /// `TypeTag`. This is the one place an unknown type is actually
    /// reachable: the `TypeTag` enum itself is a closed set, so
    /// once a value is a `TypeTag` it is, by construction, a known type.
    pub fn parse(name: &str) -> Result<Self, EngineError> {
        match name {
            "pn-counter-op" => Ok(TypeTag::PnCounterOp),
            "pn-counter-state" => Ok(TypeTag::PnCounterState),
            "aw-set" => Ok(TypeTag::AwSet),
            "tp-set" => Ok(TypeTag::TpSet),
            "mv-register" => Ok(TypeTag::MvRegister),
            "ew-flag" => Ok(TypeTag::EwFlag),
            _ => Err(EngineError::UnknownType(UnknownTypeName(name.to_string()))),
        }
    }
}

/// Carries the unparsed name through `EngineError::UnknownType`, since an
/// unrecognized name cannot be represented as a `TypeTag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTypeName(pub String);

impl fmt::Display for UnknownTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::PnCounterOp => "pn-counter-op",
            TypeTag::PnCounterState => "pn-counter-state",
            TypeTag::AwSet => "aw-set",
            TypeTag::TpSet => "tp-set",
            TypeTag::MvRegister => "mv-register",
            TypeTag::EwFlag => "ew-flag",
        };
        write!(f, "{name}")
    }
}

impl ObjectKey {
    pub fn new(namespace: impl Into<Vec<u8>>, type_tag: TypeTag, id: impl Into<Vec<u8>>) -> Self {
        ObjectKey {
            namespace: namespace.into(),
            type_tag,
            id: id.into(),
        }
    }
}
