//! A distributed, causally consistent key-value store built from CRDTs.
//!
//! See `SPEC_FULL.md` at the repository root for the full design. In short:
//! a fixed library of CRDT types (`crdt`), a per-replica engine that gates
//! client requests on causal dependencies and dispatches to those types
//! (`engine`), a write-ahead log plus snapshot persistence layer
//! (`persistence`), and a causal broadcast layer built on actix actors
//! (`broadcast`, `actor`).

pub mod actor;
pub mod broadcast;
pub mod config;
pub mod crdt;
pub mod engine;
pub mod error;
pub mod ids;
pub mod key;
pub mod persistence;
pub mod token;
pub mod vector_clock;

pub use engine::{GateOutcome, ReadyResult, ReplicaEngine};
pub use error::EngineError;
pub use ids::ReplicaId;
pub use key::{ObjectKey, TypeTag};
