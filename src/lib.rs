//! Graph procedures backed by a SQLite node store: a per-label full-text
//! index (`index` / `search`) and property lookups.
//! Run Criterion benchmarks with `cargo bench` to inspect reports under `target/criterion`.

pub mod client;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod fulltext;
pub mod graph;
pub mod procedures;
pub mod schema;
pub mod store;

pub use crate::config::{DefaultOperator, IndexConfig, IndexKind, ProcConfig, StaleLabelPolicy};
pub use crate::diagnostics::{DiagnosticSink, TracingSink};
pub use crate::errors::ProcError;
pub use crate::fulltext::{IndexStore, IndexedDocument, LabelIndex, MemoryIndexStore, index_name};
pub use crate::graph::SqliteNodeStore;
pub use crate::procedures::{
    FullTextProcedures, ParamType, ProcMode, ProcedureRegistry, ProcedureSignature, Record,
    SearchHit, SearchHits, register_fulltext_procedures, register_property_procedures,
};
pub use crate::store::{Node, NodeSpec, NodeStore, Relationship, RelationshipSpec};
