//! Procedures exposed to the host and the table they are registered in.

pub mod fulltext;
pub mod properties;
pub mod registry;

pub use fulltext::{FullTextProcedures, SearchHit, SearchHits, register_fulltext_procedures};
pub use properties::{node_props, register_property_procedures, rel_props};
pub use registry::{
    ParamSpec, ParamType, ProcMode, ProcedureHandler, ProcedureRegistry, ProcedureSignature,
    Record, handler,
};
