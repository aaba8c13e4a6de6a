//! Per-label full-text indexing: analysis, query parsing, the label index
//! structure, its registry and snapshots.

pub mod analyzer;
pub mod label_index;
pub mod query;
pub mod snapshot;
pub mod store;

pub use analyzer::{Analyzer, Token};
pub use label_index::{IndexedDocument, LabelIndex};
pub use query::{Clause, FullTextQuery, MAX_QUERY_DEPTH, Occur, WildcardPart, parse_query};
pub use snapshot::{
    dump_indexes_to_path, dump_indexes_to_writer, load_indexes_from_path,
    load_indexes_from_reader,
};
pub use store::{INDEX_NAME_PREFIX, IndexStore, MemoryIndexStore, index_name, label_of};
