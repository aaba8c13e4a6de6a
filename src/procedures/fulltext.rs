//! The `index` / `search` procedure pair and its maintenance companions.
//!
//! `index` files a snapshot of selected node properties into one index per
//! label the node carries; `search` runs a full-text query against the index
//! of a single label. Both derive index names with [`index_name`].
//!
//! ```rust
//! use graphprocs::{FullTextProcedures, MemoryIndexStore, NodeSpec, SqliteNodeStore};
//! use serde_json::json;
//!
//! let nodes = SqliteNodeStore::open_in_memory().unwrap();
//! let id = nodes
//!     .insert_node(&NodeSpec::new(["Movie"]).property("title", json!("The Matrix")))
//!     .unwrap();
//! let procs = FullTextProcedures::with_defaults(&nodes, MemoryIndexStore::new());
//! procs.index(id, &["title".to_string()]).unwrap();
//! let hits: Vec<i64> = procs
//!     .search("Movie", "title:matr*")
//!     .unwrap()
//!     .map(|hit| hit.node_id)
//!     .collect();
//! assert_eq!(hits, vec![id]);
//! ```

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    config::{ProcConfig, StaleLabelPolicy},
    diagnostics::{DiagnosticSink, TracingSink},
    errors::ProcError,
    fulltext::{IndexStore, IndexedDocument, index_name},
    procedures::registry::{
        ParamType, ProcMode, ProcedureRegistry, ProcedureSignature, Record, handler, int_arg,
        record, string_arg, string_list_arg,
    },
    store::NodeStore,
};

/// One search result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    #[serde(rename = "nodeId")]
    pub node_id: i64,
}

impl SearchHit {
    pub fn to_record(self) -> Record {
        record("nodeId", json!(self.node_id))
    }
}

/// Hits of one `search` call, in ascending node-id order.
///
/// The ids are collected under the index read lock before `search` returns,
/// so the sequence is a materialized snapshot rather than a lazy cursor over
/// the index. Consumed once; there is no rewind.
#[derive(Debug)]
pub struct SearchHits {
    ids: std::vec::IntoIter<i64>,
}

impl SearchHits {
    fn new(ids: Vec<i64>) -> Self {
        Self {
            ids: ids.into_iter(),
        }
    }

    fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl Iterator for SearchHits {
    type Item = SearchHit;

    fn next(&mut self) -> Option<SearchHit> {
        self.ids.next().map(|node_id| SearchHit { node_id })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl ExactSizeIterator for SearchHits {}

pub struct FullTextProcedures<N, I, D = TracingSink> {
    nodes: N,
    indexes: I,
    sink: D,
    config: ProcConfig,
}

impl<N, I> FullTextProcedures<N, I, TracingSink>
where
    N: NodeStore,
    I: IndexStore,
{
    pub fn with_defaults(nodes: N, indexes: I) -> Self {
        Self::new(nodes, indexes, TracingSink, ProcConfig::default())
    }
}

impl<N, I, D> FullTextProcedures<N, I, D>
where
    N: NodeStore,
    I: IndexStore,
    D: DiagnosticSink,
{
    pub fn new(nodes: N, indexes: I, sink: D, config: ProcConfig) -> Self {
        Self {
            nodes,
            indexes,
            sink,
            config,
        }
    }

    pub fn nodes(&self) -> &N {
        &self.nodes
    }

    pub fn indexes(&self) -> &I {
        &self.indexes
    }

    pub fn config(&self) -> &ProcConfig {
        &self.config
    }

    /// Refreshes the node's document in the index of every label it carries.
    ///
    /// Only keys present on the node are copied; missing keys are skipped.
    /// With [`StaleLabelPolicy::Retain`] documents under labels the node no
    /// longer carries stay where they are. Every label index is resolved
    /// before anything is written, so a failed lookup leaves all indexes as
    /// they were.
    pub fn index(&self, node_id: i64, property_keys: &[String]) -> Result<(), ProcError> {
        let node = self.nodes.node(node_id)?;
        let properties = self.nodes.properties(node_id, property_keys)?;
        let targets = node
            .labels
            .iter()
            .map(|label| {
                self.indexes
                    .get_or_create_index(&index_name(label), &self.config.index)
                    .map(|index| (label, index))
            })
            .collect::<Result<Vec<_>, ProcError>>()?;
        if self.config.stale_labels == StaleLabelPolicy::Purge {
            let purged = self.indexes.remove_all_for(node_id);
            debug!(node = node_id, purged, "purged node before reindexing");
        }
        for (label, index) in &targets {
            index.replace(IndexedDocument {
                label: (*label).clone(),
                node_id,
                properties: properties.clone(),
            })?;
        }
        debug!(
            node = node_id,
            labels = targets.len(),
            properties = properties.len(),
            "indexed node"
        );
        Ok(())
    }

    /// Runs `query` against the index of `label`. A label that was never
    /// indexed yields no hits.
    pub fn search(&self, label: &str, query: &str) -> Result<SearchHits, ProcError> {
        let name = index_name(label);
        let Some(index) = self.indexes.get_index(&name) else {
            self.sink.debug(format_args!(
                "Skipping index query since index does not exist: `{name}`"
            ));
            return Ok(SearchHits::empty());
        };
        Ok(SearchHits::new(index.query(query)?))
    }

    /// Re-synchronizes every node currently carrying `label` and returns how
    /// many nodes were processed.
    pub fn reindex_label(&self, label: &str, property_keys: &[String]) -> Result<usize, ProcError> {
        let ids = self.nodes.nodes_with_label(label)?;
        for &id in &ids {
            self.index(id, property_keys)?;
        }
        debug!(label, nodes = ids.len(), "reindexed label");
        Ok(ids.len())
    }

    /// Removes the node from every label index, including labels it no
    /// longer carries. Returns the number of indexes that held it.
    pub fn unindex(&self, node_id: i64) -> usize {
        self.indexes.remove_all_for(node_id)
    }

    pub fn drop_index(&self, label: &str) -> bool {
        self.indexes.drop_index(&index_name(label))
    }
}

/// Installs `index`, `search`, `reindexLabel`, `unindex` and `dropIndex`.
pub fn register_fulltext_procedures<N, I, D>(
    registry: &mut ProcedureRegistry,
    procs: Arc<FullTextProcedures<N, I, D>>,
) -> Result<(), ProcError>
where
    N: NodeStore + Send + Sync + 'static,
    I: IndexStore + Send + Sync + 'static,
    D: DiagnosticSink + Send + Sync + 'static,
{
    let config = procs.config().clone();

    let handle = procs.clone();
    registry.register(
        ProcedureSignature::new(
            config.procedure_name("index"),
            ProcMode::Schema,
            "For the node with the given node-id, add properties for the provided keys to index per label",
        )
        .param("nodeId", ParamType::Integer)
        .param("properties", ParamType::list_of(ParamType::String)),
        handler(move |args| {
            let node_id = int_arg(args, 0, "nodeId")?;
            let keys = string_list_arg(args, 1, "properties")?;
            handle.index(node_id, &keys)?;
            Ok(Vec::new())
        }),
    )?;

    let handle = procs.clone();
    registry.register(
        ProcedureSignature::new(
            config.procedure_name("search"),
            ProcMode::Read,
            "Execute a full-text query in the index of the given label, return found nodes",
        )
        .param("label", ParamType::String)
        .param("query", ParamType::String)
        .output("nodeId"),
        handler(move |args| {
            let label = string_arg(args, 0, "label")?;
            let query = string_arg(args, 1, "query")?;
            Ok(handle.search(label, query)?.map(SearchHit::to_record).collect())
        }),
    )?;

    let handle = procs.clone();
    registry.register(
        ProcedureSignature::new(
            config.procedure_name("reindexLabel"),
            ProcMode::Schema,
            "Index the provided property keys of every node carrying the label",
        )
        .param("label", ParamType::String)
        .param("properties", ParamType::list_of(ParamType::String))
        .output("count"),
        handler(move |args| {
            let label = string_arg(args, 0, "label")?;
            let keys = string_list_arg(args, 1, "properties")?;
            let count = handle.reindex_label(label, &keys)?;
            Ok(vec![record("count", json!(count))])
        }),
    )?;

    let handle = procs.clone();
    registry.register(
        ProcedureSignature::new(
            config.procedure_name("unindex"),
            ProcMode::Write,
            "Remove the node from every label index",
        )
        .param("nodeId", ParamType::Integer)
        .output("count"),
        handler(move |args| {
            let node_id = int_arg(args, 0, "nodeId")?;
            Ok(vec![record("count", json!(handle.unindex(node_id)))])
        }),
    )?;

    let handle = procs;
    registry.register(
        ProcedureSignature::new(
            config.procedure_name("dropIndex"),
            ProcMode::Schema,
            "Drop the full-text index of the given label",
        )
        .param("label", ParamType::String)
        .output("dropped"),
        handler(move |args| {
            let label = string_arg(args, 0, "label")?;
            Ok(vec![record("dropped", Value::Bool(handle.drop_index(label)))])
        }),
    )?;

    Ok(())
}
