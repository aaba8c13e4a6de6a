//! Node store seam consumed by the procedures. Each trait method maps onto one
//! read the procedures need from the host graph; [`crate::graph::SqliteNodeStore`]
//! is the bundled implementation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ProcError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: i64,
    pub labels: BTreeSet<String>,
    pub properties: BTreeMap<String, Value>,
}

impl Node {
    /// Copies out the requested keys the node actually carries. Unknown keys
    /// are skipped.
    pub fn properties_for(&self, keys: &[String]) -> BTreeMap<String, Value> {
        keys.iter()
            .filter_map(|key| {
                self.properties
                    .get(key)
                    .map(|value| (key.clone(), value.clone()))
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: i64,
    pub from_id: i64,
    pub to_id: i64,
    pub rel_type: String,
    pub properties: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, Default)]
pub struct NodeSpec {
    pub labels: Vec<String>,
    pub properties: BTreeMap<String, Value>,
}

impl NodeSpec {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            properties: BTreeMap::new(),
        }
    }

    pub fn property<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

#[derive(Clone, Debug)]
pub struct RelationshipSpec {
    pub from: i64,
    pub to: i64,
    pub rel_type: String,
    pub properties: BTreeMap<String, Value>,
}

pub trait NodeStore {
    /// Resolves a node with its labels and properties, or `NotFound`.
    fn node(&self, id: i64) -> Result<Node, ProcError>;

    /// Bulk fetch of the requested keys present on the node.
    fn properties(&self, id: i64, keys: &[String]) -> Result<BTreeMap<String, Value>, ProcError> {
        Ok(self.node(id)?.properties_for(keys))
    }

    fn relationship(&self, id: i64) -> Result<Relationship, ProcError>;

    /// Ids of every node carrying `label`, ascending.
    fn nodes_with_label(&self, label: &str) -> Result<Vec<i64>, ProcError>;
}

impl<'a, S> NodeStore for &'a S
where
    S: NodeStore + ?Sized,
{
    fn node(&self, id: i64) -> Result<Node, ProcError> {
        (*self).node(id)
    }

    fn properties(&self, id: i64, keys: &[String]) -> Result<BTreeMap<String, Value>, ProcError> {
        (*self).properties(id, keys)
    }

    fn relationship(&self, id: i64) -> Result<Relationship, ProcError> {
        (*self).relationship(id)
    }

    fn nodes_with_label(&self, label: &str) -> Result<Vec<i64>, ProcError> {
        (*self).nodes_with_label(label)
    }
}

impl<S> NodeStore for std::sync::Arc<S>
where
    S: NodeStore + ?Sized,
{
    fn node(&self, id: i64) -> Result<Node, ProcError> {
        (**self).node(id)
    }

    fn properties(&self, id: i64, keys: &[String]) -> Result<BTreeMap<String, Value>, ProcError> {
        (**self).properties(id, keys)
    }

    fn relationship(&self, id: i64) -> Result<Relationship, ProcError> {
        (**self).relationship(id)
    }

    fn nodes_with_label(&self, label: &str) -> Result<Vec<i64>, ProcError> {
        (**self).nodes_with_label(label)
    }
}
