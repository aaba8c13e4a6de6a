use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::{config::IndexConfig, errors::ProcError, fulltext::label_index::LabelIndex};

pub const INDEX_NAME_PREFIX: &str = "label-";

/// Name of the index holding the documents of `label`.
pub fn index_name(label: &str) -> String {
    format!("{INDEX_NAME_PREFIX}{label}")
}

/// Inverse of [`index_name`].
pub fn label_of(index_name: &str) -> Option<&str> {
    index_name.strip_prefix(INDEX_NAME_PREFIX)
}

/// Registry of named label indexes.
pub trait IndexStore {
    fn index_exists(&self, name: &str) -> bool;

    /// Looks an index up without creating it.
    fn get_index(&self, name: &str) -> Option<Arc<LabelIndex>>;

    /// Returns the named index, creating it with `config` on first use. An
    /// existing index created with a different config is an error.
    fn get_or_create_index(
        &self,
        name: &str,
        config: &IndexConfig,
    ) -> Result<Arc<LabelIndex>, ProcError>;

    /// Names of all indexes, sorted.
    fn index_names(&self) -> Vec<String>;

    fn drop_index(&self, name: &str) -> bool;

    /// Removes the node from every index. Returns how many indexes held it.
    fn remove_all_for(&self, node_id: i64) -> usize {
        self.index_names()
            .iter()
            .filter_map(|name| self.get_index(name))
            .filter(|index| index.remove(node_id))
            .count()
    }
}

/// Process-local index store.
#[derive(Default)]
pub struct MemoryIndexStore {
    indexes: RwLock<AHashMap<String, Arc<LabelIndex>>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self {
            indexes: RwLock::new(AHashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.indexes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IndexStore for MemoryIndexStore {
    fn index_exists(&self, name: &str) -> bool {
        self.indexes.read().contains_key(name)
    }

    fn get_index(&self, name: &str) -> Option<Arc<LabelIndex>> {
        self.indexes.read().get(name).cloned()
    }

    fn get_or_create_index(
        &self,
        name: &str,
        config: &IndexConfig,
    ) -> Result<Arc<LabelIndex>, ProcError> {
        if let Some(index) = self.get_index(name) {
            return check_config(index, config);
        }
        config.validate()?;
        let mut indexes = self.indexes.write();
        if let Some(index) = indexes.get(name) {
            return check_config(index.clone(), config);
        }
        let label = label_of(name).unwrap_or(name);
        let index = Arc::new(LabelIndex::new(name, label, config.clone()));
        indexes.insert(name.to_string(), index.clone());
        debug!(index = name, kind = ?config.kind, "created label index");
        Ok(index)
    }

    fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn drop_index(&self, name: &str) -> bool {
        let dropped = self.indexes.write().remove(name).is_some();
        if dropped {
            debug!(index = name, "dropped label index");
        }
        dropped
    }

    fn remove_all_for(&self, node_id: i64) -> usize {
        let indexes: Vec<Arc<LabelIndex>> = self.indexes.read().values().cloned().collect();
        indexes.iter().filter(|index| index.remove(node_id)).count()
    }
}

fn check_config(index: Arc<LabelIndex>, config: &IndexConfig) -> Result<Arc<LabelIndex>, ProcError> {
    if index.config() != config {
        return Err(ProcError::invalid_input(format!(
            "index `{}` already exists with a different configuration",
            index.name()
        )));
    }
    Ok(index)
}

impl<'a, S> IndexStore for &'a S
where
    S: IndexStore + ?Sized,
{
    fn index_exists(&self, name: &str) -> bool {
        (*self).index_exists(name)
    }

    fn get_index(&self, name: &str) -> Option<Arc<LabelIndex>> {
        (*self).get_index(name)
    }

    fn get_or_create_index(
        &self,
        name: &str,
        config: &IndexConfig,
    ) -> Result<Arc<LabelIndex>, ProcError> {
        (*self).get_or_create_index(name, config)
    }

    fn index_names(&self) -> Vec<String> {
        (*self).index_names()
    }

    fn drop_index(&self, name: &str) -> bool {
        (*self).drop_index(name)
    }

    fn remove_all_for(&self, node_id: i64) -> usize {
        (*self).remove_all_for(node_id)
    }
}

impl<S> IndexStore for Arc<S>
where
    S: IndexStore + ?Sized,
{
    fn index_exists(&self, name: &str) -> bool {
        (**self).index_exists(name)
    }

    fn get_index(&self, name: &str) -> Option<Arc<LabelIndex>> {
        (**self).get_index(name)
    }

    fn get_or_create_index(
        &self,
        name: &str,
        config: &IndexConfig,
    ) -> Result<Arc<LabelIndex>, ProcError> {
        (**self).get_or_create_index(name, config)
    }

    fn index_names(&self) -> Vec<String> {
        (**self).index_names()
    }

    fn drop_index(&self, name: &str) -> bool {
        (**self).drop_index(name)
    }

    fn remove_all_for(&self, node_id: i64) -> usize {
        (**self).remove_all_for(node_id)
    }
}
