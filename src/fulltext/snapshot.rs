//! JSON-lines dump and restore of label indexes. Each index is written as an
//! `index` record followed by one `document` record per indexed node.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    config::IndexConfig,
    errors::ProcError,
    fulltext::{label_index::IndexedDocument, store::IndexStore},
};

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SnapshotRecord {
    Index {
        name: String,
        config: IndexConfig,
    },
    Document {
        index: String,
        node_id: i64,
        properties: BTreeMap<String, Value>,
    },
}

pub fn dump_indexes_to_path<S, P>(store: &S, path: P) -> Result<(), ProcError>
where
    S: IndexStore + ?Sized,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref()).map_err(|e| ProcError::invalid_input(e.to_string()))?;
    let mut writer = BufWriter::new(file);
    dump_indexes_to_writer(store, &mut writer)?;
    writer
        .flush()
        .map_err(|e| ProcError::invalid_input(e.to_string()))
}

pub fn dump_indexes_to_writer<S, W>(store: &S, mut writer: W) -> Result<(), ProcError>
where
    S: IndexStore + ?Sized,
    W: Write,
{
    for name in store.index_names() {
        let Some(index) = store.get_index(&name) else {
            continue;
        };
        write_record(
            &mut writer,
            &SnapshotRecord::Index {
                name: name.clone(),
                config: index.config().clone(),
            },
        )?;
        for document in index.documents() {
            write_record(
                &mut writer,
                &SnapshotRecord::Document {
                    index: name.clone(),
                    node_id: document.node_id,
                    properties: document.properties,
                },
            )?;
        }
    }
    Ok(())
}

/// Restores a snapshot into `store` and returns the number of documents read.
/// Documents replace any existing document of the same node.
pub fn load_indexes_from_path<S, P>(store: &S, path: P) -> Result<usize, ProcError>
where
    S: IndexStore + ?Sized,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref()).map_err(|e| ProcError::invalid_input(e.to_string()))?;
    load_indexes_from_reader(store, BufReader::new(file))
}

pub fn load_indexes_from_reader<S, R>(store: &S, reader: R) -> Result<usize, ProcError>
where
    S: IndexStore + ?Sized,
    R: BufRead,
{
    let mut documents = 0;
    for line in reader.lines() {
        let line = line.map_err(|e| ProcError::invalid_input(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: SnapshotRecord =
            serde_json::from_str(&line).map_err(|e| ProcError::invalid_input(e.to_string()))?;
        match record {
            SnapshotRecord::Index { name, config } => {
                store.get_or_create_index(&name, &config)?;
            }
            SnapshotRecord::Document {
                index,
                node_id,
                properties,
            } => {
                let target = store.get_index(&index).ok_or_else(|| {
                    ProcError::invalid_input(format!("document for unknown index `{index}`"))
                })?;
                target.replace(IndexedDocument {
                    label: target.label().to_string(),
                    node_id,
                    properties,
                })?;
                documents += 1;
            }
        }
    }
    Ok(documents)
}

fn write_record<W: Write>(writer: &mut W, record: &SnapshotRecord) -> Result<(), ProcError> {
    serde_json::to_writer(&mut *writer, record)
        .map_err(|e| ProcError::invalid_input(e.to_string()))?;
    writer
        .write_all(b"\n")
        .map_err(|e| ProcError::invalid_input(e.to_string()))
}
