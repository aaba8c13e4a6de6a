use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter, types::Value as SqlValue};
use serde_json::Value;
use tracing::trace;

use crate::{
    errors::ProcError,
    schema::ensure_schema,
    store::{Node, NodeSpec, NodeStore, Relationship, RelationshipSpec},
};

/// SQLite-backed node store. The connection sits behind a mutex so the store
/// can be shared between procedure calls on different threads.
pub struct SqliteNodeStore {
    conn: Mutex<Connection>,
}

impl SqliteNodeStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ProcError> {
        let conn = Connection::open(path).map_err(|e| ProcError::connection(e.to_string()))?;
        ensure_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self, ProcError> {
        let conn =
            Connection::open_in_memory().map_err(|e| ProcError::connection(e.to_string()))?;
        ensure_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Inserts a node with its labels and properties in one transaction and
    /// returns the new rowid.
    pub fn insert_node(&self, spec: &NodeSpec) -> Result<i64, ProcError> {
        for label in &spec.labels {
            validate_label(label)?;
        }
        for key in spec.properties.keys() {
            validate_key(key)?;
        }
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| ProcError::query(e.to_string()))?;
        tx.execute("INSERT INTO graph_nodes DEFAULT VALUES", [])
            .map_err(|e| ProcError::query(e.to_string()))?;
        let id = tx.last_insert_rowid();
        for label in &spec.labels {
            tx.execute(
                "INSERT OR IGNORE INTO graph_labels(node_id, label) VALUES(?1, ?2)",
                params![id, label],
            )
            .map_err(|e| ProcError::query(e.to_string()))?;
        }
        for (key, value) in &spec.properties {
            tx.execute(
                "INSERT INTO graph_properties(node_id, key, value) VALUES(?1, ?2, ?3)",
                params![id, key, encode_value(value)?],
            )
            .map_err(|e| ProcError::query(e.to_string()))?;
        }
        tx.commit().map_err(|e| ProcError::query(e.to_string()))?;
        trace!(node = id, labels = spec.labels.len(), "inserted node");
        Ok(id)
    }

    pub fn get_node(&self, id: i64) -> Result<Node, ProcError> {
        let conn = self.conn.lock();
        ensure_node(&conn, id)?;
        let labels = collect_labels(&conn, id)?;
        let mut stmt = conn
            .prepare_cached("SELECT key, value FROM graph_properties WHERE node_id=?1 ORDER BY key")
            .map_err(|e| ProcError::query(e.to_string()))?;
        let rows = stmt
            .query_map(params![id], |row| row_to_property(row))
            .map_err(|e| ProcError::query(e.to_string()))?;
        let mut properties = BTreeMap::new();
        for row in rows {
            let (key, value) = row.map_err(|e| ProcError::query(e.to_string()))?;
            properties.insert(key, value);
        }
        Ok(Node {
            id,
            labels,
            properties,
        })
    }

    pub fn add_label(&self, id: i64, label: &str) -> Result<(), ProcError> {
        validate_label(label)?;
        let conn = self.conn.lock();
        ensure_node(&conn, id)?;
        conn.execute(
            "INSERT OR IGNORE INTO graph_labels(node_id, label) VALUES(?1, ?2)",
            params![id, label],
        )
        .map_err(|e| ProcError::query(e.to_string()))?;
        Ok(())
    }

    /// Returns whether the label was present.
    pub fn remove_label(&self, id: i64, label: &str) -> Result<bool, ProcError> {
        let conn = self.conn.lock();
        ensure_node(&conn, id)?;
        let affected = conn
            .execute(
                "DELETE FROM graph_labels WHERE node_id=?1 AND label=?2",
                params![id, label],
            )
            .map_err(|e| ProcError::query(e.to_string()))?;
        Ok(affected > 0)
    }

    pub fn set_property(&self, id: i64, key: &str, value: &Value) -> Result<(), ProcError> {
        validate_key(key)?;
        let conn = self.conn.lock();
        ensure_node(&conn, id)?;
        conn.execute(
            "INSERT INTO graph_properties(node_id, key, value) VALUES(?1, ?2, ?3) \
             ON CONFLICT(node_id, key) DO UPDATE SET value=excluded.value",
            params![id, key, encode_value(value)?],
        )
        .map_err(|e| ProcError::query(e.to_string()))?;
        Ok(())
    }

    /// Returns whether the property was present.
    pub fn remove_property(&self, id: i64, key: &str) -> Result<bool, ProcError> {
        let conn = self.conn.lock();
        ensure_node(&conn, id)?;
        let affected = conn
            .execute(
                "DELETE FROM graph_properties WHERE node_id=?1 AND key=?2",
                params![id, key],
            )
            .map_err(|e| ProcError::query(e.to_string()))?;
        Ok(affected > 0)
    }

    /// Deletes the node together with its labels, properties and every
    /// relationship touching it.
    pub fn delete_node(&self, id: i64) -> Result<(), ProcError> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| ProcError::query(e.to_string()))?;
        let affected = tx
            .execute("DELETE FROM graph_nodes WHERE id=?1", params![id])
            .map_err(|e| ProcError::query(e.to_string()))?;
        if affected == 0 {
            return Err(ProcError::not_found(format!("node {id}")));
        }
        for sql in [
            "DELETE FROM graph_labels WHERE node_id=?1",
            "DELETE FROM graph_properties WHERE node_id=?1",
            "DELETE FROM graph_relationships WHERE from_id=?1 OR to_id=?1",
        ] {
            tx.execute(sql, params![id])
                .map_err(|e| ProcError::query(e.to_string()))?;
        }
        tx.commit().map_err(|e| ProcError::query(e.to_string()))?;
        Ok(())
    }

    pub fn insert_relationship(&self, spec: &RelationshipSpec) -> Result<i64, ProcError> {
        validate_label(&spec.rel_type)?;
        let conn = self.conn.lock();
        if !node_exists(&conn, spec.from)? || !node_exists(&conn, spec.to)? {
            return Err(ProcError::invalid_input(
                "relationship endpoints must reference existing nodes",
            ));
        }
        let data = serde_json::to_string(&spec.properties)
            .map_err(|e| ProcError::invalid_input(e.to_string()))?;
        conn.execute(
            "INSERT INTO graph_relationships(from_id, to_id, rel_type, data) VALUES(?1, ?2, ?3, ?4)",
            params![spec.from, spec.to, spec.rel_type.as_str(), data],
        )
        .map_err(|e| ProcError::query(e.to_string()))?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_relationship(&self, id: i64) -> Result<Relationship, ProcError> {
        self.conn
            .lock()
            .query_row(
                "SELECT id, from_id, to_id, rel_type, data FROM graph_relationships WHERE id=?1",
                params![id],
                |row| row_to_relationship(row),
            )
            .map_err(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => {
                    ProcError::not_found(format!("relationship {id}"))
                }
                other => ProcError::query(other.to_string()),
            })
    }

    pub fn node_ids(&self) -> Result<Vec<i64>, ProcError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT id FROM graph_nodes ORDER BY id")
            .map_err(|e| ProcError::query(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| ProcError::query(e.to_string()))?;
        let mut ids = Vec::new();
        for id in rows {
            ids.push(id.map_err(|e| ProcError::query(e.to_string()))?);
        }
        Ok(ids)
    }

    pub fn label_ids(&self, label: &str) -> Result<Vec<i64>, ProcError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT node_id FROM graph_labels WHERE label=?1 ORDER BY node_id")
            .map_err(|e| ProcError::query(e.to_string()))?;
        let rows = stmt
            .query_map(params![label], |row| row.get(0))
            .map_err(|e| ProcError::query(e.to_string()))?;
        let mut ids = Vec::new();
        for id in rows {
            ids.push(id.map_err(|e| ProcError::query(e.to_string()))?);
        }
        Ok(ids)
    }

    pub fn property_subset(
        &self,
        id: i64,
        keys: &[String],
    ) -> Result<BTreeMap<String, Value>, ProcError> {
        let conn = self.conn.lock();
        ensure_node(&conn, id)?;
        if keys.is_empty() {
            return Ok(BTreeMap::new());
        }
        let placeholders = (0..keys.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT key, value FROM graph_properties WHERE node_id=?1 AND key IN ({placeholders})"
        );
        let mut bindings = Vec::with_capacity(keys.len() + 1);
        bindings.push(SqlValue::Integer(id));
        bindings.extend(keys.iter().map(|key| SqlValue::Text(key.clone())));
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| ProcError::query(e.to_string()))?;
        let rows = stmt
            .query_map(params_from_iter(bindings), |row| row_to_property(row))
            .map_err(|e| ProcError::query(e.to_string()))?;
        let mut properties = BTreeMap::new();
        for row in rows {
            let (key, value) = row.map_err(|e| ProcError::query(e.to_string()))?;
            properties.insert(key, value);
        }
        Ok(properties)
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl NodeStore for SqliteNodeStore {
    fn node(&self, id: i64) -> Result<Node, ProcError> {
        self.get_node(id)
    }

    fn properties(&self, id: i64, keys: &[String]) -> Result<BTreeMap<String, Value>, ProcError> {
        self.property_subset(id, keys)
    }

    fn relationship(&self, id: i64) -> Result<Relationship, ProcError> {
        self.get_relationship(id)
    }

    fn nodes_with_label(&self, label: &str) -> Result<Vec<i64>, ProcError> {
        self.label_ids(label)
    }
}

fn node_exists(conn: &Connection, id: i64) -> Result<bool, ProcError> {
    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM graph_nodes WHERE id=?1", params![id], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| ProcError::query(e.to_string()))?;
    Ok(exists.is_some())
}

fn ensure_node(conn: &Connection, id: i64) -> Result<(), ProcError> {
    if node_exists(conn, id)? {
        Ok(())
    } else {
        Err(ProcError::not_found(format!("node {id}")))
    }
}

fn collect_labels(conn: &Connection, id: i64) -> Result<BTreeSet<String>, ProcError> {
    let mut stmt = conn
        .prepare_cached("SELECT label FROM graph_labels WHERE node_id=?1")
        .map_err(|e| ProcError::query(e.to_string()))?;
    let rows = stmt
        .query_map(params![id], |row| row.get(0))
        .map_err(|e| ProcError::query(e.to_string()))?;
    let mut labels = BTreeSet::new();
    for row in rows {
        labels.insert(row.map_err(|e| ProcError::query(e.to_string()))?);
    }
    Ok(labels)
}

fn encode_value(value: &Value) -> Result<String, ProcError> {
    serde_json::to_string(value).map_err(|e| ProcError::invalid_input(e.to_string()))
}

fn decode_json<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row<'_>,
    column: usize,
) -> Result<T, rusqlite::Error> {
    let text: String = row.get(column)?;
    serde_json::from_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

fn row_to_property(row: &rusqlite::Row<'_>) -> Result<(String, Value), rusqlite::Error> {
    let key: String = row.get(0)?;
    let value = decode_json(row, 1)?;
    Ok((key, value))
}

fn row_to_relationship(row: &rusqlite::Row<'_>) -> Result<Relationship, rusqlite::Error> {
    Ok(Relationship {
        id: row.get(0)?,
        from_id: row.get(1)?,
        to_id: row.get(2)?,
        rel_type: row.get(3)?,
        properties: decode_json(row, 4)?,
    })
}

fn validate_label(label: &str) -> Result<(), ProcError> {
    if label.trim().is_empty() {
        return Err(ProcError::invalid_input("label must be set"));
    }
    if label.contains(char::is_whitespace) {
        return Err(ProcError::invalid_input(format!(
            "label `{label}` must not contain whitespace"
        )));
    }
    Ok(())
}

fn validate_key(key: &str) -> Result<(), ProcError> {
    if key.trim().is_empty() {
        return Err(ProcError::invalid_input("property key must be set"));
    }
    Ok(())
}
