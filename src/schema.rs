use rusqlite::Connection;

use crate::errors::ProcError;

pub fn ensure_schema(conn: &Connection) -> Result<(), ProcError> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS graph_nodes (
            id        INTEGER PRIMARY KEY AUTOINCREMENT
        );
        CREATE TABLE IF NOT EXISTS graph_labels (
            node_id   INTEGER NOT NULL,
            label     TEXT NOT NULL,
            PRIMARY KEY (node_id, label)
        );
        CREATE TABLE IF NOT EXISTS graph_properties (
            node_id   INTEGER NOT NULL,
            key       TEXT NOT NULL,
            value     TEXT NOT NULL,
            PRIMARY KEY (node_id, key)
        );
        CREATE TABLE IF NOT EXISTS graph_relationships (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            from_id   INTEGER NOT NULL,
            to_id     INTEGER NOT NULL,
            rel_type  TEXT NOT NULL,
            data      TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_labels_label ON graph_labels(label);
        CREATE INDEX IF NOT EXISTS idx_rels_from ON graph_relationships(from_id);
        CREATE INDEX IF NOT EXISTS idx_rels_to ON graph_relationships(to_id);
        "#,
    )
    .map_err(|e| ProcError::schema(e.to_string()))?;
    Ok(())
}
