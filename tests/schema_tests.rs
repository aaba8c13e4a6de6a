use graphprocs::schema::ensure_schema;
use rusqlite::Connection;

#[test]
fn test_schema_creates_node_tables() {
    let conn = Connection::open_in_memory().unwrap();
    ensure_schema(&conn).unwrap();
    for table in [
        "graph_nodes",
        "graph_labels",
        "graph_properties",
        "graph_relationships",
    ] {
        assert!(table_exists(&conn, table), "{table} missing");
    }
    assert!(table_exists(&conn, "idx_labels_label"));
}

#[test]
fn test_schema_is_idempotent() {
    let conn = Connection::open_in_memory().unwrap();
    ensure_schema(&conn).unwrap();
    ensure_schema(&conn).unwrap();
}

fn table_exists(conn: &Connection, name: &str) -> bool {
    conn.prepare("SELECT name FROM sqlite_master WHERE name=?1")
        .unwrap()
        .exists([name])
        .unwrap()
}
