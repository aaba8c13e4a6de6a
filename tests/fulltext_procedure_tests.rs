use std::{collections::BTreeMap, fmt};

use graphprocs::{
    DiagnosticSink, FullTextProcedures, IndexConfig, IndexStore, MemoryIndexStore, Node,
    NodeSpec, NodeStore, ProcConfig, ProcError, Relationship, SqliteNodeStore, StaleLabelPolicy,
    index_name,
};
use parking_lot::Mutex;
use serde_json::json;

#[derive(Default)]
struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl DiagnosticSink for RecordingSink {
    fn debug(&self, message: fmt::Arguments<'_>) {
        self.messages.lock().push(message.to_string());
    }
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn hits<N, I, D>(procs: &FullTextProcedures<N, I, D>, label: &str, query: &str) -> Vec<i64>
where
    N: NodeStore,
    I: IndexStore,
    D: DiagnosticSink,
{
    procs
        .search(label, query)
        .expect("search")
        .map(|hit| hit.node_id)
        .collect()
}

fn movie_store() -> (SqliteNodeStore, i64) {
    let store = SqliteNodeStore::open_in_memory().expect("store");
    let id = store
        .insert_node(
            &NodeSpec::new(["Movie"])
                .property("title", json!("The Matrix"))
                .property("tagline", json!("Welcome to the Real World"))
                .property("released", json!(1999)),
        )
        .expect("node");
    (store, id)
}

#[test]
fn test_resync_twice_leaves_single_document() {
    let (store, id) = movie_store();
    let procs = FullTextProcedures::with_defaults(&store, MemoryIndexStore::new());
    procs.index(id, &keys(&["title", "released"])).expect("first");
    let index = procs.indexes().get_index("label-Movie").expect("index");
    let first = index.get(id).expect("document");

    procs.index(id, &keys(&["title", "released"])).expect("second");
    assert_eq!(index.len(), 1);
    assert_eq!(index.get(id), Some(first));
    assert_eq!(hits(&procs, "Movie", "title:matrix"), vec![id]);
}

#[test]
fn test_missing_keys_are_skipped() {
    let (store, id) = movie_store();
    let procs = FullTextProcedures::with_defaults(&store, MemoryIndexStore::new());
    procs
        .index(id, &keys(&["title", "director", "budget"]))
        .expect("index");
    let document = procs
        .indexes()
        .get_index("label-Movie")
        .and_then(|index| index.get(id))
        .expect("document");
    let expected: BTreeMap<String, serde_json::Value> =
        [("title".to_string(), json!("The Matrix"))].into_iter().collect();
    assert_eq!(document.properties, expected);
}

#[test]
fn test_search_without_index_is_empty_and_logged() {
    let (store, _) = movie_store();
    let sink = RecordingSink::default();
    let procs = FullTextProcedures::new(
        &store,
        MemoryIndexStore::new(),
        &sink,
        ProcConfig::default(),
    );
    let mut results = procs.search("Genre", "anything").expect("search");
    assert_eq!(results.len(), 0);
    assert!(results.next().is_none());
    assert!(!procs.indexes().index_exists("label-Genre"));
    assert_eq!(
        *sink.messages.lock(),
        vec!["Skipping index query since index does not exist: `label-Genre`".to_string()]
    );
}

#[test]
fn test_labels_are_isolated() {
    let store = SqliteNodeStore::open_in_memory().expect("store");
    let id = store
        .insert_node(&NodeSpec::new(["A", "B"]).property("name", json!("shared")))
        .expect("node");
    let procs = FullTextProcedures::with_defaults(&store, MemoryIndexStore::new());
    procs.index(id, &keys(&["name"])).expect("index");

    assert_eq!(
        procs.indexes().index_names(),
        vec!["label-A".to_string(), "label-B".to_string()]
    );
    assert_eq!(hits(&procs, "A", "name:shared"), vec![id]);
    assert_eq!(hits(&procs, "B", "name:shared"), vec![id]);
    assert!(hits(&procs, "C", "name:shared").is_empty());
}

#[test]
fn test_reindex_replaces_previous_values() {
    let store = SqliteNodeStore::open_in_memory().expect("store");
    let id = store
        .insert_node(&NodeSpec::new(["Person"]).property("name", json!("Old")))
        .expect("node");
    let procs = FullTextProcedures::with_defaults(&store, MemoryIndexStore::new());
    procs.index(id, &keys(&["name"])).expect("index old");

    store.set_property(id, "name", &json!("New")).expect("update");
    procs.index(id, &keys(&["name"])).expect("index new");

    assert_eq!(hits(&procs, "Person", "name:New"), vec![id]);
    assert!(hits(&procs, "Person", "name:Old").is_empty());
}

#[test]
fn test_index_name_is_deterministic() {
    assert_eq!(index_name("Movie"), "label-Movie");
    assert_eq!(index_name("Movie"), index_name("Movie"));
    let labels = ["Movie", "movie", "Person", "Movie2", ""];
    let names: std::collections::BTreeSet<String> =
        labels.iter().map(|label| index_name(label)).collect();
    assert_eq!(names.len(), labels.len());
}

#[test]
fn test_index_unknown_node_is_not_found() {
    let store = SqliteNodeStore::open_in_memory().expect("store");
    let procs = FullTextProcedures::with_defaults(&store, MemoryIndexStore::new());
    let err = procs.index(4242, &keys(&["name"])).expect_err("missing node");
    assert!(matches!(err, ProcError::NotFound(_)));
    assert!(procs.indexes().index_names().is_empty());
}

#[test]
fn test_malformed_query_is_invalid_query() {
    let (store, id) = movie_store();
    let procs = FullTextProcedures::with_defaults(&store, MemoryIndexStore::new());
    procs.index(id, &keys(&["title"])).expect("index");
    let err = procs
        .search("Movie", "title:(matrix")
        .expect_err("unbalanced");
    assert!(matches!(err, ProcError::InvalidQuery(_)));
}

#[test]
fn test_retain_keeps_entries_for_removed_labels() {
    let store = SqliteNodeStore::open_in_memory().expect("store");
    let id = store
        .insert_node(&NodeSpec::new(["Draft", "Article"]).property("body", json!("hello")))
        .expect("node");
    let procs = FullTextProcedures::with_defaults(&store, MemoryIndexStore::new());
    procs.index(id, &keys(&["body"])).expect("index");

    store.remove_label(id, "Draft").expect("remove label");
    procs.index(id, &keys(&["body"])).expect("reindex");

    assert_eq!(hits(&procs, "Draft", "body:hello"), vec![id]);
    assert_eq!(hits(&procs, "Article", "body:hello"), vec![id]);
}

#[test]
fn test_purge_drops_entries_for_removed_labels() {
    let store = SqliteNodeStore::open_in_memory().expect("store");
    let id = store
        .insert_node(&NodeSpec::new(["Draft", "Article"]).property("body", json!("hello")))
        .expect("node");
    let config = ProcConfig {
        stale_labels: StaleLabelPolicy::Purge,
        ..ProcConfig::default()
    };
    let procs = FullTextProcedures::new(&store, MemoryIndexStore::new(), graphprocs::TracingSink, config);
    procs.index(id, &keys(&["body"])).expect("index");

    store.remove_label(id, "Draft").expect("remove label");
    procs.index(id, &keys(&["body"])).expect("reindex");

    assert!(hits(&procs, "Draft", "body:hello").is_empty());
    assert_eq!(hits(&procs, "Article", "body:hello"), vec![id]);
}

#[test]
fn test_reindex_label_processes_every_node() {
    let store = SqliteNodeStore::open_in_memory().expect("store");
    let mut ids = Vec::new();
    for name in ["Keanu Reeves", "Carrie-Anne Moss", "Laurence Fishburne"] {
        ids.push(
            store
                .insert_node(&NodeSpec::new(["Person"]).property("name", json!(name)))
                .expect("node"),
        );
    }
    store
        .insert_node(&NodeSpec::new(["Movie"]).property("name", json!("Keanu")))
        .expect("other label");
    let procs = FullTextProcedures::with_defaults(&store, MemoryIndexStore::new());

    let count = procs.reindex_label("Person", &keys(&["name"])).expect("reindex");
    assert_eq!(count, 3);
    assert_eq!(hits(&procs, "Person", "*:*"), ids);
    assert_eq!(hits(&procs, "Person", "name:keanu"), vec![ids[0]]);
    assert!(hits(&procs, "Movie", "name:keanu").is_empty());
}

#[test]
fn test_unindex_and_drop_index() {
    let store = SqliteNodeStore::open_in_memory().expect("store");
    let id = store
        .insert_node(&NodeSpec::new(["A", "B"]).property("name", json!("gone")))
        .expect("node");
    let procs = FullTextProcedures::with_defaults(&store, MemoryIndexStore::new());
    procs.index(id, &keys(&["name"])).expect("index");

    assert_eq!(procs.unindex(id), 2);
    assert_eq!(procs.unindex(id), 0);
    assert!(hits(&procs, "A", "name:gone").is_empty());

    assert!(procs.drop_index("A"));
    assert!(!procs.drop_index("A"));
    assert_eq!(procs.indexes().index_names(), vec!["label-B".to_string()]);
}

#[test]
fn test_hits_are_ordered_by_node_id() {
    let store = SqliteNodeStore::open_in_memory().expect("store");
    let procs = FullTextProcedures::with_defaults(&store, MemoryIndexStore::new());
    let mut ids = Vec::new();
    for tagline in ["red pill", "blue pill", "pill box"] {
        let id = store
            .insert_node(&NodeSpec::new(["Movie"]).property("tagline", json!(tagline)))
            .expect("node");
        ids.push(id);
    }
    for &id in ids.iter().rev() {
        procs.index(id, &keys(&["tagline"])).expect("index");
    }
    assert_eq!(hits(&procs, "Movie", "pill"), ids);
    assert_eq!(hits(&procs, "Movie", "pill -red"), ids[1..].to_vec());
}

#[test]
fn test_failed_index_under_purge_leaves_indexes_untouched() {
    let store = SqliteNodeStore::open_in_memory().expect("store");
    let id = store
        .insert_node(&NodeSpec::new(["A", "B"]).property("name", json!("kept")))
        .expect("node");
    let config = ProcConfig {
        stale_labels: StaleLabelPolicy::Purge,
        ..ProcConfig::default()
    };
    let procs = FullTextProcedures::new(&store, MemoryIndexStore::new(), graphprocs::TracingSink, config);
    procs.index(id, &keys(&["name"])).expect("index");

    // An index restored with another config now sits under label A.
    assert!(procs.indexes().drop_index("label-A"));
    procs
        .indexes()
        .get_or_create_index("label-A", &IndexConfig::exact())
        .expect("conflicting index");

    let err = procs.index(id, &keys(&["name"])).expect_err("config mismatch");
    assert!(matches!(err, ProcError::InvalidInput(_)));
    assert_eq!(hits(&procs, "B", "name:kept"), vec![id]);
}

struct CountingStore<'a> {
    inner: &'a SqliteNodeStore,
    bulk_fetches: Mutex<usize>,
}

impl NodeStore for CountingStore<'_> {
    fn node(&self, id: i64) -> Result<Node, ProcError> {
        self.inner.node(id)
    }

    fn properties(&self, id: i64, keys: &[String]) -> Result<BTreeMap<String, serde_json::Value>, ProcError> {
        *self.bulk_fetches.lock() += 1;
        self.inner.properties(id, keys)
    }

    fn relationship(&self, id: i64) -> Result<Relationship, ProcError> {
        self.inner.relationship(id)
    }

    fn nodes_with_label(&self, label: &str) -> Result<Vec<i64>, ProcError> {
        self.inner.nodes_with_label(label)
    }
}

#[test]
fn test_index_reads_properties_through_bulk_fetch() {
    let (store, id) = movie_store();
    let counting = CountingStore {
        inner: &store,
        bulk_fetches: Mutex::new(0),
    };
    let procs = FullTextProcedures::with_defaults(&counting, MemoryIndexStore::new());
    procs.index(id, &keys(&["title", "missing"])).expect("index");
    assert_eq!(*counting.bulk_fetches.lock(), 1);
    assert_eq!(hits(&procs, "Movie", "title:matrix"), vec![id]);
}
