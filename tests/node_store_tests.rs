use std::collections::BTreeSet;

use graphprocs::{NodeSpec, NodeStore, ProcError, RelationshipSpec, SqliteNodeStore};
use serde_json::json;

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[test]
fn test_insert_and_get_node() {
    let store = SqliteNodeStore::open_in_memory().expect("store");
    let id = store
        .insert_node(
            &NodeSpec::new(["Person", "Actor"])
                .property("name", json!("Keanu Reeves"))
                .property("born", json!(1964))
                .property("aliases", json!(["Neo", "John Wick"])),
        )
        .expect("insert");
    let node = store.get_node(id).expect("node");
    assert_eq!(node.id, id);
    assert_eq!(
        node.labels,
        BTreeSet::from(["Actor".to_string(), "Person".to_string()])
    );
    assert_eq!(node.properties["born"], json!(1964));
    assert_eq!(node.properties["aliases"], json!(["Neo", "John Wick"]));
}

#[test]
fn test_property_subset_returns_only_present_keys() {
    let store = SqliteNodeStore::open_in_memory().expect("store");
    let id = store
        .insert_node(
            &NodeSpec::new(["Person"])
                .property("name", json!("Carrie-Anne Moss"))
                .property("born", json!(1967)),
        )
        .expect("insert");
    let subset = store
        .properties(id, &keys(&["name", "height"]))
        .expect("subset");
    assert_eq!(subset.len(), 1);
    assert_eq!(subset["name"], json!("Carrie-Anne Moss"));
    assert!(store.properties(id, &[]).expect("empty").is_empty());
    assert!(matches!(
        store.properties(id + 100, &keys(&["name"])),
        Err(ProcError::NotFound(_))
    ));
}

#[test]
fn test_labels_and_properties_can_change() {
    let store = SqliteNodeStore::open_in_memory().expect("store");
    let id = store
        .insert_node(&NodeSpec::new(["Person"]))
        .expect("insert");
    store.add_label(id, "Director").expect("add label");
    assert!(store.remove_label(id, "Person").expect("remove label"));
    assert!(!store.remove_label(id, "Person").expect("remove again"));
    store.set_property(id, "name", &json!("Lana")).expect("set");
    store.set_property(id, "name", &json!("Lilly")).expect("overwrite");
    assert!(store.remove_property(id, "missing").is_ok_and(|removed| !removed));

    let node = store.node(id).expect("node");
    assert_eq!(node.labels, BTreeSet::from(["Director".to_string()]));
    assert_eq!(node.properties["name"], json!("Lilly"));
    assert_eq!(store.nodes_with_label("Director").expect("ids"), vec![id]);
    assert!(store.nodes_with_label("Person").expect("ids").is_empty());
}

#[test]
fn test_invalid_labels_and_keys_are_rejected() {
    let store = SqliteNodeStore::open_in_memory().expect("store");
    assert!(matches!(
        store.insert_node(&NodeSpec::new(["Bad Label"])),
        Err(ProcError::InvalidInput(_))
    ));
    assert!(matches!(
        store.insert_node(&NodeSpec::new(["Ok"]).property("", json!(1))),
        Err(ProcError::InvalidInput(_))
    ));
    assert!(store.node_ids().expect("ids").is_empty());
}

#[test]
fn test_relationships() {
    let store = SqliteNodeStore::open_in_memory().expect("store");
    let keanu = store.insert_node(&NodeSpec::new(["Person"])).expect("a");
    let matrix = store.insert_node(&NodeSpec::new(["Movie"])).expect("b");
    let rel = store
        .insert_relationship(&RelationshipSpec {
            from: keanu,
            to: matrix,
            rel_type: "ACTED_IN".into(),
            properties: [("roles".to_string(), json!(["Neo"]))].into_iter().collect(),
        })
        .expect("relationship");
    let loaded = store.relationship(rel).expect("load");
    assert_eq!((loaded.from_id, loaded.to_id), (keanu, matrix));
    assert_eq!(loaded.rel_type, "ACTED_IN");
    assert_eq!(loaded.properties["roles"], json!(["Neo"]));

    let dangling = store.insert_relationship(&RelationshipSpec {
        from: keanu,
        to: matrix + 50,
        rel_type: "ACTED_IN".into(),
        properties: Default::default(),
    });
    assert!(matches!(dangling, Err(ProcError::InvalidInput(_))));
    assert!(matches!(
        store.relationship(rel + 1),
        Err(ProcError::NotFound(_))
    ));
}

#[test]
fn test_delete_node_cascades() {
    let store = SqliteNodeStore::open_in_memory().expect("store");
    let a = store
        .insert_node(&NodeSpec::new(["Person"]).property("name", json!("a")))
        .expect("a");
    let b = store.insert_node(&NodeSpec::new(["Person"])).expect("b");
    let rel = store
        .insert_relationship(&RelationshipSpec {
            from: a,
            to: b,
            rel_type: "KNOWS".into(),
            properties: Default::default(),
        })
        .expect("rel");
    store.delete_node(a).expect("delete");
    assert!(matches!(store.node(a), Err(ProcError::NotFound(_))));
    assert!(matches!(store.relationship(rel), Err(ProcError::NotFound(_))));
    assert_eq!(store.nodes_with_label("Person").expect("ids"), vec![b]);
    assert!(matches!(store.delete_node(a), Err(ProcError::NotFound(_))));
}

#[test]
fn test_file_backed_store_persists() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("graph.db");
    let id = {
        let store = SqliteNodeStore::open(&path).expect("open");
        store
            .insert_node(&NodeSpec::new(["Movie"]).property("title", json!("Speed")))
            .expect("insert")
    };
    let reopened = SqliteNodeStore::open(&path).expect("reopen");
    assert_eq!(reopened.node(id).expect("node").properties["title"], json!("Speed"));
}
