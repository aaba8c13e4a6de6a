use std::collections::{BTreeMap, BTreeSet};

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    config::IndexConfig,
    errors::ProcError,
    fulltext::{
        analyzer::Analyzer,
        query::{FullTextQuery, Occur, WildcardPart, parse_query, wildcard_matches},
    },
};

/// Snapshot of the requested properties of one node, filed under one label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub label: String,
    pub node_id: i64,
    pub properties: BTreeMap<String, Value>,
}

type Postings = BTreeMap<i64, Vec<u32>>;

#[derive(Default)]
struct IndexState {
    documents: AHashMap<i64, IndexedDocument>,
    // field -> term -> node -> positions
    fields: AHashMap<String, BTreeMap<String, Postings>>,
}

/// Full-text index over the documents of a single label.
///
/// All mutation happens under the write half of one lock, so a reader sees a
/// document either completely or not at all.
pub struct LabelIndex {
    name: String,
    label: String,
    config: IndexConfig,
    analyzer: Analyzer,
    state: RwLock<IndexState>,
}

impl LabelIndex {
    pub fn new(name: &str, label: &str, config: IndexConfig) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            analyzer: Analyzer::new(&config),
            config,
            state: RwLock::new(IndexState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Adds one property to the node's document, creating the document if
    /// needed. Adding a key that is already present makes it multi-valued.
    pub fn add(&self, node_id: i64, key: &str, value: Value) -> Result<(), ProcError> {
        if key.trim().is_empty() {
            return Err(ProcError::invalid_input("property key must be set"));
        }
        let mut state = self.state.write();
        let mut document = match state.documents.remove(&node_id) {
            Some(existing) => {
                self.unpost(&mut state, &existing);
                existing
            }
            None => IndexedDocument {
                label: self.label.clone(),
                node_id,
                properties: BTreeMap::new(),
            },
        };
        match document.properties.remove(key) {
            Some(Value::Array(mut values)) => {
                values.push(value);
                document.properties.insert(key.to_string(), Value::Array(values));
            }
            Some(previous) => {
                document
                    .properties
                    .insert(key.to_string(), Value::Array(vec![previous, value]));
            }
            None => {
                document.properties.insert(key.to_string(), value);
            }
        }
        self.post(&mut state, &document);
        state.documents.insert(node_id, document);
        Ok(())
    }

    /// Removes every entry of the node. Returns whether anything was removed.
    pub fn remove(&self, node_id: i64) -> bool {
        let mut state = self.state.write();
        match state.documents.remove(&node_id) {
            Some(existing) => {
                self.unpost(&mut state, &existing);
                true
            }
            None => false,
        }
    }

    /// Swaps the node's document for `document` in one step and returns the
    /// previous one.
    pub fn replace(&self, document: IndexedDocument) -> Result<Option<IndexedDocument>, ProcError> {
        if document.label != self.label {
            return Err(ProcError::invalid_input(format!(
                "document for label `{}` cannot be stored in index `{}`",
                document.label, self.name
            )));
        }
        let mut state = self.state.write();
        let previous = state.documents.remove(&document.node_id);
        if let Some(existing) = &previous {
            self.unpost(&mut state, existing);
        }
        self.post(&mut state, &document);
        state.documents.insert(document.node_id, document);
        Ok(previous)
    }

    pub fn get(&self, node_id: i64) -> Option<IndexedDocument> {
        self.state.read().documents.get(&node_id).cloned()
    }

    pub fn contains(&self, node_id: i64) -> bool {
        self.state.read().documents.contains_key(&node_id)
    }

    pub fn len(&self) -> usize {
        self.state.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All documents, ordered by node id.
    pub fn documents(&self) -> Vec<IndexedDocument> {
        let state = self.state.read();
        let mut documents: Vec<IndexedDocument> = state.documents.values().cloned().collect();
        documents.sort_by_key(|doc| doc.node_id);
        documents
    }

    /// Parses and runs `text`, returning matching node ids in ascending order.
    pub fn query(&self, text: &str) -> Result<Vec<i64>, ProcError> {
        let query = parse_query(text, self.config.default_operator)?;
        Ok(self.evaluate(&query))
    }

    pub fn evaluate(&self, query: &FullTextQuery) -> Vec<i64> {
        let state = self.state.read();
        self.matches(&state, query).into_iter().collect()
    }

    fn post(&self, state: &mut IndexState, document: &IndexedDocument) {
        for (key, value) in &document.properties {
            let terms = state.fields.entry(key.clone()).or_default();
            for token in self.analyzer.analyze_value(value) {
                terms
                    .entry(token.text)
                    .or_default()
                    .entry(document.node_id)
                    .or_default()
                    .push(token.position);
            }
        }
    }

    fn unpost(&self, state: &mut IndexState, document: &IndexedDocument) {
        for (key, value) in &document.properties {
            let Some(terms) = state.fields.get_mut(key) else {
                continue;
            };
            for token in self.analyzer.analyze_value(value) {
                if let Some(postings) = terms.get_mut(&token.text) {
                    postings.remove(&document.node_id);
                    if postings.is_empty() {
                        terms.remove(&token.text);
                    }
                }
            }
            if terms.is_empty() {
                state.fields.remove(key);
            }
        }
    }

    fn matches(&self, state: &IndexState, query: &FullTextQuery) -> BTreeSet<i64> {
        match query {
            FullTextQuery::MatchAll => state.documents.keys().copied().collect(),
            FullTextQuery::Term { field, text } | FullTextQuery::Phrase { field, text } => {
                let terms = self.analyzer.analyze_text(text);
                self.phrase_matches(state, field.as_deref(), &terms)
            }
            FullTextQuery::Prefix { field, prefix } => {
                let prefix = self.analyzer.normalize(prefix);
                let mut hits = BTreeSet::new();
                for terms in self.fields_for(state, field.as_deref()) {
                    for (_, postings) in terms
                        .range(prefix.clone()..)
                        .take_while(|(term, _)| term.starts_with(&prefix))
                    {
                        hits.extend(postings.keys().copied());
                    }
                }
                hits
            }
            FullTextQuery::Wildcard { field, pattern } => {
                let pattern: Vec<WildcardPart> = pattern
                    .iter()
                    .map(|part| match part {
                        WildcardPart::Literal(c) => {
                            let folded = self.analyzer.normalize(&c.to_string());
                            WildcardPart::Literal(folded.chars().next().unwrap_or(*c))
                        }
                        other => other.clone(),
                    })
                    .collect();
                let mut hits = BTreeSet::new();
                for terms in self.fields_for(state, field.as_deref()) {
                    for (term, postings) in terms {
                        if wildcard_matches(&pattern, term) {
                            hits.extend(postings.keys().copied());
                        }
                    }
                }
                hits
            }
            FullTextQuery::Boolean(clauses) => {
                let mut must: Option<BTreeSet<i64>> = None;
                let mut should = BTreeSet::new();
                let mut has_should = false;
                let mut must_not = BTreeSet::new();
                for clause in clauses {
                    let hits = self.matches(state, &clause.query);
                    match clause.occur {
                        Occur::Must => {
                            must = Some(match must {
                                Some(current) => current.intersection(&hits).copied().collect(),
                                None => hits,
                            });
                        }
                        Occur::Should => {
                            has_should = true;
                            should.extend(hits);
                        }
                        Occur::MustNot => must_not.extend(hits),
                    }
                }
                let base = match must {
                    Some(required) => required,
                    None if has_should => should,
                    None => BTreeSet::new(),
                };
                base.difference(&must_not).copied().collect()
            }
        }
    }

    fn fields_for<'s>(
        &self,
        state: &'s IndexState,
        field: Option<&str>,
    ) -> Vec<&'s BTreeMap<String, Postings>> {
        match field {
            Some(name) => state.fields.get(name).into_iter().collect(),
            None => state.fields.values().collect(),
        }
    }

    fn phrase_matches(
        &self,
        state: &IndexState,
        field: Option<&str>,
        terms: &[String],
    ) -> BTreeSet<i64> {
        let mut hits = BTreeSet::new();
        let Some((first, rest)) = terms.split_first() else {
            return hits;
        };
        for field_terms in self.fields_for(state, field) {
            let Some(first_postings) = field_terms.get(first) else {
                continue;
            };
            let mut rest_postings = Vec::with_capacity(rest.len());
            for term in rest {
                match field_terms.get(term) {
                    Some(postings) => rest_postings.push(postings),
                    None => break,
                }
            }
            if rest_postings.len() != rest.len() {
                continue;
            }
            for (node_id, positions) in first_postings {
                let found = positions.iter().any(|&start| {
                    rest_postings.iter().enumerate().all(|(offset, postings)| {
                        postings.get(node_id).is_some_and(|candidate| {
                            candidate.binary_search(&(start + offset as u32 + 1)).is_ok()
                        })
                    })
                });
                if found {
                    hits.insert(*node_id);
                }
            }
        }
        hits
    }
}
