//! Runtime configuration for the procedures and the label indexes they create.
//!
//! All structures deserialize from JSON with every field optional, so a config
//! file only has to name what it changes.
//!
//! ```rust
//! use graphprocs::{IndexKind, ProcConfig, StaleLabelPolicy};
//!
//! let cfg = ProcConfig::from_json_str(r#"{ "stale_labels": "purge" }"#).unwrap();
//! assert_eq!(cfg.stale_labels, StaleLabelPolicy::Purge);
//! assert_eq!(cfg.index.kind, IndexKind::FullText);
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::errors::ProcError;

/// How property values are split into terms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Values are split into words; queries match individual words.
    #[default]
    FullText,
    /// Each value is a single term; queries must match the whole value.
    Exact,
}

/// Operator used between adjacent query clauses that carry no explicit operator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultOperator {
    #[default]
    Or,
    And,
}

/// What `index` does with entries filed under labels the node no longer carries.
///
/// `Retain` leaves them in place until something else re-synchronizes or
/// removes the node, so a search on a former label can still return it.
/// `Purge` removes the node from every label index before re-adding it. The
/// removal and the re-adds take separate locks, so a concurrent search may
/// briefly miss the node under a label it still carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleLabelPolicy {
    #[default]
    Retain,
    Purge,
}

/// Creation config of a single label index.
///
/// An index keeps the config it was created with; asking for the same index
/// with a different config is rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Name of the index implementation. Only `"memory"` ships with this crate.
    pub provider: String,
    pub kind: IndexKind,
    /// Lowercase indexed terms and query terms.
    pub to_lower_case: bool,
    pub default_operator: DefaultOperator,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            provider: String::from("memory"),
            kind: IndexKind::FullText,
            to_lower_case: true,
            default_operator: DefaultOperator::Or,
        }
    }
}

impl IndexConfig {
    pub fn full_text() -> Self {
        Self::default()
    }

    pub fn exact() -> Self {
        Self {
            kind: IndexKind::Exact,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ProcError> {
        if self.provider != "memory" {
            return Err(ProcError::invalid_input(format!(
                "unsupported index provider {}",
                self.provider
            )));
        }
        Ok(())
    }
}

/// Top-level configuration handed to the procedures and the CLI host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcConfig {
    /// Config used when `index` creates a label index.
    pub index: IndexConfig,
    pub stale_labels: StaleLabelPolicy,
    /// Prefix of every registered procedure name.
    pub namespace: String,
    /// Fallback `tracing` filter for the binary when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ProcConfig {
    fn default() -> Self {
        Self {
            index: IndexConfig::default(),
            stale_labels: StaleLabelPolicy::Retain,
            namespace: String::from("graphprocs"),
            log_filter: String::from("warn"),
        }
    }
}

impl ProcConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ProcError> {
        let config: ProcConfig =
            serde_json::from_str(text).map_err(|e| ProcError::invalid_input(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ProcError> {
        let text = fs::read_to_string(path.as_ref()).map_err(|e| {
            ProcError::invalid_input(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ProcError> {
        self.index.validate()?;
        if self.namespace.trim().is_empty() || self.namespace.contains(char::is_whitespace) {
            return Err(ProcError::invalid_input(
                "namespace must be a non-empty identifier",
            ));
        }
        Ok(())
    }

    /// Fully qualified procedure name, e.g. `graphprocs.search`.
    pub fn procedure_name(&self, name: &str) -> String {
        format!("{}.{}", self.namespace, name)
    }
}
