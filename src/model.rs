//! Read-only data model for audited ontologies.
//!
//! Entities and revisions are owned by the metadata store. The audit only
//! reads them; nothing in this crate mutates a loaded value in place.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Prefix that turns a status name into its error marker (`RDF` -> `ERROR_RDF`).
pub const ERROR_STATUS_PREFIX: &str = "ERROR_";

/// A named unit under audit (an ontology).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Identifier, unique within a run (the ontology acronym).
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Summary-only ontologies carry metadata but never submissions.
    #[serde(default)]
    pub summary_only: bool,
}

impl Entity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            summary_only: false,
        }
    }
}

/// A versioned submission belonging to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Monotonic sequence id (the submission id).
    pub id: u32,
    #[serde(default)]
    pub statuses: Vec<String>,
    #[serde(default)]
    pub upload_file_path: Option<PathBuf>,
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,
}

impl Revision {
    pub fn new(id: u32, statuses: &[&str]) -> Self {
        Self {
            id,
            statuses: statuses.iter().map(|s| s.to_string()).collect(),
            upload_file_path: None,
            log_file_path: None,
        }
    }

    /// Status codes that mark an error.
    pub fn error_statuses(&self) -> impl Iterator<Item = &str> {
        self.statuses
            .iter()
            .map(String::as_str)
            .filter(|s| is_error_status(s))
    }

    pub fn has_errors(&self) -> bool {
        self.error_statuses().next().is_some()
    }

    pub fn has_status(&self, status: &str) -> bool {
        self.statuses.iter().any(|s| s == status)
    }

    /// A revision is ready when it carries no error marker and every
    /// status in `required`.
    pub fn is_ready(&self, required: &[String]) -> bool {
        !self.has_errors() && required.iter().all(|s| self.has_status(s))
    }
}

/// Whether a status code is an error marker.
pub fn is_error_status(status: &str) -> bool {
    status.starts_with(ERROR_STATUS_PREFIX)
}

/// Computed counters for one revision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default)]
    pub classes: u64,
    #[serde(default)]
    pub individuals: u64,
    #[serde(default)]
    pub properties: u64,
    #[serde(default)]
    pub max_depth: u64,
}

/// One class of a revision, as seen by label sampling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEntry {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl LabelEntry {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: Some(label.into()),
        }
    }
}

/// One page of class labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelPage {
    pub items: Vec<LabelEntry>,
    /// Number of the following page, if the source has one.
    pub next_page: Option<u32>,
}
