//! Access to the ontology metadata store.
//!
//! The audit reads entities, revisions, metrics and class labels through
//! [`EntitySource`]. The reconciliation tool additionally writes corrected
//! upload paths back through [`RevisionStore`].

mod snapshot;

pub use snapshot::SnapshotSource;

use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

use crate::model::{Entity, LabelPage, Metrics, Revision};

/// Errors raised by a metadata source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed snapshot: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unknown ontology {0:?}")]
    UnknownEntity(String),
    #[error("ontology {entity:?} has no submission {revision}")]
    UnknownRevision { entity: String, revision: u32 },
}

impl SourceError {
    /// Short classification used in check failure findings.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Unavailable(_) => "unavailable",
            SourceError::Io(_) => "io",
            SourceError::Decode(_) => "decode",
            SourceError::UnknownEntity(_) => "unknown_entity",
            SourceError::UnknownRevision { .. } => "unknown_revision",
        }
    }
}

/// Read contract of the metadata store.
///
/// Implementations must be safe to share across audit workers.
pub trait EntitySource: Send + Sync {
    /// List entities in store order, restricted to `filter` when given.
    /// Identifiers in the filter that the store does not know are dropped.
    fn list_entities(&self, filter: Option<&BTreeSet<String>>) -> Result<Vec<Entity>, SourceError>;

    /// Revisions of an entity in store order.
    fn load_revisions(&self, entity: &Entity) -> Result<Vec<Revision>, SourceError>;

    fn load_metrics(
        &self,
        entity: &Entity,
        revision: &Revision,
    ) -> Result<Option<Metrics>, SourceError>;

    /// Number of classification roots of a revision.
    fn count_roots(&self, entity: &Entity, revision: &Revision) -> Result<usize, SourceError>;

    /// One page (1-based) of class labels.
    fn load_labels(
        &self,
        entity: &Entity,
        revision: &Revision,
        page: u32,
        page_size: usize,
    ) -> Result<LabelPage, SourceError>;
}

/// Write-back contract used by path reconciliation.
pub trait RevisionStore: EntitySource {
    fn update_upload_path(
        &self,
        entity: &Entity,
        revision_id: u32,
        path: &Path,
    ) -> Result<(), SourceError>;

    /// Persist pending updates.
    fn flush(&self) -> Result<(), SourceError>;
}
