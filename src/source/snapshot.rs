//! JSON export of the metadata store.
//!
//! Layout:
//!
//! ```json
//! { "ontologies": [
//!     { "id": "ACR", "summary_only": false,
//!       "submissions": [
//!         { "id": 3, "statuses": ["UPLOADED", "RDF"],
//!           "upload_file_path": "/srv/repo/ACR/3/acr.owl",
//!           "metrics": { "classes": 20, "properties": 5 },
//!           "roots": 2,
//!           "classes": [ { "id": "http://x/A", "label": "Alpha" } ] } ] } ] }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::{EntitySource, RevisionStore, SourceError};
use crate::model::{Entity, LabelEntry, LabelPage, Metrics, Revision};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    ontologies: Vec<SnapshotOntology>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotOntology {
    #[serde(flatten)]
    entity: Entity,
    #[serde(default)]
    submissions: Vec<SnapshotSubmission>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotSubmission {
    #[serde(flatten)]
    revision: Revision,
    #[serde(default)]
    metrics: Option<Metrics>,
    #[serde(default)]
    roots: usize,
    #[serde(default)]
    classes: Vec<LabelEntry>,
}

/// [`EntitySource`] backed by a snapshot file.
pub struct SnapshotSource {
    path: Option<PathBuf>,
    data: RwLock<Snapshot>,
}

impl SnapshotSource {
    /// Load a snapshot file. Updates are written back to the same file on flush.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let content = fs::read_to_string(path.as_ref())?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;
        Ok(Self {
            path: Some(path.as_ref().to_path_buf()),
            data: RwLock::new(snapshot),
        })
    }

    /// Build an in-memory snapshot. Flushing it is a no-op.
    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        Ok(Self {
            path: None,
            data: RwLock::new(snapshot),
        })
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Snapshot>, SourceError> {
        self.data
            .read()
            .map_err(|_| SourceError::Unavailable("snapshot lock poisoned".to_string()))
    }

    fn with_submission<T>(
        &self,
        entity: &Entity,
        revision: u32,
        f: impl FnOnce(&SnapshotSubmission) -> T,
    ) -> Result<T, SourceError> {
        let data = self.read()?;
        let ontology = data
            .ontologies
            .iter()
            .find(|o| o.entity.id == entity.id)
            .ok_or_else(|| SourceError::UnknownEntity(entity.id.clone()))?;
        let submission = ontology
            .submissions
            .iter()
            .rev()
            .find(|s| s.revision.id == revision)
            .ok_or_else(|| SourceError::UnknownRevision {
                entity: entity.id.clone(),
                revision,
            })?;
        Ok(f(submission))
    }
}

impl EntitySource for SnapshotSource {
    fn list_entities(&self, filter: Option<&BTreeSet<String>>) -> Result<Vec<Entity>, SourceError> {
        let data = self.read()?;
        Ok(data
            .ontologies
            .iter()
            .filter(|o| filter.map_or(true, |f| f.contains(&o.entity.id)))
            .map(|o| o.entity.clone())
            .collect())
    }

    fn load_revisions(&self, entity: &Entity) -> Result<Vec<Revision>, SourceError> {
        let data = self.read()?;
        let ontology = data
            .ontologies
            .iter()
            .find(|o| o.entity.id == entity.id)
            .ok_or_else(|| SourceError::UnknownEntity(entity.id.clone()))?;
        Ok(ontology
            .submissions
            .iter()
            .map(|s| s.revision.clone())
            .collect())
    }

    fn load_metrics(
        &self,
        entity: &Entity,
        revision: &Revision,
    ) -> Result<Option<Metrics>, SourceError> {
        self.with_submission(entity, revision.id, |s| s.metrics)
    }

    fn count_roots(&self, entity: &Entity, revision: &Revision) -> Result<usize, SourceError> {
        self.with_submission(entity, revision.id, |s| s.roots)
    }

    fn load_labels(
        &self,
        entity: &Entity,
        revision: &Revision,
        page: u32,
        page_size: usize,
    ) -> Result<LabelPage, SourceError> {
        let page_size = page_size.max(1);
        self.with_submission(entity, revision.id, |s| {
            let start = (page.max(1) as usize - 1).saturating_mul(page_size);
            let end = start.saturating_add(page_size).min(s.classes.len());
            let items = if start < end {
                s.classes[start..end].to_vec()
            } else {
                Vec::new()
            };
            let next_page = if end < s.classes.len() {
                Some(page.max(1) + 1)
            } else {
                None
            };
            LabelPage { items, next_page }
        })
    }
}

impl RevisionStore for SnapshotSource {
    fn update_upload_path(
        &self,
        entity: &Entity,
        revision_id: u32,
        path: &Path,
    ) -> Result<(), SourceError> {
        let mut data = self
            .data
            .write()
            .map_err(|_| SourceError::Unavailable("snapshot lock poisoned".to_string()))?;
        let ontology = data
            .ontologies
            .iter_mut()
            .find(|o| o.entity.id == entity.id)
            .ok_or_else(|| SourceError::UnknownEntity(entity.id.clone()))?;
        let submission = ontology
            .submissions
            .iter_mut()
            .rev()
            .find(|s| s.revision.id == revision_id)
            .ok_or_else(|| SourceError::UnknownRevision {
                entity: entity.id.clone(),
                revision: revision_id,
            })?;
        submission.revision.upload_file_path = Some(path.to_path_buf());
        Ok(())
    }

    fn flush(&self) -> Result<(), SourceError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&*self.read()?)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "ontologies": [
            { "id": "ACR", "submissions": [
                { "id": 1, "statuses": ["UPLOADED"], "roots": 3,
                  "classes": [
                    { "id": "a", "label": "one" },
                    { "id": "b", "label": "two" },
                    { "id": "c", "label": "three" } ] } ] },
            { "id": "SUM", "summary_only": true }
        ]
    }"#;

    #[test]
    fn test_list_with_filter() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        assert_eq!(source.list_entities(None).unwrap().len(), 2);

        let filter: BTreeSet<String> = ["SUM".to_string(), "NOPE".to_string()].into();
        let listed = source.list_entities(Some(&filter)).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].summary_only);
    }

    #[test]
    fn test_label_paging() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        let entity = Entity::new("ACR");
        let rev = source.load_revisions(&entity).unwrap().remove(0);

        let first = source.load_labels(&entity, &rev, 1, 2).unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_page, Some(2));

        let second = source.load_labels(&entity, &rev, 2, 2).unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.next_page, None);

        assert!(source.load_labels(&entity, &rev, 5, 2).unwrap().items.is_empty());
    }

    #[test]
    fn test_unknown_revision() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        let err = source
            .count_roots(&Entity::new("ACR"), &Revision::new(9, &[]))
            .unwrap_err();
        assert_eq!(err.kind(), "unknown_revision");
    }

    #[test]
    fn test_update_upload_path() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        let entity = Entity::new("ACR");
        source
            .update_upload_path(&entity, 1, Path::new("/repo/ACR/1/acr.owl"))
            .unwrap();
        let rev = source.load_revisions(&entity).unwrap().remove(0);
        assert_eq!(rev.upload_file_path, Some(PathBuf::from("/repo/ACR/1/acr.owl")));
        source.flush().unwrap();
    }
}
