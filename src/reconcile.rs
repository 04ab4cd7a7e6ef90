//! Reconciliation of recorded upload paths with the repository on disk.
//!
//! Every submission's upload file is expected under
//! `<repository>/<ontology>/<submission id>/`. Files recorded elsewhere are
//! copied into place, records pointing at vanished files are repointed to a
//! file of the same name inside the expected directory, and anything that
//! cannot be found is reported as missing.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::model::{Entity, Revision};
use crate::source::{RevisionStore, SourceError};

/// What happened to one submission's upload path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOutcome {
    /// Recorded file exists inside the expected directory.
    InPlace(PathBuf),
    /// Recorded file existed elsewhere and was copied into place.
    Relocated { from: PathBuf, to: PathBuf },
    /// Record now points at an existing file in the expected directory.
    Repointed { from: PathBuf, to: PathBuf },
    Missing(PathBuf),
    NoUploadPath,
    Failed(String),
}

/// Counts per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub checked: usize,
    pub in_place: usize,
    pub relocated: usize,
    pub repointed: usize,
    pub missing: usize,
    pub no_upload_path: usize,
    pub failed: usize,
}

impl ReconcileSummary {
    fn count(&mut self, outcome: &PathOutcome) {
        self.checked += 1;
        match outcome {
            PathOutcome::InPlace(_) => self.in_place += 1,
            PathOutcome::Relocated { .. } => self.relocated += 1,
            PathOutcome::Repointed { .. } => self.repointed += 1,
            PathOutcome::Missing(_) => self.missing += 1,
            PathOutcome::NoUploadPath => self.no_upload_path += 1,
            PathOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Number of records that changed (or would change in a dry run).
    pub fn changed(&self) -> usize {
        self.relocated + self.repointed
    }
}

/// Walks submissions and fixes their upload paths.
pub struct Reconciler<'a> {
    store: &'a dyn RevisionStore,
    repository: PathBuf,
    filter: Option<BTreeSet<String>>,
    dry_run: bool,
    log_all: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new<P: AsRef<Path>>(store: &'a dyn RevisionStore, repository: P) -> Self {
        Self {
            store,
            repository: repository.as_ref().to_path_buf(),
            filter: None,
            dry_run: false,
            log_all: false,
        }
    }

    /// Log intended changes without copying files or updating records.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Also log submissions that need no change.
    pub fn log_all(mut self, log_all: bool) -> Self {
        self.log_all = log_all;
        self
    }

    pub fn filter(mut self, ids: BTreeSet<String>) -> Self {
        self.filter = if ids.is_empty() { None } else { Some(ids) };
        self
    }

    /// Directory a submission's upload file belongs in.
    pub fn expected_dir(&self, entity: &Entity, revision: &Revision) -> PathBuf {
        self.repository
            .join(&entity.id)
            .join(revision.id.to_string())
    }

    /// Reconcile every submission of every selected ontology.
    ///
    /// Per-submission failures are counted; only listing failures abort.
    pub fn run(&self) -> Result<ReconcileSummary, SourceError> {
        let mut entities = self.store.list_entities(self.filter.as_ref())?;
        if let Some(filter) = &self.filter {
            for id in filter {
                if !entities.iter().any(|e| &e.id == id) {
                    warn!(ontology = %id, "unknown ontology, skipping");
                }
            }
        }
        entities.sort_by_key(|e| e.id.to_lowercase());

        let mut summary = ReconcileSummary::default();
        for entity in &entities {
            let revisions = match self.store.load_revisions(entity) {
                Ok(revisions) => revisions,
                Err(e) => {
                    error!(ontology = %entity.id, error = %e, "failed to load submissions");
                    continue;
                }
            };
            for revision in &revisions {
                let outcome = self.reconcile_revision(entity, revision);
                self.log_outcome(entity, revision, &outcome);
                summary.count(&outcome);
            }
        }

        if !self.dry_run && summary.changed() > 0 {
            self.store.flush()?;
        }

        info!(
            checked = summary.checked,
            in_place = summary.in_place,
            relocated = summary.relocated,
            repointed = summary.repointed,
            missing = summary.missing,
            failed = summary.failed,
            dry_run = self.dry_run,
            "reconciliation finished"
        );
        Ok(summary)
    }

    /// Decide, and unless dry-running apply, the fix for one submission.
    pub fn reconcile_revision(&self, entity: &Entity, revision: &Revision) -> PathOutcome {
        let Some(recorded) = &revision.upload_file_path else {
            return PathOutcome::NoUploadPath;
        };
        let recorded = self.resolve(recorded);
        let expected_dir = self.expected_dir(entity, revision);

        if recorded.is_file() {
            if recorded.starts_with(&expected_dir) {
                return PathOutcome::InPlace(recorded);
            }
            let Some(name) = recorded.file_name() else {
                return PathOutcome::Failed(format!("{} has no file name", recorded.display()));
            };
            let target = expected_dir.join(name);
            if target.is_file() {
                return self.repoint(entity, revision, recorded, target);
            }
            return self.relocate(entity, revision, recorded, target);
        }

        match find_by_name(&expected_dir, &recorded) {
            Some(found) => self.repoint(entity, revision, recorded, found),
            None => PathOutcome::Missing(recorded),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_relative() {
            self.repository.join(path)
        } else {
            path.to_path_buf()
        }
    }

    fn relocate(
        &self,
        entity: &Entity,
        revision: &Revision,
        from: PathBuf,
        to: PathBuf,
    ) -> PathOutcome {
        if !self.dry_run {
            if let Some(dir) = to.parent() {
                if let Err(e) = fs::create_dir_all(dir) {
                    return PathOutcome::Failed(format!("create {}: {}", dir.display(), e));
                }
            }
            if let Err(e) = fs::copy(&from, &to) {
                return PathOutcome::Failed(format!(
                    "copy {} -> {}: {}",
                    from.display(),
                    to.display(),
                    e
                ));
            }
            if let Err(e) = self.store.update_upload_path(entity, revision.id, &to) {
                return PathOutcome::Failed(e.to_string());
            }
        }
        PathOutcome::Relocated { from, to }
    }

    fn repoint(
        &self,
        entity: &Entity,
        revision: &Revision,
        from: PathBuf,
        to: PathBuf,
    ) -> PathOutcome {
        if !self.dry_run {
            if let Err(e) = self.store.update_upload_path(entity, revision.id, &to) {
                return PathOutcome::Failed(e.to_string());
            }
        }
        PathOutcome::Repointed { from, to }
    }

    fn log_outcome(&self, entity: &Entity, revision: &Revision, outcome: &PathOutcome) {
        let mode = if self.dry_run { "would" } else { "did" };
        match outcome {
            PathOutcome::InPlace(path) => {
                if self.log_all {
                    info!(ontology = %entity.id, submission = revision.id, path = %path.display(), "upload path ok");
                }
            }
            PathOutcome::Relocated { from, to } => info!(
                ontology = %entity.id,
                submission = revision.id,
                from = %from.display(),
                to = %to.display(),
                "{} relocate upload file", mode
            ),
            PathOutcome::Repointed { from, to } => info!(
                ontology = %entity.id,
                submission = revision.id,
                from = %from.display(),
                to = %to.display(),
                "{} repoint upload path", mode
            ),
            PathOutcome::Missing(path) => error!(
                ontology = %entity.id,
                submission = revision.id,
                path = %path.display(),
                "upload file missing"
            ),
            PathOutcome::NoUploadPath => {
                if self.log_all {
                    info!(ontology = %entity.id, submission = revision.id, "no upload path recorded");
                }
            }
            PathOutcome::Failed(reason) => error!(
                ontology = %entity.id,
                submission = revision.id,
                reason = %reason,
                "failed to reconcile upload path"
            ),
        }
    }
}

/// First file under `dir` sharing `recorded`'s file name.
fn find_by_name(dir: &Path, recorded: &Path) -> Option<PathBuf> {
    let name = recorded.file_name()?;
    if !dir.is_dir() {
        return None;
    }
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| e.file_type().is_file() && e.file_name() == name)
        .map(|e| e.into_path())
}
