//! Checks run against one ontology.
//!
//! The first five checks are fixed and may abort the pipeline for the
//! ontology. Structural checks are registered in a [`CheckRegistry`], run
//! against the latest ready submission, and never abort: a check that fails
//! to execute is turned into an `errRunningReport` finding by the pipeline.

use thiserror::Error;

use super::context::AuditContext;
use super::types::{Finding, FindingCode, Payload};
use crate::config::StatusConfig;
use crate::index::{IndexClient, IndexError};
use crate::model::{Entity, Revision};
use crate::source::SourceError;

/// Result of a pipeline check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Record the findings and run the next check.
    Continue(Vec<Finding>),
    /// Record the findings and stop auditing this ontology.
    Abort(Vec<Finding>),
}

impl CheckOutcome {
    pub fn pass() -> Self {
        CheckOutcome::Continue(Vec::new())
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, CheckOutcome::Abort(_))
    }

    pub fn findings(&self) -> &[Finding] {
        match self {
            CheckOutcome::Continue(findings) | CheckOutcome::Abort(findings) => findings,
        }
    }

    pub fn into_findings(self) -> Vec<Finding> {
        match self {
            CheckOutcome::Continue(findings) | CheckOutcome::Abort(findings) => findings,
        }
    }
}

/// Error raised while executing a structural or index check.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

impl CheckError {
    /// Classification such as `index.timeout` or `source.unavailable`.
    pub fn kind(&self) -> String {
        match self {
            CheckError::Source(e) => format!("source.{}", e.kind()),
            CheckError::Index(e) => format!("index.{}", e.kind()),
        }
    }

    /// The finding recorded when check `name` fails with this error.
    pub fn into_finding(self, name: &str) -> Finding {
        Finding::with(
            FindingCode::CheckFailed,
            Payload::Failure {
                check: name.to_string(),
                kind: self.kind(),
                message: self.to_string(),
            },
        )
    }
}

// -----------------------------------------------------------------------------
// Fixed checks
// -----------------------------------------------------------------------------

/// Summary-only ontologies are not audited further.
pub fn check_skip(entity: &Entity, revisions: &[Revision]) -> CheckOutcome {
    if !entity.summary_only {
        return CheckOutcome::pass();
    }
    if revisions.is_empty() {
        CheckOutcome::Abort(vec![Finding::new(FindingCode::SummaryOnly)])
    } else {
        CheckOutcome::Abort(vec![Finding::new(FindingCode::SummaryOnlyWithSubmissions)])
    }
}

pub fn check_existence(revisions: &[Revision]) -> CheckOutcome {
    if revisions.is_empty() {
        CheckOutcome::Abort(vec![Finding::new(FindingCode::NoSubmissions)])
    } else {
        CheckOutcome::pass()
    }
}

/// Latest submission overall and latest ready submission.
#[derive(Debug, Clone, Copy, Default)]
pub struct Selection<'r> {
    pub latest_any: Option<&'r Revision>,
    pub latest_ready: Option<&'r Revision>,
}

/// Pick the latest and latest ready submissions by sequence id.
///
/// Equal ids resolve to the one listed last.
pub fn select_revisions<'r>(revisions: &'r [Revision], ready: &[String]) -> Selection<'r> {
    let mut selection = Selection::default();
    for revision in revisions {
        if selection.latest_any.map_or(true, |r| revision.id >= r.id) {
            selection.latest_any = Some(revision);
        }
        if revision.is_ready(ready) && selection.latest_ready.map_or(true, |r| revision.id >= r.id)
        {
            selection.latest_ready = Some(revision);
        }
    }
    selection
}

/// Abort when no submission is ready, reporting the latest one's error statuses.
pub fn check_readiness(selection: &Selection<'_>) -> CheckOutcome {
    if selection.latest_ready.is_some() {
        return CheckOutcome::pass();
    }
    let mut findings = vec![Finding::new(FindingCode::NoReadySubmission)];
    if let Some(latest) = selection.latest_any {
        findings.extend(
            latest
                .error_statuses()
                .map(|s| Finding::with(FindingCode::ErrorStatus, Payload::text(s))),
        );
    }
    CheckOutcome::Abort(findings)
}

/// Number of submissions newer than the latest ready one.
pub fn revisions_ahead(revisions: &[Revision], ready: &Revision) -> u64 {
    revisions.iter().filter(|r| r.id > ready.id).count() as u64
}

pub fn check_staleness(revisions: &[Revision], selection: &Selection<'_>) -> CheckOutcome {
    match (selection.latest_any, selection.latest_ready) {
        (Some(latest), Some(ready)) if latest.id != ready.id => {
            CheckOutcome::Continue(vec![Finding::with(
                FindingCode::LatestReadyBehind,
                Payload::Count(revisions_ahead(revisions, ready)),
            )])
        }
        _ => CheckOutcome::pass(),
    }
}

/// Error statuses present and required statuses absent on a submission.
pub fn check_status_completeness(revision: &Revision, statuses: &StatusConfig) -> CheckOutcome {
    let mut findings: Vec<Finding> = revision
        .error_statuses()
        .map(|s| Finding::with(FindingCode::ErrorStatus, Payload::text(s)))
        .collect();
    findings.extend(
        statuses
            .required()
            .filter(|s| !revision.has_status(s))
            .map(|s| Finding::with(FindingCode::MissingStatus, Payload::text(s))),
    );
    CheckOutcome::Continue(findings)
}

// -----------------------------------------------------------------------------
// Structural checks
// -----------------------------------------------------------------------------

/// A non-fatal check of the latest ready submission.
pub trait RevisionCheck: Send + Sync {
    /// Name recorded in `errRunningReport` when the check fails.
    fn name(&self) -> &'static str;

    fn run(
        &self,
        ctx: &AuditContext,
        entity: &Entity,
        revision: &Revision,
    ) -> Result<Option<Finding>, CheckError>;
}

/// Ordered set of structural checks.
#[derive(Default)]
pub struct CheckRegistry {
    checks: Vec<Box<dyn RevisionCheck>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in structural checks.
    pub fn with_default_checks() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ClassesCheck));
        registry.register(Box::new(RootsCheck));
        registry.register(Box::new(MetricsPresentCheck));
        registry.register(Box::new(MetricsSanityCheck));
        registry
    }

    pub fn register(&mut self, check: Box<dyn RevisionCheck>) {
        self.checks.push(check);
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn RevisionCheck> {
        self.checks.iter().map(|c| c.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

/// The submission must expose at least one class.
pub struct ClassesCheck;

impl RevisionCheck for ClassesCheck {
    fn name(&self) -> &'static str {
        "classes"
    }

    fn run(
        &self,
        ctx: &AuditContext,
        entity: &Entity,
        revision: &Revision,
    ) -> Result<Option<Finding>, CheckError> {
        let page = ctx.source.load_labels(entity, revision, 1, 1)?;
        Ok(page
            .items
            .is_empty()
            .then(|| Finding::new(FindingCode::NoClasses)))
    }
}

pub struct RootsCheck;

impl RevisionCheck for RootsCheck {
    fn name(&self) -> &'static str {
        "roots"
    }

    fn run(
        &self,
        ctx: &AuditContext,
        entity: &Entity,
        revision: &Revision,
    ) -> Result<Option<Finding>, CheckError> {
        let roots = ctx.source.count_roots(entity, revision)?;
        Ok((roots == 0).then(|| Finding::new(FindingCode::NoRoots)))
    }
}

pub struct MetricsPresentCheck;

impl RevisionCheck for MetricsPresentCheck {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn run(
        &self,
        ctx: &AuditContext,
        entity: &Entity,
        revision: &Revision,
    ) -> Result<Option<Finding>, CheckError> {
        let metrics = ctx.source.load_metrics(entity, revision)?;
        Ok(metrics
            .is_none()
            .then(|| Finding::new(FindingCode::NoMetrics)))
    }
}

/// Classes plus properties must reach the configured minimum.
pub struct MetricsSanityCheck;

impl RevisionCheck for MetricsSanityCheck {
    fn name(&self) -> &'static str {
        "metrics_sanity"
    }

    fn run(
        &self,
        ctx: &AuditContext,
        entity: &Entity,
        revision: &Revision,
    ) -> Result<Option<Finding>, CheckError> {
        let Some(metrics) = ctx.source.load_metrics(entity, revision)? else {
            return Ok(None);
        };
        let total = metrics.classes.saturating_add(metrics.properties);
        Ok((total < ctx.metrics.min_total).then(|| Finding::new(FindingCode::IncorrectMetrics)))
    }
}

// -----------------------------------------------------------------------------
// Index consistency
// -----------------------------------------------------------------------------

/// Query an index with the sampled labels and flag too few hits.
pub fn check_index(
    client: &dyn IndexClient,
    code: FindingCode,
    entity: &Entity,
    sample: &[String],
) -> Result<Option<Finding>, CheckError> {
    let text = sample.join(" ");
    let found = client.query(&text, &entity.id)?;
    if found < sample.len() as u64 {
        Ok(Some(Finding::with(code, Payload::Hits { found, text })))
    } else {
        Ok(None)
    }
}
