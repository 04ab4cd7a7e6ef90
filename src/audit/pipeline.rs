//! Per-ontology audit pipeline.

use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use super::checks::{
    check_existence, check_index, check_readiness, check_skip, check_staleness,
    check_status_completeness, select_revisions, CheckError, CheckOutcome,
};
use super::context::AuditContext;
use super::findings::FindingAccumulator;
use super::sample::sample_labels;
use super::types::FindingCode;
use crate::model::{Entity, Revision};
use crate::source::SourceError;

/// Outcome of auditing one ontology.
#[derive(Debug, Clone, Default)]
pub struct EntityAudit {
    pub entity_id: String,
    pub findings: FindingAccumulator,
    /// Parse log of the latest submission.
    pub log_file_path: Option<PathBuf>,
    pub duration: Duration,
}

impl EntityAudit {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            ..Default::default()
        }
    }

    pub fn problem(&self) -> bool {
        self.findings.problem()
    }
}

/// Record an outcome; true when the pipeline must stop.
fn apply(findings: &mut FindingAccumulator, outcome: CheckOutcome) -> bool {
    let abort = outcome.is_abort();
    findings.extend(outcome.into_findings());
    abort
}

/// Run every check against one ontology, recording into `audit`.
///
/// Failures of structural and index checks are recorded as findings. An
/// error returned here comes from loading the submissions themselves and is
/// left to the caller to record; the findings recorded so far stay in
/// `audit`.
pub fn audit_entity(
    ctx: &AuditContext,
    entity: &Entity,
    audit: &mut EntityAudit,
) -> Result<(), SourceError> {
    let revisions = ctx.source.load_revisions(entity)?;
    let selection = select_revisions(&revisions, &ctx.statuses.ready);
    audit.log_file_path = selection
        .latest_any
        .and_then(|r| r.log_file_path.clone());

    let findings = &mut audit.findings;
    if apply(findings, check_skip(entity, &revisions))
        || apply(findings, check_existence(&revisions))
        || apply(findings, check_readiness(&selection))
    {
        return Ok(());
    }
    let Some(ready) = selection.latest_ready else {
        return Ok(());
    };

    apply(findings, check_staleness(&revisions, &selection));
    apply(findings, check_status_completeness(ready, &ctx.statuses));

    run_structural_checks(ctx, entity, ready, findings);
    run_index_checks(ctx, entity, ready, findings);
    Ok(())
}

fn run_structural_checks(
    ctx: &AuditContext,
    entity: &Entity,
    revision: &Revision,
    findings: &mut FindingAccumulator,
) {
    for check in ctx.checks.iter() {
        match check.run(ctx, entity, revision) {
            Ok(Some(finding)) => findings.record_finding(finding),
            Ok(None) => {}
            Err(e) => {
                debug!(ontology = %entity.id, check = check.name(), error = %e, "check failed");
                findings.record_finding(e.into_finding(check.name()));
            }
        }
    }
}

fn run_index_checks(
    ctx: &AuditContext,
    entity: &Entity,
    revision: &Revision,
    findings: &mut FindingAccumulator,
) {
    if !ctx.has_indexes() {
        return;
    }

    let sample = match sample_labels(&*ctx.source, entity, revision, &ctx.sampling) {
        Ok(sample) => sample,
        Err(e) => {
            findings.record_finding(CheckError::from(e).into_finding("label_sample"));
            return;
        }
    };
    if sample.is_empty() {
        debug!(ontology = %entity.id, "no usable labels, skipping index checks");
        return;
    }

    let indexes = [
        (ctx.annotator.as_deref(), FindingCode::NoAnnotator),
        (ctx.search.as_deref(), FindingCode::NoSearch),
    ];
    for (client, code) in indexes {
        let Some(client) = client else {
            continue;
        };
        match check_index(client, code, entity, &sample) {
            Ok(Some(finding)) => findings.record_finding(finding),
            Ok(None) => {}
            Err(e) => {
                debug!(ontology = %entity.id, index = client.name(), error = %e, "index query failed");
                findings.record_finding(e.into_finding(client.name()));
            }
        }
    }
}
