//! Report runner that audits every ontology and assembles the report.

use chrono::Local;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::checks::CheckError;
use super::context::AuditContext;
use super::pipeline::{audit_entity, EntityAudit};
use crate::model::Entity;
use crate::report::{Report, ReportSink, SinkError};
use crate::source::SourceError;

/// Check name recorded when an ontology's submissions cannot be loaded.
pub const LOAD_SUBMISSIONS: &str = "load_submissions";

/// Errors that abort a whole run.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("failed to list ontologies: {0}")]
    Source(#[from] SourceError),
    #[error("run cancelled before completion")]
    Cancelled,
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Audits ontologies and produces a [`Report`].
pub struct ReportRunner {
    ctx: AuditContext,
    filter: Option<BTreeSet<String>>,
    workers: usize,
    cancel: Arc<AtomicBool>,
}

impl ReportRunner {
    pub fn new(ctx: AuditContext) -> Self {
        Self {
            ctx,
            filter: None,
            workers: 1,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Restrict the run to these ontology ids.
    pub fn filter(mut self, ids: BTreeSet<String>) -> Self {
        self.filter = if ids.is_empty() { None } else { Some(ids) };
        self
    }

    /// Number of ontologies audited concurrently.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Use an externally owned cancellation flag.
    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    /// Flag that stops the run before the next ontology when set.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn context(&self) -> &AuditContext {
        &self.ctx
    }

    /// Audit all ontologies and hand the report to `sink`.
    pub fn run_to(&self, sink: &dyn ReportSink) -> Result<Report, RunError> {
        let report = self.run()?;
        sink.write(&report)?;
        info!(destination = %sink.describe(), "report written");
        Ok(report)
    }

    /// Audit all ontologies and return the report.
    pub fn run(&self) -> Result<Report, RunError> {
        let started = Instant::now();
        let entities = self.entities()?;
        let total = entities.len();
        info!(total, workers = self.workers, "auditing ontologies");

        let done = AtomicUsize::new(0);
        let audits: Vec<Option<EntityAudit>> = if self.workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()?;
            pool.install(|| {
                entities
                    .par_iter()
                    .map(|entity| self.audit_one(entity, &done, total))
                    .collect()
            })
        } else {
            entities
                .iter()
                .map(|entity| self.audit_one(entity, &done, total))
                .collect()
        };

        if self.cancel.load(Ordering::SeqCst) {
            warn!(
                completed = done.load(Ordering::SeqCst),
                total, "run cancelled, no report produced"
            );
            return Err(RunError::Cancelled);
        }

        let report = Report::from_audits(Local::now(), audits.into_iter().flatten().collect());
        info!(
            ontologies = report.len(),
            problems = report.problem_count(),
            "audit finished in {:.1}s",
            started.elapsed().as_secs_f64()
        );
        Ok(report)
    }

    /// Entities to audit, sorted case-insensitively, one per id.
    fn entities(&self) -> Result<Vec<Entity>, RunError> {
        let mut entities = self.ctx.source.list_entities(self.filter.as_ref())?;

        if let Some(filter) = &self.filter {
            for id in filter {
                if !entities.iter().any(|e| &e.id == id) {
                    warn!(ontology = %id, "unknown ontology, skipping");
                }
            }
        }

        entities.sort_by(|a, b| {
            a.id.to_lowercase()
                .cmp(&b.id.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        entities.dedup_by(|a, b| a.id == b.id);
        Ok(entities)
    }

    fn audit_one(&self, entity: &Entity, done: &AtomicUsize, total: usize) -> Option<EntityAudit> {
        if self.cancel.load(Ordering::SeqCst) {
            return None;
        }

        let started = Instant::now();
        let mut audit = EntityAudit::new(&entity.id);
        if let Err(e) = audit_entity(&self.ctx, entity, &mut audit) {
            error!(ontology = %entity.id, error = %e, "audit failed, keeping partial findings");
            audit
                .findings
                .record_finding(CheckError::from(e).into_finding(LOAD_SUBMISSIONS));
        }
        audit.duration = started.elapsed();

        let position = done.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            ontology = %entity.id,
            problem = audit.problem(),
            "audited {} of {} in {:.2}s",
            position,
            total,
            audit.duration.as_secs_f64()
        );
        if audit.problem() || self.ctx.log_all {
            let codes: Vec<&str> = audit.findings.codes().map(|c| c.as_str()).collect();
            debug!(ontology = %entity.id, codes = ?codes, "findings");
        }
        Some(audit)
    }
}
