//! Ontocheck - periodic sanity audit of an ontology repository.
//!
//! Ontocheck walks every ontology known to a metadata store, runs a fixed
//! pipeline of checks against its submissions and writes one JSON report
//! keyed by ontology id. A companion command reconciles recorded upload
//! paths with the repository layout on disk.
//!
//! # Architecture
//!
//! - `model`: ontologies, submissions, metrics and label pages
//! - `source`: the metadata store interface and its JSON snapshot adapter
//! - `index`: annotator and search index clients
//! - `audit`: checks, finding accumulation and the report runner
//! - `report`: report document, sinks and terminal output
//! - `reconcile`: upload path reconciliation
//! - `config`: YAML configuration schema
//!
//! # Adding a Check
//!
//! Implement `RevisionCheck` and register it on a `CheckRegistry`; failures
//! it returns are recorded under `errRunningReport`.

pub mod audit;
pub mod cli;
pub mod config;
pub mod index;
pub mod model;
pub mod reconcile;
pub mod report;
pub mod source;

pub use audit::{
    AuditContext, CheckRegistry, EntityAudit, Finding, FindingAccumulator, FindingCode,
    ReportRunner, RevisionCheck, RunError,
};
pub use config::Config;
pub use index::{IndexClient, IndexError};
pub use model::{Entity, LabelEntry, LabelPage, Metrics, Revision};
pub use reconcile::{PathOutcome, ReconcileSummary, Reconciler};
pub use report::{JsonFileSink, Report, ReportEntry, ReportError, ReportSink, SinkError};
pub use source::{EntitySource, RevisionStore, SnapshotSource, SourceError};
