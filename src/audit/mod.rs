//! Sanity audit of ontologies.

mod checks;
mod context;
mod findings;
mod pipeline;
mod runner;
mod sample;
mod types;

pub use checks::{
    check_existence, check_index, check_readiness, check_skip, check_staleness,
    check_status_completeness, revisions_ahead, select_revisions, CheckError, CheckOutcome,
    CheckRegistry, ClassesCheck, MetricsPresentCheck, MetricsSanityCheck, RevisionCheck,
    RootsCheck, Selection,
};
pub use context::AuditContext;
pub use findings::{FindingAccumulator, FindingValue};
pub use pipeline::{audit_entity, EntityAudit};
pub use runner::{ReportRunner, RunError, LOAD_SUBMISSIONS};
pub use sample::{is_anonymous_id, is_stop_word, sample_labels, usable_label};
pub use types::{Finding, FindingCode, FindingPolicy, Payload};
