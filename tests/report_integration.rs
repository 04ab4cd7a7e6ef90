//! Integration tests for the full audit run.
//!
//! These tests run the report runner against the metadata snapshot in
//! testdata/ with in-memory index clients standing in for the HTTP ones.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use ontocheck::audit::{
    AuditContext, CheckError, CheckRegistry, Finding, FindingValue, Payload, ReportRunner,
    RevisionCheck, RunError, LOAD_SUBMISSIONS,
};
use ontocheck::config::Config;
use ontocheck::index::{IndexClient, IndexError};
use ontocheck::model::{Entity, LabelPage, Metrics, Revision};
use ontocheck::report::{JsonFileSink, Report, ReportEntry, ReportSink};
use ontocheck::source::{EntitySource, SnapshotSource, SourceError};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn snapshot() -> SnapshotSource {
    SnapshotSource::open(testdata_path().join("metadata.json")).expect("should open snapshot")
}

/// Index double answering every query with the same hit count.
struct FixedHits {
    name: &'static str,
    hits: u64,
    queries: Arc<Mutex<Vec<(String, String)>>>,
}

impl FixedHits {
    fn new(name: &'static str, hits: u64) -> Self {
        Self {
            name,
            hits,
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl IndexClient for FixedHits {
    fn name(&self) -> &'static str {
        self.name
    }

    fn query(&self, text: &str, scope: &str) -> Result<u64, IndexError> {
        self.queries
            .lock()
            .unwrap()
            .push((text.to_string(), scope.to_string()));
        Ok(self.hits)
    }
}

struct TimingOut;

impl IndexClient for TimingOut {
    fn name(&self) -> &'static str {
        "search"
    }

    fn query(&self, _text: &str, _scope: &str) -> Result<u64, IndexError> {
        Err(IndexError::Timeout)
    }
}

/// Structural check that cannot reach its store.
struct Unreachable;

impl RevisionCheck for Unreachable {
    fn name(&self) -> &'static str {
        "unreachable"
    }

    fn run(
        &self,
        _ctx: &AuditContext,
        _entity: &Entity,
        _revision: &Revision,
    ) -> Result<Option<Finding>, CheckError> {
        Err(SourceError::Unavailable("store offline".to_string()).into())
    }
}

/// Snapshot whose submissions of one ontology cannot be loaded.
struct BrokenSubmissions {
    inner: SnapshotSource,
    broken: &'static str,
}

impl EntitySource for BrokenSubmissions {
    fn list_entities(&self, filter: Option<&BTreeSet<String>>) -> Result<Vec<Entity>, SourceError> {
        self.inner.list_entities(filter)
    }

    fn load_revisions(&self, entity: &Entity) -> Result<Vec<Revision>, SourceError> {
        if entity.id == self.broken {
            return Err(SourceError::Unavailable("store offline".to_string()));
        }
        self.inner.load_revisions(entity)
    }

    fn load_metrics(
        &self,
        entity: &Entity,
        revision: &Revision,
    ) -> Result<Option<Metrics>, SourceError> {
        self.inner.load_metrics(entity, revision)
    }

    fn count_roots(&self, entity: &Entity, revision: &Revision) -> Result<usize, SourceError> {
        self.inner.count_roots(entity, revision)
    }

    fn load_labels(
        &self,
        entity: &Entity,
        revision: &Revision,
        page: u32,
        page_size: usize,
    ) -> Result<LabelPage, SourceError> {
        self.inner.load_labels(entity, revision, page, page_size)
    }
}

fn context() -> AuditContext {
    AuditContext::new(Box::new(snapshot()))
        .with_annotator(Box::new(FixedHits::new("annotator", 50)))
        .with_search(Box::new(FixedHits::new("search", 50)))
}

fn run(ctx: AuditContext) -> Report {
    ReportRunner::new(ctx).run().expect("run should succeed")
}

fn entry<'r>(report: &'r Report, id: &str) -> &'r ReportEntry {
    report
        .get(id)
        .unwrap_or_else(|| panic!("missing entry for {}", id))
}

fn codes(entry: &ReportEntry) -> Vec<&str> {
    entry.findings.keys().map(String::as_str).collect()
}

#[test]
fn test_every_listed_ontology_has_an_entry() {
    let report = run(context());
    let ids: Vec<&str> = report.ontologies.keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["ACR", "BRO", "DOID", "EFO", "FMA", "GO", "cno"]);
}

#[test]
fn test_healthy_ontology_has_no_problem() {
    let report = run(context());
    let acr = entry(&report, "ACR");
    assert!(!acr.problem, "unexpected findings: {:?}", acr.findings);
    assert!(acr.findings.is_empty());
    assert_eq!(acr.log_file_path, "/srv/repository/ACR/5/parsing.log");
}

#[test]
fn test_sample_skips_unusable_labels_and_is_capped() {
    let annotator = FixedHits::new("annotator", 50);
    let queries = Arc::clone(&annotator.queries);
    let ctx = AuditContext::new(Box::new(snapshot())).with_annotator(Box::new(annotator));
    let runner = ReportRunner::new(ctx).filter(BTreeSet::from(["ACR".to_string()]));
    runner.run().unwrap();

    let queries = queries.lock().unwrap();
    assert_eq!(queries.len(), 1);
    let (text, scope) = &queries[0];
    assert_eq!(scope, "ACR");
    assert_eq!(
        text,
        "Heart Lung Kidney Liver Brain Spleen Stomach Pancreas Bladder Colon"
    );
}

#[test]
fn test_newer_failed_submission_reports_staleness_only() {
    let report = run(context());
    let bro = entry(&report, "BRO");
    assert!(bro.problem);
    assert_eq!(codes(bro), vec!["errNoLatestReadySubmission"]);
    assert_eq!(
        bro.findings["errNoLatestReadySubmission"].as_text(),
        Some("The latest submission is not ready and is ahead of the latest ready by 1 revision")
    );
    assert_eq!(bro.log_file_path, "/srv/repository/BRO/4/parsing.log");
}

#[test]
fn test_no_submissions() {
    let report = run(context());
    let cno = entry(&report, "cno");
    assert!(cno.problem);
    assert_eq!(codes(cno), vec!["errNoSubmissions"]);
    assert_eq!(cno.log_file_path, "");
}

#[test]
fn test_summary_only() {
    let report = run(context());

    let doid = entry(&report, "DOID");
    assert!(!doid.problem);
    assert_eq!(codes(doid), vec!["summaryOnly"]);

    let efo = entry(&report, "EFO");
    assert!(efo.problem);
    assert_eq!(codes(efo), vec!["errSummaryOnlyWithSubmissions"]);
}

#[test]
fn test_no_ready_submission_copies_error_statuses() {
    let report = run(context());
    let fma = entry(&report, "FMA");
    assert!(fma.problem);
    assert_eq!(codes(fma), vec!["errErrorStatus", "errNoReadySubmission"]);
    assert_eq!(
        fma.findings["errErrorStatus"].as_list(),
        Some(
            &[
                Payload::text("ERROR_RDF"),
                Payload::text("ERROR_RDF_LABELS")
            ][..]
        )
    );
}

#[test]
fn test_empty_ready_submission() {
    let report = run(context());
    let go = entry(&report, "GO");
    assert!(go.problem);
    assert_eq!(
        codes(go),
        vec![
            "errMissingStatus",
            "errNoClassesLatestReadySubmission",
            "errNoMetricsLatestReadySubmission",
            "errNoRootsLatestReadySubmission",
        ]
    );
    assert_eq!(
        go.findings["errMissingStatus"].as_list(),
        Some(&[Payload::text("INDEXED")][..])
    );
}

#[test]
fn test_index_misses_are_reported() {
    let ctx = AuditContext::new(Box::new(snapshot()))
        .with_annotator(Box::new(FixedHits::new("annotator", 3)))
        .with_search(Box::new(FixedHits::new("search", 0)));
    let report = run(ctx);
    let acr = entry(&report, "ACR");
    assert!(acr.problem);

    let annotator = acr.findings["errNoAnnotator"].as_text().unwrap();
    assert!(annotator.starts_with("Annotator - FEW results for: Heart Lung"));
    let search = acr.findings["errNoSearch"].as_text().unwrap();
    assert!(search.starts_with("Search - NO results for: Heart Lung"));
}

#[test]
fn test_failing_checks_become_findings() {
    let mut checks = CheckRegistry::with_default_checks();
    checks.register(Box::new(Unreachable));
    let ctx = AuditContext::new(Box::new(snapshot()))
        .with_checks(checks)
        .with_annotator(Box::new(FixedHits::new("annotator", 50)))
        .with_search(Box::new(TimingOut));
    let report = run(ctx);

    let acr = entry(&report, "ACR");
    assert!(acr.problem);
    assert_eq!(codes(acr), vec!["errRunningReport"]);
    let failures = acr.findings["errRunningReport"].as_list().unwrap();
    assert_eq!(
        failures,
        &[
            Payload::Failure {
                check: "unreachable".to_string(),
                kind: "source.unavailable".to_string(),
                message: "metadata store unavailable: store offline".to_string(),
            },
            Payload::Failure {
                check: "search".to_string(),
                kind: "index.timeout".to_string(),
                message: "request timed out".to_string(),
            },
        ][..]
    );
}

#[test]
fn test_unknown_filter_ids_are_skipped() {
    let filter = BTreeSet::from(["ACR".to_string(), "NOPE".to_string()]);
    let report = ReportRunner::new(context()).filter(filter).run().unwrap();
    let ids: Vec<&str> = report.ontologies.keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["ACR"]);
}

#[test]
fn test_parallel_run_matches_sequential() {
    let sequential = run(context());
    let parallel = ReportRunner::new(context()).workers(4).run().unwrap();
    assert_eq!(parallel.ontologies, sequential.ontologies);
}

#[test]
fn test_cancelled_run_produces_no_report() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("ontologies_report.json");

    let runner = ReportRunner::new(context());
    runner.cancel_handle().store(true, Ordering::SeqCst);
    let err = runner.run_to(&JsonFileSink::new(&path)).unwrap_err();
    assert!(matches!(err, RunError::Cancelled));
    assert!(!path.exists());
}

#[test]
fn test_sink_failure_propagates() {
    let temp = tempfile::TempDir::new().unwrap();
    let blocker = temp.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let runner = ReportRunner::new(context());
    let err = runner
        .run_to(&JsonFileSink::new(blocker.join("report.json")))
        .unwrap_err();
    assert!(matches!(err, RunError::Sink(_)));
}

#[test]
fn test_report_file_replaces_previous() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("ontologies_report.json");
    std::fs::write(&path, "{ \"stale\": true }").unwrap();

    let sink = JsonFileSink::new(&path);
    let written = ReportRunner::new(context()).run_to(&sink).unwrap();
    assert_eq!(sink.describe(), path.display().to_string());

    let loaded = Report::read_file(&path).unwrap();
    assert_eq!(loaded, written);
    assert_eq!(loaded.problem_count(), 5);
    assert!(matches!(
        loaded.get("GO").unwrap().findings["errMissingStatus"],
        FindingValue::List(_)
    ));
}

#[test]
fn test_fixture_config_drives_context() {
    let config = Config::parse_file(testdata_path().join("ontocheck.yaml")).unwrap();
    ontocheck::config::validate(&config).unwrap();
    assert_eq!(config.workers, 2);
    assert!(config.search.active_url().is_none());

    let ctx = AuditContext::new(Box::new(snapshot())).with_config(&config);
    assert_eq!(ctx.sampling.extra_stop_words, vec!["organ".to_string()]);
    assert!(!ctx.has_indexes());

    let report = ReportRunner::new(ctx)
        .workers(config.workers)
        .run()
        .unwrap();
    assert!(!entry(&report, "ACR").problem);
}

#[test]
fn test_unloadable_submissions_are_a_problem() {
    let source = BrokenSubmissions {
        inner: snapshot(),
        broken: "ACR",
    };
    let ctx = AuditContext::new(Box::new(source))
        .with_annotator(Box::new(FixedHits::new("annotator", 50)));
    let report = run(ctx);

    let acr = entry(&report, "ACR");
    assert!(acr.problem);
    assert_eq!(codes(acr), vec!["errRunningReport"]);
    assert_eq!(
        acr.findings["errRunningReport"].as_list(),
        Some(
            &[Payload::Failure {
                check: LOAD_SUBMISSIONS.to_string(),
                kind: "source.unavailable".to_string(),
                message: "metadata store unavailable: store offline".to_string(),
            }][..]
        )
    );
    assert_eq!(acr.log_file_path, "");

    assert!(!entry(&report, "DOID").problem);
    assert_eq!(codes(entry(&report, "BRO")), vec!["errNoLatestReadySubmission"]);
}
