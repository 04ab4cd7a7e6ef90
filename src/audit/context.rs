//! Shared read-only state handed to every check.

use crate::config::{Config, MetricsConfig, SamplingConfig, StatusConfig};
use crate::index::IndexClient;
use crate::source::EntitySource;

use super::checks::CheckRegistry;

/// Everything a check may consult while auditing one ontology.
///
/// Built once per run and shared by all workers; nothing in it is mutated
/// during the run.
pub struct AuditContext {
    pub source: Box<dyn EntitySource>,
    pub annotator: Option<Box<dyn IndexClient>>,
    pub search: Option<Box<dyn IndexClient>>,
    pub checks: CheckRegistry,
    pub sampling: SamplingConfig,
    pub statuses: StatusConfig,
    pub metrics: MetricsConfig,
    /// Log every ontology outcome, not only problems.
    pub log_all: bool,
}

impl AuditContext {
    /// Context with the default check registry and no indexes.
    pub fn new(source: Box<dyn EntitySource>) -> Self {
        Self {
            source,
            annotator: None,
            search: None,
            checks: CheckRegistry::with_default_checks(),
            sampling: SamplingConfig::default(),
            statuses: StatusConfig::default(),
            metrics: MetricsConfig::default(),
            log_all: false,
        }
    }

    /// Take sampling, status and metrics settings from a configuration.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.sampling = config.sampling.clone();
        self.statuses = config.statuses.clone();
        self.metrics = config.metrics.clone();
        self
    }

    pub fn with_annotator(mut self, client: Box<dyn IndexClient>) -> Self {
        self.annotator = Some(client);
        self
    }

    pub fn with_search(mut self, client: Box<dyn IndexClient>) -> Self {
        self.search = Some(client);
        self
    }

    pub fn with_checks(mut self, checks: CheckRegistry) -> Self {
        self.checks = checks;
        self
    }

    pub fn log_all(mut self, log_all: bool) -> Self {
        self.log_all = log_all;
        self
    }

    /// Whether any index is configured for the consistency stage.
    pub fn has_indexes(&self) -> bool {
        self.annotator.is_some() || self.search.is_some()
    }
}
