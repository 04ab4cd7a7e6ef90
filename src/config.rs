//! Configuration file schema for ontocheck.
//!
//! The configuration names the metadata store export, the repository root,
//! the report destination and the connection settings of both indexes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["ontocheck.yaml", ".ontocheck.yaml"];

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Base directory holding `<ontology>/<submission>/` upload folders.
    #[serde(default)]
    pub repository_path: Option<PathBuf>,
    /// Where the sanity report is written.
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
    pub source: SourceConfig,
    /// Number of ontologies audited concurrently (default: 1)
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub statuses: StatusConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub annotator: IndexConfig,
    #[serde(default)]
    pub search: IndexConfig,
}

fn default_report_path() -> PathBuf {
    PathBuf::from("ontologies_report.json")
}

fn default_workers() -> usize {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repository_path: None,
            report_path: default_report_path(),
            source: SourceConfig::default(),
            workers: default_workers(),
            sampling: SamplingConfig::default(),
            statuses: StatusConfig::default(),
            metrics: MetricsConfig::default(),
            annotator: IndexConfig::default(),
            search: IndexConfig::default(),
        }
    }
}

impl Config {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

/// Where entities are read from.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SourceConfig {
    /// JSON export of the metadata store.
    pub snapshot_path: PathBuf,
}

/// Label sampling for the index consistency checks.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SamplingConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Maximum number of labels sent to the indexes (default: 10)
    #[serde(default = "default_sample_cap")]
    pub sample_cap: usize,
    #[serde(default = "default_min_label_length")]
    pub min_label_length: usize,
    /// Stop words on top of the built-in list.
    #[serde(default)]
    pub extra_stop_words: Vec<String>,
}

fn default_page_size() -> usize {
    500
}

fn default_sample_cap() -> usize {
    10
}

fn default_min_label_length() -> usize {
    3
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            sample_cap: default_sample_cap(),
            min_label_length: default_min_label_length(),
            extra_stop_words: Vec::new(),
        }
    }
}

/// Submission status reference sets.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusConfig {
    /// Statuses a submission needs to count as ready.
    #[serde(default = "default_ready")]
    pub ready: Vec<String>,
    /// Statuses every ready submission is expected to carry.
    #[serde(default = "default_expected")]
    pub expected: Vec<String>,
    /// Statuses never reported as missing.
    #[serde(default = "default_optional")]
    pub optional: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_ready() -> Vec<String> {
    strings(&["UPLOADED", "RDF", "RDF_LABELS"])
}

fn default_expected() -> Vec<String> {
    strings(&[
        "UPLOADED",
        "RDF",
        "RDF_LABELS",
        "INDEXED",
        "METRICS",
        "ANNOTATOR",
        "DIFF",
        "INDEXED_PROPERTIES",
    ])
}

fn default_optional() -> Vec<String> {
    strings(&["DIFF", "INDEXED_PROPERTIES", "ARCHIVED"])
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            ready: default_ready(),
            expected: default_expected(),
            optional: default_optional(),
        }
    }
}

impl StatusConfig {
    /// Expected statuses minus the optional ones, in configured order.
    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.expected
            .iter()
            .filter(|s| !self.optional.contains(s))
            .map(String::as_str)
    }
}

/// Metrics sanity thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Minimum of classes + properties (default: 10)
    #[serde(default = "default_min_total")]
    pub min_total: u64,
}

fn default_min_total() -> u64 {
    10
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            min_total: default_min_total(),
        }
    }
}

/// Connection settings for one index.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Whether this index is queried (default: true when a URL is set)
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in milliseconds (default: 10000)
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    10_000
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: None,
            api_key: None,
            timeout_ms: default_timeout(),
        }
    }
}

impl IndexConfig {
    /// The endpoint to query, if this index is active.
    pub fn active_url(&self) -> Option<&str> {
        if self.enabled {
            self.url.as_deref()
        } else {
            None
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Validate a configuration for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    if config.workers == 0 {
        anyhow::bail!("workers must be at least 1");
    }
    if config.sampling.page_size == 0 {
        anyhow::bail!("sampling.page_size must be at least 1");
    }
    if config.sampling.sample_cap == 0 {
        anyhow::bail!("sampling.sample_cap must be at least 1");
    }
    if config.source.snapshot_path.as_os_str().is_empty() {
        anyhow::bail!("source.snapshot_path is required");
    }

    for (name, index) in [("annotator", &config.annotator), ("search", &config.search)] {
        if let Some(url) = &index.url {
            reqwest::Url::parse(url)
                .map_err(|e| anyhow::anyhow!("invalid {} url {:?}: {}", name, url, e))?;
        }
        if index.timeout_ms == 0 {
            anyhow::bail!("{}.timeout_ms must be greater than 0", name);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
repository_path: /srv/ontologies/repository
source:
  snapshot_path: /srv/ontologies/store.json
workers: 4
sampling:
  sample_cap: 5
annotator:
  url: http://localhost:8080/annotator
  api_key: secret
search:
  enabled: false
  url: http://localhost:8983/solr/term_search
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.sampling.sample_cap, 5);
        assert_eq!(config.sampling.page_size, 500);
        assert_eq!(config.report_path, PathBuf::from("ontologies_report.json"));
        assert_eq!(
            config.annotator.active_url(),
            Some("http://localhost:8080/annotator")
        );
        assert_eq!(config.search.active_url(), None);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_required_statuses_skip_optional() {
        let statuses = StatusConfig::default();
        let required: Vec<_> = statuses.required().collect();
        assert!(required.contains(&"METRICS"));
        assert!(!required.contains(&"DIFF"));
        assert!(!required.contains(&"INDEXED_PROPERTIES"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config {
            source: SourceConfig {
                snapshot_path: PathBuf::from("store.json"),
            },
            ..Default::default()
        };
        assert!(validate(&config).is_ok());

        config.workers = 0;
        assert!(validate(&config).is_err());

        config.workers = 2;
        config.search.url = Some("not a url".to_string());
        assert!(validate(&config).is_err());
    }
}
