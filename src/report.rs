//! Sanity report document, persistence, and terminal output.
//!
//! The persisted form is pretty-printed JSON with sorted keys so that two
//! consecutive reports diff cleanly:
//!
//! ```json
//! {
//!   "date_generated": "10/19/2026 03:00AM",
//!   "ontologies": {
//!     "ACR": {
//!       "problem": true,
//!       "logFilePath": "/srv/repo/ACR/4/parsing.log",
//!       "errNoRootsLatestReadySubmission": "The latest ready submission has no roots"
//!     }
//!   }
//! }
//! ```

use chrono::{DateTime, Local};
use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::audit::{EntityAudit, FindingValue};

/// Timestamp format of `date_generated`.
pub const DATE_FORMAT: &str = "%m/%d/%Y %I:%M%p";

/// Errors raised while persisting a report.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to write report to {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors raised while loading a previously written report.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to read report {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed report: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Findings of one ontology as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub problem: bool,
    #[serde(rename = "logFilePath")]
    pub log_file_path: String,
    /// Finding code name -> recorded value.
    #[serde(flatten)]
    pub findings: BTreeMap<String, FindingValue>,
}

impl ReportEntry {
    pub fn from_audit(audit: &EntityAudit) -> Self {
        Self {
            problem: audit.problem(),
            log_file_path: audit
                .log_file_path
                .as_ref()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default(),
            findings: audit
                .findings
                .entries()
                .iter()
                .map(|(code, value)| (code.as_str().to_string(), value.clone()))
                .collect(),
        }
    }
}

/// The full output of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub date_generated: String,
    pub ontologies: BTreeMap<String, ReportEntry>,
}

impl Report {
    pub fn new(generated: DateTime<Local>) -> Self {
        Self {
            date_generated: generated.format(DATE_FORMAT).to_string(),
            ontologies: BTreeMap::new(),
        }
    }

    /// Assemble a report from per-ontology audits.
    pub fn from_audits(generated: DateTime<Local>, audits: Vec<EntityAudit>) -> Self {
        let mut report = Self::new(generated);
        for audit in audits {
            report.insert(&audit);
        }
        report
    }

    pub fn insert(&mut self, audit: &EntityAudit) {
        self.ontologies
            .insert(audit.entity_id.clone(), ReportEntry::from_audit(audit));
    }

    pub fn get(&self, id: &str) -> Option<&ReportEntry> {
        self.ontologies.get(id)
    }

    pub fn len(&self) -> usize {
        self.ontologies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ontologies.is_empty()
    }

    /// Ontologies flagged as a problem, in key order.
    pub fn problems(&self) -> impl Iterator<Item = (&String, &ReportEntry)> {
        self.ontologies.iter().filter(|(_, entry)| entry.problem)
    }

    pub fn problem_count(&self) -> usize {
        self.problems().count()
    }

    pub fn to_json(&self) -> Result<String, SinkError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a previously written report.
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Self, ReportError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Destination of a finished report.
pub trait ReportSink {
    fn write(&self, report: &Report) -> Result<(), SinkError>;

    /// Human-readable destination for the confirmation log line.
    fn describe(&self) -> String;
}

/// Writes the report as JSON to a file, replacing previous content.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for JsonFileSink {
    fn write(&self, report: &Report) -> Result<(), SinkError> {
        let io_err = |source: std::io::Error| SinkError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let mut json = report.to_json()?;
        json.push('\n');
        fs::write(&self.path, json).map_err(io_err)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Prints the report JSON to stdout.
pub struct StdoutSink;

impl ReportSink for StdoutSink {
    fn write(&self, report: &Report) -> Result<(), SinkError> {
        println!("{}", report.to_json()?);
        Ok(())
    }

    fn describe(&self) -> String {
        "stdout".to_string()
    }
}

// =============================================================================
// Terminal summary
// =============================================================================

/// Print a colored summary of the problems in a report.
pub fn write_pretty(report: &Report, destination: &str) {
    println!();
    println!("{}", "ontocheck sanity report".bold());
    println!("Generated: {}", report.date_generated);
    println!("Written to: {}", destination);
    println!();

    for (id, entry) in report.problems() {
        println!("{}", id.red().bold());
        for (code, value) in &entry.findings {
            match value {
                FindingValue::Text(text) => println!("  {} {}", code.dimmed(), text),
                FindingValue::List(items) => {
                    let rendered: Vec<String> = items
                        .iter()
                        .map(|item| match serde_json::to_value(item) {
                            Ok(serde_json::Value::String(s)) => s,
                            Ok(other) => other.to_string(),
                            Err(_) => format!("{:?}", item),
                        })
                        .collect();
                    println!("  {} {}", code.dimmed(), rendered.join(", "));
                }
            }
        }
    }

    let problems = report.problem_count();
    let ok = report.len() - problems;
    println!();
    println!(
        "{} ontologies: {} ok, {}",
        report.len(),
        ok.to_string().green(),
        if problems > 0 {
            format!("{} with problems", problems).red().to_string()
        } else {
            "0 with problems".to_string()
        }
    );
}

/// Print `{ "problems": n, "ontologies": n, "report": path }` as JSON.
pub fn write_json_summary(report: &Report, destination: &str) -> Result<(), SinkError> {
    let summary = serde_json::json!({
        "date_generated": report.date_generated,
        "ontologies": report.len(),
        "problems": report.problem_count(),
        "report": destination,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
