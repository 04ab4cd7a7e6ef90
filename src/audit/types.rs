//! Finding codes, their recording policies, and payloads.

use serde::{Deserialize, Serialize};

/// Codes that can be recorded against an ontology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FindingCode {
    #[serde(rename = "summaryOnly")]
    SummaryOnly,
    #[serde(rename = "errSummaryOnlyWithSubmissions")]
    SummaryOnlyWithSubmissions,
    #[serde(rename = "errNoSubmissions")]
    NoSubmissions,
    #[serde(rename = "errNoReadySubmission")]
    NoReadySubmission,
    #[serde(rename = "errNoLatestReadySubmission")]
    LatestReadyBehind,
    #[serde(rename = "errNoClassesLatestReadySubmission")]
    NoClasses,
    #[serde(rename = "errNoRootsLatestReadySubmission")]
    NoRoots,
    #[serde(rename = "errNoMetricsLatestReadySubmission")]
    NoMetrics,
    #[serde(rename = "errIncorrectMetricsLatestReadySubmission")]
    IncorrectMetrics,
    #[serde(rename = "errNoAnnotator")]
    NoAnnotator,
    #[serde(rename = "errNoSearch")]
    NoSearch,
    #[serde(rename = "errErrorStatus")]
    ErrorStatus,
    #[serde(rename = "errMissingStatus")]
    MissingStatus,
    #[serde(rename = "errRunningReport")]
    CheckFailed,
}

impl FindingCode {
    pub const ALL: &'static [FindingCode] = &[
        FindingCode::SummaryOnly,
        FindingCode::SummaryOnlyWithSubmissions,
        FindingCode::NoSubmissions,
        FindingCode::NoReadySubmission,
        FindingCode::LatestReadyBehind,
        FindingCode::NoClasses,
        FindingCode::NoRoots,
        FindingCode::NoMetrics,
        FindingCode::IncorrectMetrics,
        FindingCode::NoAnnotator,
        FindingCode::NoSearch,
        FindingCode::ErrorStatus,
        FindingCode::MissingStatus,
        FindingCode::CheckFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FindingCode::SummaryOnly => "summaryOnly",
            FindingCode::SummaryOnlyWithSubmissions => "errSummaryOnlyWithSubmissions",
            FindingCode::NoSubmissions => "errNoSubmissions",
            FindingCode::NoReadySubmission => "errNoReadySubmission",
            FindingCode::LatestReadyBehind => "errNoLatestReadySubmission",
            FindingCode::NoClasses => "errNoClassesLatestReadySubmission",
            FindingCode::NoRoots => "errNoRootsLatestReadySubmission",
            FindingCode::NoMetrics => "errNoMetricsLatestReadySubmission",
            FindingCode::IncorrectMetrics => "errIncorrectMetricsLatestReadySubmission",
            FindingCode::NoAnnotator => "errNoAnnotator",
            FindingCode::NoSearch => "errNoSearch",
            FindingCode::ErrorStatus => "errErrorStatus",
            FindingCode::MissingStatus => "errMissingStatus",
            FindingCode::CheckFailed => "errRunningReport",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|code| code.as_str() == s)
    }

    /// Codes named `err*` mark the ontology as a problem.
    pub fn is_error(&self) -> bool {
        self.as_str().starts_with("err")
    }

    /// How a recorded value for this code is stored.
    pub fn policy(&self) -> FindingPolicy {
        match self {
            FindingCode::SummaryOnly => FindingPolicy::Fixed("Ontology is summary-only"),
            FindingCode::SummaryOnlyWithSubmissions => {
                FindingPolicy::Fixed("Ontology has submissions but it is set to summary-only")
            }
            FindingCode::NoSubmissions => FindingPolicy::Fixed("Ontology has no submissions"),
            FindingCode::NoReadySubmission => {
                FindingPolicy::Fixed("Ontology has no submissions in a ready state")
            }
            FindingCode::LatestReadyBehind => FindingPolicy::Formatted(format_behind),
            FindingCode::NoClasses => {
                FindingPolicy::Fixed("The latest ready submission has no classes")
            }
            FindingCode::NoRoots => FindingPolicy::Fixed("The latest ready submission has no roots"),
            FindingCode::NoMetrics => {
                FindingPolicy::Fixed("The latest ready submission has no metrics")
            }
            FindingCode::IncorrectMetrics => {
                FindingPolicy::Fixed("The latest ready submission has incorrect metrics")
            }
            FindingCode::NoAnnotator => FindingPolicy::Formatted(format_annotator),
            FindingCode::NoSearch => FindingPolicy::Formatted(format_search),
            FindingCode::ErrorStatus | FindingCode::MissingStatus | FindingCode::CheckFailed => {
                FindingPolicy::Accumulating
            }
        }
    }
}

impl std::fmt::Display for FindingCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage policy of a finding code.
#[derive(Clone, Copy)]
pub enum FindingPolicy {
    /// Store this text; later writes are ignored.
    Fixed(&'static str),
    /// Append each payload to an ordered list.
    Accumulating,
    /// Store the formatted payload; later writes are ignored.
    Formatted(fn(&Payload) -> String),
}

impl std::fmt::Debug for FindingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FindingPolicy::Fixed(text) => f.debug_tuple("Fixed").field(text).finish(),
            FindingPolicy::Accumulating => f.write_str("Accumulating"),
            FindingPolicy::Formatted(_) => f.write_str("Formatted"),
        }
    }
}

/// Data attached to a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Count(u64),
    Text(String),
    /// Index hits for a sampled text.
    Hits { found: u64, text: String },
    /// A check that raised instead of completing.
    Failure {
        check: String,
        kind: String,
        message: String,
    },
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Payload::Text(text.into())
    }
}

/// One coded observation produced by a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub code: FindingCode,
    pub data: Option<Payload>,
}

impl Finding {
    pub fn new(code: FindingCode) -> Self {
        Self { code, data: None }
    }

    pub fn with(code: FindingCode, data: Payload) -> Self {
        Self {
            code,
            data: Some(data),
        }
    }
}

fn format_behind(payload: &Payload) -> String {
    let n = match payload {
        Payload::Count(n) => *n,
        other => return format!("The latest submission is not ready: {:?}", other),
    };
    format!(
        "The latest submission is not ready and is ahead of the latest ready by {} revision{}",
        n,
        if n == 1 { "" } else { "s" }
    )
}

fn format_hits(index: &str, payload: &Payload) -> String {
    match payload {
        Payload::Hits { found, text } => format!(
            "{} - {} results for: {}",
            index,
            if *found > 0 { "FEW" } else { "NO" },
            text
        ),
        Payload::Text(text) => format!("{} - NO results for: {}", index, text),
        other => format!("{} - {:?}", index, other),
    }
}

fn format_annotator(payload: &Payload) -> String {
    format_hits("Annotator", payload)
}

fn format_search(payload: &Payload) -> String {
    format_hits("Search", payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_names_round_trip() {
        for code in FindingCode::ALL {
            assert_eq!(FindingCode::parse(code.as_str()), Some(*code));
            let json = serde_json::to_string(code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
        assert_eq!(FindingCode::parse("errUnknown"), None);
    }

    #[test]
    fn test_only_summary_is_informational() {
        let informational: Vec<_> = FindingCode::ALL
            .iter()
            .filter(|c| !c.is_error())
            .collect();
        assert_eq!(informational, vec![&FindingCode::SummaryOnly]);
    }

    #[test]
    fn test_behind_formatting() {
        let FindingPolicy::Formatted(f) = FindingCode::LatestReadyBehind.policy() else {
            panic!("expected formatter");
        };
        assert_eq!(
            f(&Payload::Count(1)),
            "The latest submission is not ready and is ahead of the latest ready by 1 revision"
        );
        assert!(f(&Payload::Count(3)).ends_with("by 3 revisions"));
    }

    #[test]
    fn test_hits_formatting() {
        let FindingPolicy::Formatted(f) = FindingCode::NoSearch.policy() else {
            panic!("expected formatter");
        };
        let few = Payload::Hits {
            found: 2,
            text: "heart lung".to_string(),
        };
        let none = Payload::Hits {
            found: 0,
            text: "heart lung".to_string(),
        };
        assert_eq!(f(&few), "Search - FEW results for: heart lung");
        assert_eq!(f(&none), "Search - NO results for: heart lung");
    }
}
