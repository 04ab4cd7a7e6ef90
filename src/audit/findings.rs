//! Per-ontology accumulation of findings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::types::{Finding, FindingCode, FindingPolicy, Payload};

/// Stored value of one finding code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FindingValue {
    Text(String),
    List(Vec<Payload>),
}

impl FindingValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FindingValue::Text(text) => Some(text),
            FindingValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Payload]> {
        match self {
            FindingValue::List(items) => Some(items),
            FindingValue::Text(_) => None,
        }
    }
}

/// Append-only record of what was found for one ontology.
///
/// Fixed and formatted codes keep their first value. Accumulating codes
/// collect every payload in recording order. Recording an `err*` code
/// marks the ontology as a problem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindingAccumulator {
    entries: BTreeMap<FindingCode, FindingValue>,
    problem: bool,
}

impl FindingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `code` with optional payload according to the code's policy.
    ///
    /// A missing payload on an accumulating or formatted code records
    /// nothing and leaves the problem flag untouched.
    pub fn record(&mut self, code: FindingCode, data: Option<Payload>) {
        match (code.policy(), data) {
            (FindingPolicy::Fixed(text), _) => {
                self.entries
                    .entry(code)
                    .or_insert_with(|| FindingValue::Text(text.to_string()));
            }
            (FindingPolicy::Accumulating, Some(data)) => {
                let value = self
                    .entries
                    .entry(code)
                    .or_insert_with(|| FindingValue::List(Vec::new()));
                if let FindingValue::List(items) = value {
                    items.push(data);
                }
            }
            (FindingPolicy::Formatted(format), Some(data)) => {
                self.entries
                    .entry(code)
                    .or_insert_with(|| FindingValue::Text(format(&data)));
            }
            (FindingPolicy::Accumulating, None) | (FindingPolicy::Formatted(_), None) => return,
        }

        if code.is_error() {
            self.problem = true;
        }
    }

    pub fn record_finding(&mut self, finding: Finding) {
        self.record(finding.code, finding.data);
    }

    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) {
        for finding in findings {
            self.record_finding(finding);
        }
    }

    pub fn problem(&self) -> bool {
        self.problem
    }

    pub fn get(&self, code: FindingCode) -> Option<&FindingValue> {
        self.entries.get(&code)
    }

    pub fn contains(&self, code: FindingCode) -> bool {
        self.entries.contains_key(&code)
    }

    pub fn codes(&self) -> impl Iterator<Item = FindingCode> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &BTreeMap<FindingCode, FindingValue> {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_code_first_write_wins() {
        let mut acc = FindingAccumulator::new();
        acc.record(FindingCode::NoRoots, None);
        acc.record(FindingCode::NoRoots, Some(Payload::text("ignored")));

        assert_eq!(acc.len(), 1);
        assert_eq!(
            acc.get(FindingCode::NoRoots).and_then(FindingValue::as_text),
            Some("The latest ready submission has no roots")
        );
        assert!(acc.problem());
    }

    #[test]
    fn test_accumulating_code_keeps_order() {
        let mut acc = FindingAccumulator::new();
        acc.record(FindingCode::MissingStatus, Some(Payload::text("INDEXED")));
        acc.record(FindingCode::MissingStatus, Some(Payload::text("METRICS")));

        assert_eq!(
            acc.get(FindingCode::MissingStatus).and_then(FindingValue::as_list),
            Some(&[Payload::text("INDEXED"), Payload::text("METRICS")][..])
        );
    }

    #[test]
    fn test_formatted_code_is_idempotent() {
        let mut acc = FindingAccumulator::new();
        acc.record(FindingCode::LatestReadyBehind, Some(Payload::Count(2)));
        acc.record(FindingCode::LatestReadyBehind, Some(Payload::Count(5)));

        let text = acc
            .get(FindingCode::LatestReadyBehind)
            .and_then(FindingValue::as_text)
            .unwrap();
        assert!(text.ends_with("by 2 revisions"));
    }

    #[test]
    fn test_missing_payload_is_noop() {
        let mut acc = FindingAccumulator::new();
        acc.record(FindingCode::ErrorStatus, None);
        acc.record(FindingCode::NoSearch, None);

        assert!(acc.is_empty());
        assert!(!acc.problem());
    }

    #[test]
    fn test_informational_code_is_not_a_problem() {
        let mut acc = FindingAccumulator::new();
        acc.record(FindingCode::SummaryOnly, None);

        assert!(acc.contains(FindingCode::SummaryOnly));
        assert!(!acc.problem());
    }
}
