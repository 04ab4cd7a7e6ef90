//! Label sampling for the index consistency checks.
//!
//! Walks the class labels of a submission page by page and keeps the first
//! usable ones, up to the configured cap. A label is unusable when it is
//! missing, shorter than the minimum length, a stop word, or belongs to an
//! anonymous (blank node / skolemized) class.

use lazy_static::lazy_static;
use phf::phf_set;
use regex::Regex;

use crate::config::SamplingConfig;
use crate::model::{Entity, LabelEntry, Revision};
use crate::source::{EntitySource, SourceError};

lazy_static! {
    /// Identifiers minted for anonymous classes.
    static ref ANONYMOUS_ID: Regex =
        Regex::new(r"(?i)(^_:|^nodeid://|/\.well-known/genid/|^genid[:\d-])").unwrap();
}

static STOP_WORDS: phf::Set<&'static str> = phf_set! {
    "a", "about", "above", "after", "again", "against", "all", "and", "any", "are",
    "because", "been", "before", "being", "below", "between", "both", "but",
    "can", "did", "does", "doing", "down", "during", "each", "few", "for", "from",
    "further", "had", "has", "have", "having", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "into", "its", "itself", "just", "more",
    "most", "myself", "nor", "not", "now", "off", "once", "only", "other", "our",
    "ours", "ourselves", "out", "over", "own", "same", "she", "should", "some",
    "such", "than", "that", "the", "their", "theirs", "them", "themselves",
    "then", "there", "these", "they", "this", "those", "through", "too", "under",
    "until", "very", "was", "were", "what", "when", "where", "which", "while",
    "who", "whom", "why", "will", "with", "you", "your", "yours", "yourself",
    "yourselves",
};

/// Whether a class identifier denotes an anonymous class.
pub fn is_anonymous_id(id: &str) -> bool {
    ANONYMOUS_ID.is_match(id)
}

/// Whether a label is a stop word (built-in or configured).
pub fn is_stop_word(label: &str, config: &SamplingConfig) -> bool {
    let lowered = label.to_lowercase();
    STOP_WORDS.contains(lowered.as_str())
        || config
            .extra_stop_words
            .iter()
            .any(|w| w.to_lowercase() == lowered)
}

/// The trimmed label of an entry, if it may be sent to the indexes.
pub fn usable_label<'e>(entry: &'e LabelEntry, config: &SamplingConfig) -> Option<&'e str> {
    let label = entry.label.as_deref()?.trim();
    if label.chars().count() < config.min_label_length {
        return None;
    }
    if is_anonymous_id(&entry.id) || is_stop_word(label, config) {
        return None;
    }
    Some(label)
}

/// Collect up to `sample_cap` usable labels of a submission.
///
/// Pages are followed while the source reports a further page. The cap is
/// checked at page boundaries against the sample size before the previous
/// page was read, so the page after the one that filled the sample is still
/// requested once. Labels past the cap are never taken.
pub fn sample_labels(
    source: &dyn EntitySource,
    entity: &Entity,
    revision: &Revision,
    config: &SamplingConfig,
) -> Result<Vec<String>, SourceError> {
    let mut sample = Vec::with_capacity(config.sample_cap);
    let mut page = 1;

    loop {
        let full_before = sample.len() >= config.sample_cap;
        let current = source.load_labels(entity, revision, page, config.page_size)?;
        for entry in &current.items {
            if sample.len() >= config.sample_cap {
                break;
            }
            if let Some(label) = usable_label(entry, config) {
                sample.push(label.to_string());
            }
        }

        match current.next_page {
            Some(next) if next > page && !full_before => page = next,
            _ => return Ok(sample),
        }
    }
}
