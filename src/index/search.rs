//! Search index client (Solr select handler).
//!
//! Queries via: GET {url}/select?q={escaped}&fq=submissionAcronym:"{acronym}"&rows=0
//! and reads `response.numFound`.

use serde::Deserialize;
use std::time::Duration;

use super::annotator::normalize_text;
use super::{ensure_success, HttpContext, IndexClient, IndexError};
use crate::config::IndexConfig;

/// Characters with a meaning in the Lucene query syntax.
const SPECIAL_CHARS: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\',
    '/',
];

#[derive(Deserialize)]
struct SelectResponse {
    response: SelectBody,
}

#[derive(Deserialize)]
struct SelectBody {
    #[serde(rename = "numFound")]
    num_found: u64,
}

pub struct SearchClient {
    ctx: HttpContext,
    url: String,
    timeout: Duration,
}

impl SearchClient {
    pub fn new(ctx: HttpContext, url: impl Into<String>, config: &IndexConfig) -> Self {
        Self {
            ctx,
            url: url.into(),
            timeout: config.timeout(),
        }
    }
}

impl IndexClient for SearchClient {
    fn name(&self) -> &'static str {
        "search"
    }

    fn query(&self, text: &str, scope: &str) -> Result<u64, IndexError> {
        let q = escape_query(&normalize_text(text));
        let fq = format!("submissionAcronym:\"{}\"", escape_query(scope));
        let url = format!("{}/select", self.url.trim_end_matches('/'));
        let request = self
            .ctx
            .http()
            .get(url)
            .query(&[
                ("q", q.as_str()),
                ("fq", fq.as_str()),
                ("q.op", "OR"),
                ("rows", "0"),
                ("wt", "json"),
            ])
            .timeout(self.timeout);

        self.ctx.block_on(async move {
            let response = request.send().await.map_err(IndexError::from_request)?;
            ensure_success(&response)?;
            let body: SelectResponse = response.json().await.map_err(IndexError::from_request)?;
            Ok(body.response.num_found)
        })
    }
}

/// Backslash-escape query syntax characters.
pub(crate) fn escape_query(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if SPECIAL_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
