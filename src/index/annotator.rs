//! Annotator index client.
//!
//! Annotates text via: GET {url}?text={text}&ontologies={acronym}
//! The hit count is the number of annotations in the returned JSON array.

use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;

use super::{ensure_success, HttpContext, IndexClient, IndexError};
use crate::config::IndexConfig;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"[\s\p{Cc}]+").unwrap();
}

pub struct AnnotatorClient {
    ctx: HttpContext,
    url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl AnnotatorClient {
    pub fn new(ctx: HttpContext, url: impl Into<String>, config: &IndexConfig) -> Self {
        Self {
            ctx,
            url: url.into(),
            api_key: config.api_key.clone(),
            timeout: config.timeout(),
        }
    }
}

impl IndexClient for AnnotatorClient {
    fn name(&self) -> &'static str {
        "annotator"
    }

    fn query(&self, text: &str, scope: &str) -> Result<u64, IndexError> {
        let text = normalize_text(text);
        let mut request = self
            .ctx
            .http()
            .get(&self.url)
            .query(&[
                ("text", text.as_str()),
                ("ontologies", scope),
                ("longest_only", "false"),
                ("whole_word_only", "true"),
            ])
            .timeout(self.timeout);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("apikey token={}", key));
        }

        self.ctx.block_on(async move {
            let response = request.send().await.map_err(IndexError::from_request)?;
            ensure_success(&response)?;
            let annotations: Vec<serde_json::Value> =
                response.json().await.map_err(IndexError::from_request)?;
            Ok(annotations.len() as u64)
        })
    }
}

/// Collapse whitespace and control characters into single spaces.
pub(crate) fn normalize_text(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}
