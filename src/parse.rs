//! Typed parsing of sampled completions.
//!
//! Only cleanly stopped records are considered. A record whose text does not
//! parse, or that fails the type filter, is dropped and logged at `debug`;
//! one bad sample never fails the batch.

use crate::completion::provider::{CompletionRecord, CompletionRequest, StopSequence};
use crate::literal::{Literal, LiteralKind, parse_literal};

/// How the completion text continues the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Prompt ends inside an open `"`; the text is the bare string.
    String,
    /// Text is one complete literal on a single line.
    Literal,
    /// Prompt ends inside an open `[`; the text is the list interior.
    List,
}

impl QueryMode {
    pub fn stop(self) -> StopSequence {
        match self {
            Self::String => StopSequence::Single("\"".to_string()),
            Self::Literal => StopSequence::many(["\n", ";"]),
            Self::List => StopSequence::Single("]".to_string()),
        }
    }

    pub fn request(self, prompt: &str) -> CompletionRequest {
        CompletionRequest::new(prompt).with_stop(self.stop())
    }
}

fn clean(records: Vec<CompletionRecord>) -> impl Iterator<Item = String> {
    records.into_iter().filter_map(|record| {
        if record.is_clean_stop() {
            Some(record.text)
        } else {
            tracing::debug!(
                reason = ?record.stop_reason,
                "dropping completion without clean stop"
            );
            None
        }
    })
}

/// String mode: trimmed text of every cleanly stopped record.
pub fn strings(records: Vec<CompletionRecord>) -> Vec<String> {
    clean(records).map(|text| text.trim().to_string()).collect()
}

/// Literal mode: each text parsed as one literal.
pub fn literals(records: Vec<CompletionRecord>, filter: Option<LiteralKind>) -> Vec<Literal> {
    clean(records)
        .filter_map(|text| match parse_literal(text.trim()) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                tracing::debug!(%err, text = %text, "dropping malformed literal");
                None
            }
        })
        .filter(|parsed| match filter {
            Some(kind) if !parsed.is(kind) => {
                tracing::debug!(
                    expected = kind.as_str(),
                    got = parsed.kind().as_str(),
                    "dropping literal of wrong kind"
                );
                false
            }
            _ => true,
        })
        .collect()
}

/// List mode: each text is re-closed as `[text]` and parsed. With a filter,
/// non-matching elements are removed; empty lists are dropped.
pub fn lists(records: Vec<CompletionRecord>, filter: Option<LiteralKind>) -> Vec<Vec<Literal>> {
    clean(records)
        .filter_map(|text| match parse_literal(&format!("[{text}]")) {
            Ok(Literal::List(items)) => Some(items),
            Ok(_) => None,
            Err(err) => {
                tracing::debug!(%err, text = %text, "dropping malformed list");
                None
            }
        })
        .map(|items| match filter {
            Some(kind) => items.into_iter().filter(|item| item.is(kind)).collect(),
            None => items,
        })
        .filter(|items: &Vec<Literal>| !items.is_empty())
        .collect()
}
