//! Query text-completion models for typed literal answers.
//!
//! A [`CompletionClient`] sends one prompt to a provider (OpenAI or AI21)
//! and returns one record per sample. Prompts end inside an open literal,
//! so the continuations are parsed with a restricted literal grammar and
//! the usable answers can be aggregated by frequency. The task queries in
//! [`tasks`] wrap this for tagging, classification and few-shot
//! extrapolation.

pub mod commands;
pub mod completion;
pub mod config;
pub mod frequency;
pub mod literal;
pub mod parse;
pub mod tasks;

pub use completion::{CompletionClient, Provider, QueryError};
pub use frequency::{FrequencyTable, most_common};
pub use literal::{Literal, LiteralKind, parse_literal};
pub use tasks::{ClassificationQuery, ExtrapolationQuery};
