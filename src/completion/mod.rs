//! Text-completion clients.
//!
//! One [`CompletionClient`] drives any provider through the
//! [`ProviderAdapter`] capability set; OpenAI and AI21 are the built-in
//! adapters.

/// AI21 Studio completion adapter.
pub mod ai21;
/// Provider-agnostic completion client.
pub mod client;
/// Error taxonomy for completion and task calls.
pub mod error;
/// OpenAI completions adapter.
pub mod openai;
/// Provider identifiers, request options and normalized records.
pub mod provider;
pub(crate) mod runtime;

pub use client::{CompletionClient, PreparedRequest};
pub use error::QueryError;
pub use provider::{
    CompletionRecord, CompletionRequest, Provider, ProviderAdapter, StopReason, StopSequence,
};
