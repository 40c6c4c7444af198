use std::env;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::completion::{ai21, openai};

/// Default number of sampled completions per request.
pub const DEFAULT_SAMPLES: u32 = 10;
/// Generation cap applied when a request does not set one.
pub const DEFAULT_MAX_TOKENS: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Openai,
    Ai21,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Openai, Provider::Ai21];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Ai21 => "ai21",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|provider| provider.as_str().eq_ignore_ascii_case(value.trim()))
    }

    /// Comma-separated list of accepted names, for error messages.
    pub fn supported() -> String {
        Self::ALL
            .iter()
            .map(|provider| provider.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Openai => "https://api.openai.com",
            Self::Ai21 => "https://api.ai21.com",
        }
    }

    /// Model used by the task queries when none is configured.
    pub fn task_default_model(self) -> &'static str {
        match self {
            Self::Openai => openai::DEFAULT_MODEL,
            Self::Ai21 => ai21::TASK_DEFAULT_MODEL,
        }
    }

    pub fn adapter(self) -> Arc<dyn ProviderAdapter> {
        match self {
            Self::Openai => Arc::new(openai::OpenAiCompletions::default()),
            Self::Ai21 => Arc::new(ai21::Ai21Completions::default()),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn api_key_env(provider: Provider) -> &'static str {
    match provider {
        Provider::Openai => "OPENAI_API_KEY",
        Provider::Ai21 => "AI21_API_KEY",
    }
}

/// Reads the provider credential, treating blank values as unset.
pub fn api_key_from_env(provider: Provider) -> Option<String> {
    env::var(api_key_env(provider))
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// Stop sequence in either of the shapes callers use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopSequence {
    Single(String),
    Many(Vec<String>),
}

impl StopSequence {
    pub fn many<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        Self::Many(items.into_iter().map(|item| item.to_string()).collect())
    }

    /// Builds a stop sequence from a JSON option value. Array elements that
    /// are not strings are replaced by their JSON text.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(text) => Self::Single(text.clone()),
            Value::Array(items) => Self::Many(items.iter().map(value_to_text).collect()),
            other => Self::Single(value_to_text(other)),
        }
    }

    pub fn as_vec(&self) -> Vec<String> {
        match self {
            Self::Single(text) => vec![text.clone()],
            Self::Many(items) => items.clone(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Single(text) => Value::String(text.clone()),
            Self::Many(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
        }
    }
}

impl From<&str> for StopSequence {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<Vec<&str>> for StopSequence {
    fn from(value: Vec<&str>) -> Self {
        Self::many(value)
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Options for one completion call. Unset fields fall back to the client's
/// defaults.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub prompt: Option<String>,
    pub stop: Option<StopSequence>,
    pub samples: Option<u32>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    /// Provider-specific body fields. Explicit fields above win on conflict.
    pub extra: Map<String, Value>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Self::default()
        }
    }

    pub fn with_stop(mut self, stop: impl Into<StopSequence>) -> Self {
        self.stop = Some(stop.into());
        self
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = Some(samples);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// A request with every default applied, ready for an adapter.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub prompt: String,
    pub stop: Option<StopSequence>,
    pub samples: u32,
    pub model: String,
    pub max_tokens: u32,
    pub extra: Map<String, Value>,
}

/// Why a sampled completion ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The provider's clean-stop marker: a stop sequence was reached.
    Stop,
    /// Anything else (length cap, content filter, missing reason).
    Other(String),
}

impl StopReason {
    pub fn classify(reason: Option<&str>, clean_marker: &str) -> Self {
        match reason {
            Some(reason) if reason == clean_marker => Self::Stop,
            Some(reason) => Self::Other(reason.to_string()),
            None => Self::Other(String::new()),
        }
    }
}

/// One sampled completion, normalized across providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRecord {
    pub text: String,
    pub stop_reason: StopReason,
}

impl CompletionRecord {
    pub fn new(text: impl Into<String>, stop_reason: StopReason) -> Self {
        Self {
            text: text.into(),
            stop_reason,
        }
    }

    pub fn is_clean_stop(&self) -> bool {
        self.stop_reason == StopReason::Stop
    }
}

/// Provider-specific wire handling for a completion endpoint.
pub trait ProviderAdapter: fmt::Debug + Send + Sync {
    fn provider(&self) -> Provider;

    fn default_model(&self) -> &str;

    /// Finish reason that marks a completion as cleanly stopped.
    fn clean_stop_marker(&self) -> &str;

    fn endpoint(&self, base_url: &str, model: &str) -> String;

    fn build_request(&self, request: &ResolvedRequest) -> Value;

    /// Converts a response body into records, in endpoint order. The error
    /// describes which part of the body did not match.
    fn normalize_response(&self, body: Value) -> Result<Vec<CompletionRecord>, String>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Provider, StopReason, StopSequence};

    #[test]
    fn provider_parse_is_case_insensitive() {
        assert_eq!(Provider::parse("OpenAI"), Some(Provider::Openai));
        assert_eq!(Provider::parse(" ai21 "), Some(Provider::Ai21));
        assert_eq!(Provider::parse("fireworks"), None);
        assert_eq!(Provider::supported(), "openai, ai21");
    }

    #[test]
    fn stop_sequence_coerces_non_string_elements() {
        let stop = StopSequence::from_value(&json!(["\n", 3, true, null]));
        assert_eq!(
            stop,
            StopSequence::Many(vec![
                "\n".to_string(),
                "3".to_string(),
                "true".to_string(),
                "null".to_string()
            ])
        );
        assert_eq!(StopSequence::from_value(&json!(7)), StopSequence::Single("7".into()));
    }

    #[test]
    fn stop_reason_matches_marker_exactly() {
        assert_eq!(StopReason::classify(Some("stop"), "stop"), StopReason::Stop);
        assert_eq!(
            StopReason::classify(Some("length"), "stop"),
            StopReason::Other("length".to_string())
        );
        assert_eq!(
            StopReason::classify(None, "stop"),
            StopReason::Other(String::new())
        );
    }
}
