use serde::Deserialize;
use serde_json::Value;

use crate::completion::provider::{
    CompletionRecord, Provider, ProviderAdapter, ResolvedRequest, StopReason,
};

pub const DEFAULT_MODEL: &str = "code-davinci-002";
const COMPLETIONS_PATH: &str = "/v1/completions";
const CLEAN_STOP: &str = "stop";

#[derive(Debug, Deserialize)]
struct CompletionsResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    text: String,
    finish_reason: Option<String>,
}

/// OpenAI-style `/v1/completions` adapter.
#[derive(Debug, Clone)]
pub struct OpenAiCompletions {
    clean_stop: String,
}

impl OpenAiCompletions {
    pub fn with_clean_stop_marker(mut self, marker: impl Into<String>) -> Self {
        self.clean_stop = marker.into();
        self
    }
}

impl Default for OpenAiCompletions {
    fn default() -> Self {
        Self {
            clean_stop: CLEAN_STOP.to_string(),
        }
    }
}

impl ProviderAdapter for OpenAiCompletions {
    fn provider(&self) -> Provider {
        Provider::Openai
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    fn clean_stop_marker(&self) -> &str {
        &self.clean_stop
    }

    fn endpoint(&self, base_url: &str, _model: &str) -> String {
        format!("{}{COMPLETIONS_PATH}", base_url.trim_end_matches('/'))
    }

    fn build_request(&self, request: &ResolvedRequest) -> Value {
        let mut payload = request.extra.clone();
        payload.insert("model".to_string(), Value::from(request.model.as_str()));
        payload.insert("prompt".to_string(), Value::from(request.prompt.as_str()));
        payload.insert("n".to_string(), Value::from(request.samples));
        payload.insert("max_tokens".to_string(), Value::from(request.max_tokens));
        if let Some(stop) = &request.stop {
            payload.insert("stop".to_string(), stop.to_json());
        }
        Value::Object(payload)
    }

    fn normalize_response(&self, body: Value) -> Result<Vec<CompletionRecord>, String> {
        let body: CompletionsResponse =
            serde_json::from_value(body).map_err(|err| format!("invalid choices payload: {err}"))?;
        Ok(body
            .choices
            .into_iter()
            .map(|choice| {
                let reason =
                    StopReason::classify(choice.finish_reason.as_deref(), &self.clean_stop);
                CompletionRecord::new(choice.text, reason)
            })
            .collect())
    }
}
