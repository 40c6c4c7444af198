use serde::Deserialize;
use serde_json::Value;

use crate::completion::provider::{
    CompletionRecord, Provider, ProviderAdapter, ResolvedRequest, StopReason,
};

pub const DEFAULT_MODEL: &str = "j2-grande-instruct";
pub const TASK_DEFAULT_MODEL: &str = "j2-jumbo-instruct";
const CLEAN_STOP: &str = "stop";

#[derive(Debug, Deserialize)]
struct CompleteResponse {
    completions: Vec<Completion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Completion {
    data: CompletionData,
    finish_reason: Option<FinishReason>,
}

#[derive(Debug, Deserialize)]
struct CompletionData {
    text: String,
}

#[derive(Debug, Deserialize)]
struct FinishReason {
    reason: Option<String>,
}

/// AI21 Studio `/studio/v1/{model}/complete` adapter.
#[derive(Debug, Clone)]
pub struct Ai21Completions {
    clean_stop: String,
}

impl Ai21Completions {
    pub fn with_clean_stop_marker(mut self, marker: impl Into<String>) -> Self {
        self.clean_stop = marker.into();
        self
    }
}

impl Default for Ai21Completions {
    fn default() -> Self {
        Self {
            clean_stop: CLEAN_STOP.to_string(),
        }
    }
}

impl ProviderAdapter for Ai21Completions {
    fn provider(&self) -> Provider {
        Provider::Ai21
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    fn clean_stop_marker(&self) -> &str {
        &self.clean_stop
    }

    fn endpoint(&self, base_url: &str, model: &str) -> String {
        format!("{}/studio/v1/{model}/complete", base_url.trim_end_matches('/'))
    }

    fn build_request(&self, request: &ResolvedRequest) -> Value {
        // The model travels in the URL path, not the body.
        let mut payload = request.extra.clone();
        payload.insert("prompt".to_string(), Value::from(request.prompt.as_str()));
        payload.insert("numResults".to_string(), Value::from(request.samples));
        payload.insert("maxTokens".to_string(), Value::from(request.max_tokens));
        if let Some(stop) = &request.stop {
            payload.insert("stopSequences".to_string(), Value::from(stop.as_vec()));
        }
        Value::Object(payload)
    }

    fn normalize_response(&self, body: Value) -> Result<Vec<CompletionRecord>, String> {
        let body: CompleteResponse = serde_json::from_value(body)
            .map_err(|err| format!("invalid completions payload: {err}"))?;
        Ok(body
            .completions
            .into_iter()
            .map(|completion| {
                let reason = completion
                    .finish_reason
                    .and_then(|finish| finish.reason);
                let stop_reason = StopReason::classify(reason.as_deref(), &self.clean_stop);
                CompletionRecord::new(completion.data.text, stop_reason)
            })
            .collect())
    }
}
