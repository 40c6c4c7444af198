use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;

use crate::completion::error::QueryError;
use crate::completion::provider::{
    CompletionRecord, CompletionRequest, DEFAULT_MAX_TOKENS, DEFAULT_SAMPLES, Provider,
    ProviderAdapter, ResolvedRequest, StopSequence,
};
use crate::completion::runtime::{RequestFailure, build_http_client, send_completion_request};
use crate::literal::{Literal, LiteralKind};
use crate::parse::{self, QueryMode};

/// Text-completion client bound to one provider adapter and credential.
///
/// Holds read-only configuration only, so one instance can be shared across
/// threads.
#[derive(Clone)]
pub struct CompletionClient {
    adapter: Arc<dyn ProviderAdapter>,
    api_key: String,
    model: String,
    samples: u32,
    max_tokens: u32,
    base_url: String,
    timeout: Option<Duration>,
    http: Client,
}

/// Endpoint and body of a request, as it would be sent.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedRequest {
    pub provider: Provider,
    pub model: String,
    pub url: String,
    pub body: Value,
}

impl CompletionClient {
    /// Creates a client with the provider's default model and 10 samples.
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Self {
        Self::with_adapter(provider.adapter(), provider.default_base_url(), api_key)
    }

    /// Creates a client for a custom adapter configuration.
    pub fn with_adapter(
        adapter: Arc<dyn ProviderAdapter>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            model: adapter.default_model().to_string(),
            adapter,
            api_key: api_key.into(),
            samples: DEFAULT_SAMPLES,
            max_tokens: DEFAULT_MAX_TOKENS,
            base_url: base_url.into(),
            timeout: None,
            http: build_http_client(None),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    /// Generation cap for requests that do not set their own.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the transport timeout for every request made by this client.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self.http = build_http_client(self.timeout);
        self
    }

    pub fn provider(&self) -> Provider {
        self.adapter.provider()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Applies the client defaults to `request`.
    pub fn resolve(&self, request: CompletionRequest) -> Result<ResolvedRequest, QueryError> {
        let prompt = request.prompt.ok_or_else(|| QueryError::missing("prompt"))?;
        let samples = request.samples.unwrap_or(self.samples);
        if samples == 0 {
            return Err(QueryError::Configuration(
                "sample count must be at least 1".to_string(),
            ));
        }

        // A `stop` option goes through the same normalization as `stop`.
        let mut extra = request.extra;
        let option_stop = extra.remove("stop");
        let stop = request
            .stop
            .or_else(|| option_stop.as_ref().map(StopSequence::from_value));

        Ok(ResolvedRequest {
            prompt,
            stop,
            samples,
            model: request.model.unwrap_or_else(|| self.model.clone()),
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
            extra,
        })
    }

    /// Resolves `request` and renders the provider body without sending it.
    pub fn prepare(&self, request: CompletionRequest) -> Result<PreparedRequest, QueryError> {
        let resolved = self.resolve(request)?;
        Ok(PreparedRequest {
            provider: self.provider(),
            url: self.adapter.endpoint(&self.base_url, &resolved.model),
            body: self.adapter.build_request(&resolved),
            model: resolved.model,
        })
    }

    /// Performs exactly one completion call and returns one record per sample.
    pub fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<Vec<CompletionRecord>, QueryError> {
        let provider = self.provider();
        let prepared = self.prepare(request)?;
        tracing::info!(
            provider = provider.as_str(),
            model = %prepared.model,
            url = %prepared.url,
            "sending completion request"
        );

        let body = send_completion_request(&self.http, &prepared.url, &self.api_key, &prepared.body)
            .map_err(|failure| match failure {
                RequestFailure::Request(source) => QueryError::Transport { provider, source },
                RequestFailure::Api { status, body } => QueryError::Api {
                    provider,
                    status,
                    body,
                },
            })?;

        let records = self
            .adapter
            .normalize_response(body)
            .map_err(|detail| QueryError::InvalidResponse { provider, detail })?;
        tracing::debug!(
            provider = provider.as_str(),
            records = records.len(),
            clean = records.iter().filter(|record| record.is_clean_stop()).count(),
            "completion response received"
        );
        Ok(records)
    }

    /// Completes a prompt that ends inside an open string literal.
    pub fn str_query(&self, prompt: &str) -> Result<Vec<String>, QueryError> {
        let records = self.complete(QueryMode::String.request(prompt))?;
        Ok(parse::strings(records))
    }

    /// Completes a prompt whose continuation is a single literal.
    pub fn literal_query(
        &self,
        prompt: &str,
        filter: Option<LiteralKind>,
    ) -> Result<Vec<Literal>, QueryError> {
        let records = self.complete(QueryMode::Literal.request(prompt))?;
        Ok(parse::literals(records, filter))
    }

    /// Completes a prompt that ends inside an open list literal.
    pub fn list_query(
        &self,
        prompt: &str,
        filter: Option<LiteralKind>,
    ) -> Result<Vec<Vec<Literal>>, QueryError> {
        let records = self.complete(QueryMode::List.request(prompt))?;
        Ok(parse::lists(records, filter))
    }
}

impl fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionClient")
            .field("adapter", &self.adapter)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("samples", &self.samples)
            .field("max_tokens", &self.max_tokens)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::CompletionClient;
    use crate::completion::error::QueryError;
    use crate::completion::provider::{CompletionRequest, Provider, StopSequence};

    fn client() -> CompletionClient {
        CompletionClient::new(Provider::Openai, "sk-secret").with_samples(4)
    }

    #[test]
    fn missing_prompt_is_a_configuration_error() {
        let err = client()
            .complete(CompletionRequest::default())
            .expect_err("prompt is required");
        assert!(matches!(err, QueryError::Configuration(ref msg) if msg == "prompt is required"));
        assert!(!err.is_transport());
    }

    #[test]
    fn zero_samples_is_rejected() {
        let err = client()
            .resolve(CompletionRequest::new("x").with_samples(0))
            .expect_err("zero samples");
        assert!(matches!(err, QueryError::Configuration(_)));
    }

    #[test]
    fn resolve_applies_client_defaults() {
        let resolved = client()
            .resolve(CompletionRequest::new("hello"))
            .expect("valid request");
        assert_eq!(resolved.samples, 4);
        assert_eq!(resolved.model, "code-davinci-002");
        assert_eq!(resolved.max_tokens, 256);
        assert!(resolved.stop.is_none());
    }

    #[test]
    fn client_max_tokens_replaces_fixed_default() {
        let resolved = client()
            .with_max_tokens(64)
            .resolve(CompletionRequest::new("hello"))
            .expect("valid request");
        assert_eq!(resolved.max_tokens, 64);
    }

    #[test]
    fn request_overrides_client_defaults() {
        let resolved = client()
            .with_model("client-model")
            .resolve(
                CompletionRequest::new("hello")
                    .with_samples(2)
                    .with_model("call-model")
                    .with_max_tokens(16)
                    .with_stop(vec!["\n", ";"]),
            )
            .expect("valid request");
        assert_eq!(resolved.samples, 2);
        assert_eq!(resolved.model, "call-model");
        assert_eq!(resolved.max_tokens, 16);
        assert_eq!(resolved.stop, Some(StopSequence::many(["\n", ";"])));
    }

    #[test]
    fn prepare_renders_ai21_body_and_url() {
        let prepared = CompletionClient::new(Provider::Ai21, "key")
            .with_base_url("http://localhost:9000")
            .prepare(CompletionRequest::new("p").with_stop("\""))
            .expect("valid request");
        assert_eq!(
            prepared.url,
            "http://localhost:9000/studio/v1/j2-grande-instruct/complete"
        );
        assert_eq!(prepared.body["numResults"], json!(10));
        assert_eq!(prepared.body["stopSequences"], json!(["\""]));
    }

    #[test]
    fn stop_option_is_normalized_per_provider() {
        let request = || CompletionRequest::new("p").with_option("stop", json!([1, "]"]));

        let ai21 = CompletionClient::new(Provider::Ai21, "key")
            .prepare(request())
            .expect("valid request");
        assert_eq!(ai21.body["stopSequences"], json!(["1", "]"]));
        assert!(ai21.body.get("stop").is_none());

        let openai = CompletionClient::new(Provider::Openai, "key")
            .prepare(request())
            .expect("valid request");
        assert_eq!(openai.body["stop"], json!(["1", "]"]));
    }

    #[test]
    fn explicit_stop_wins_over_stop_option() {
        let prepared = CompletionClient::new(Provider::Ai21, "key")
            .prepare(
                CompletionRequest::new("p")
                    .with_stop("\n")
                    .with_option("stop", json!(";"))
                    .with_option("temperature", json!(0.2)),
            )
            .expect("valid request");
        assert_eq!(prepared.body["stopSequences"], json!(["\n"]));
        assert!(prepared.body.get("stop").is_none());
        assert_eq!(prepared.body["temperature"], json!(0.2));
    }

    #[test]
    fn debug_output_redacts_credential() {
        let rendered = format!("{:?}", client());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("sk-secret"));
    }

    #[test]
    fn client_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompletionClient>();
    }
}
