use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug)]
pub(crate) enum RequestFailure {
    Request(reqwest::Error),
    Api { status: StatusCode, body: String },
}

/// Builds the blocking HTTP client, applying the transport timeout if set.
pub(crate) fn build_http_client(timeout: Option<Duration>) -> Client {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("failed to build HTTP client, using defaults: {err}");
        Client::new()
    })
}

/// Sends one completion request. No retry: any failure is returned as is.
pub(crate) fn send_completion_request<T: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    api_key: &str,
    payload: &T,
) -> Result<Value, RequestFailure> {
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .json(payload)
        .send()
        .map_err(RequestFailure::Request)?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().unwrap_or_default();
        return Err(RequestFailure::Api { status, body });
    }

    response.json().map_err(RequestFailure::Request)
}
