use crate::error::ChatResult;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_ASK_URL: &str = "https://example.com/ai/ask";

#[derive(Serialize)]
struct AskRequest<'a> {
    query: &'a str,
}

/// What the ask endpoint sent back.
///
/// Every field is optional: any JSON shape is accepted and a missing or
/// non-string `answer` simply renders the "no response" fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AskResponse {
    pub answer: Option<String>,
    /// Reported by the backend when embedding, search or completion failed
    pub error: Option<String>,
}

impl AskResponse {
    pub fn from_value(value: &Value) -> Self {
        let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);
        Self {
            answer: field("answer"),
            error: field("error"),
        }
    }
}

/// Dispatches chat queries to the configured ask endpoint.
#[derive(Clone)]
pub struct AskClient {
    client: Client,
    endpoint: String,
}

impl AskClient {
    pub fn new(endpoint: &str) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    /// Use an already configured HTTP client.
    pub fn with_client(client: Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }

    /// Like [`AskClient::new`], with an optional overall request timeout.
    pub fn with_timeout(endpoint: &str, timeout: Option<Duration>) -> ChatResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self::with_client(builder.build()?, endpoint))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST `{"query": ...}` as JSON and parse the JSON reply.
    ///
    /// The status code is not checked: a JSON error page with an `answer`
    /// field is still an answer. Transport failures and non-JSON bodies are
    /// errors; there is no retry.
    pub async fn ask(&self, query: &str) -> ChatResult<AskResponse> {
        debug!(endpoint = %self.endpoint, chars = query.chars().count(), "dispatching query");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&AskRequest { query })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "ask endpoint returned a non-success status");
        }

        let body = response.text().await?;
        let value: Value = serde_json::from_str(&body)?;
        let parsed = AskResponse::from_value(&value);

        if let Some(error) = &parsed.error {
            warn!(%error, "ask endpoint reported an error");
        }
        debug!(has_answer = parsed.answer.is_some(), "ask endpoint replied");

        Ok(parsed)
    }
}
