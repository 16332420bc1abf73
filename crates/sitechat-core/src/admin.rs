//! Admin reindex trigger.
//!
//! The host platform exposes the reindex job through its AJAX bridge. The
//! bridge URL and the CSRF nonce are injected by the caller.

use crate::error::{ChatError, ChatResult};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

/// AJAX action name registered by the host for the reindex job
pub const INDEX_ACTION: &str = "ai_index_trigger";

const IDLE_LABEL: &str = "Reindex Now";
const BUSY_LABEL: &str = "Reindexing...";

/// The bridge's response envelope: `{ success, data }`
#[derive(Deserialize)]
struct AjaxEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Value,
}

/// Output captured from the indexing job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IndexOutput {
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
}

#[derive(Clone)]
pub struct ReindexTrigger {
    client: Client,
    ajax_url: String,
    nonce: String,
}

impl ReindexTrigger {
    pub fn new(ajax_url: &str, nonce: &str) -> Self {
        Self::with_client(Client::new(), ajax_url, nonce)
    }

    /// Use an already configured HTTP client.
    pub fn with_client(client: Client, ajax_url: &str, nonce: &str) -> Self {
        Self {
            client,
            ajax_url: ajax_url.to_string(),
            nonce: nonce.to_string(),
        }
    }

    /// POST the reindex action as a form and interpret the envelope.
    pub async fn trigger(&self) -> ChatResult<IndexOutput> {
        info!(url = %self.ajax_url, "triggering reindex");

        let response = self
            .client
            .post(&self.ajax_url)
            .form(&[("action", INDEX_ACTION), ("nonce", self.nonce.as_str())])
            .send()
            .await?;

        let body = response.text().await?;
        let envelope: AjaxEnvelope = serde_json::from_str(&body)?;
        interpret_envelope(envelope)
    }
}

fn interpret_envelope(envelope: AjaxEnvelope) -> ChatResult<IndexOutput> {
    if envelope.success {
        // `response` is itself a JSON document encoded as a string
        let response = envelope.data.get("response").cloned().unwrap_or(Value::Null);
        let encoded: String = serde_json::from_value(response)?;
        Ok(serde_json::from_str(&encoded)?)
    } else {
        let message = envelope
            .data
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        Err(ChatError::AdminTrigger(message.to_string()))
    }
}

/// State of the admin reindex panel: the button and its log area.
#[derive(Debug, Default)]
pub struct AdminPanel {
    busy: bool,
    log: String,
}

impl AdminPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn button_label(&self) -> &'static str {
        if self.busy {
            BUSY_LABEL
        } else {
            IDLE_LABEL
        }
    }

    pub fn log(&self) -> &str {
        &self.log
    }

    /// Start a run. Returns `false` if one is already in progress.
    pub fn begin(&mut self) -> bool {
        if self.busy {
            return false;
        }
        self.busy = true;
        self.log = "⏳ Starting indexing...\n".to_string();
        true
    }

    /// Append the outcome of a run to the log and release the button.
    pub fn finish(&mut self, outcome: ChatResult<IndexOutput>) {
        match outcome {
            Ok(output) => {
                info!("reindex complete");
                self.log.push_str("✅ Indexing complete.\n\n");
                match output.stdout.as_deref().filter(|s| !s.is_empty()) {
                    Some(stdout) => self.log.push_str(stdout),
                    None => self.log.push_str("(no stdout)"),
                }
                if let Some(stderr) = output.stderr.as_deref().filter(|s| !s.is_empty()) {
                    self.log.push_str("\n⚠️ Errors:\n");
                    self.log.push_str(stderr);
                }
            }
            Err(ChatError::AdminTrigger(message)) => {
                warn!(%message, "reindex reported failure");
                self.log.push_str("❌ Error: ");
                self.log.push_str(&message);
            }
            Err(err) => {
                warn!(error = %err, "reindex request failed");
                self.log.push_str("❌ Request failed: ");
                self.log.push_str(&err.to_string());
            }
        }
        self.busy = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{closed_port_url, direct_client, serve_once};

    fn envelope(json: &str) -> AjaxEnvelope {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_success_decodes_nested_output() {
        let output = interpret_envelope(envelope(
            r#"{"success":true,"data":{"response":"{\"stdout\":\"Indexed 12 pages\",\"stderr\":\"\"}"}}"#,
        ))
        .unwrap();
        assert_eq!(output.stdout.as_deref(), Some("Indexed 12 pages"));
        assert_eq!(output.stderr.as_deref(), Some(""));
    }

    #[test]
    fn test_failure_carries_server_error() {
        let err = interpret_envelope(envelope(
            r#"{"success":false,"data":{"error":"Invalid nonce"}}"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ChatError::AdminTrigger(ref m) if m == "Invalid nonce"));
    }

    #[test]
    fn test_undecodable_output_is_a_request_failure() {
        let err = interpret_envelope(envelope(r#"{"success":true,"data":{"response":"oops"}}"#))
            .unwrap_err();
        assert!(matches!(err, ChatError::MalformedBody(_)));
    }

    #[test]
    fn test_missing_job_output_is_a_request_failure() {
        for json in [
            r#"{"success":true,"data":{}}"#,
            r#"{"success":true,"data":{"response":42}}"#,
            r#"{"success":true}"#,
        ] {
            let outcome = interpret_envelope(envelope(json));
            assert!(matches!(outcome, Err(ChatError::MalformedBody(_))), "{}", json);

            let mut panel = AdminPanel::new();
            panel.begin();
            panel.finish(outcome);
            assert!(panel.log().contains("❌ Request failed: Malformed response body"));
            assert!(!panel.log().contains("❌ Error:"));
        }
    }

    #[test]
    fn test_panel_log_on_success() {
        let mut panel = AdminPanel::new();
        assert_eq!(panel.button_label(), "Reindex Now");

        assert!(panel.begin());
        assert!(!panel.begin());
        assert_eq!(panel.button_label(), "Reindexing...");
        assert_eq!(panel.log(), "⏳ Starting indexing...\n");

        panel.finish(Ok(IndexOutput {
            stdout: Some("done".to_string()),
            stderr: Some("2 skipped".to_string()),
        }));
        assert_eq!(
            panel.log(),
            "⏳ Starting indexing...\n✅ Indexing complete.\n\ndone\n⚠️ Errors:\n2 skipped"
        );
        assert!(!panel.is_busy());
        assert_eq!(panel.button_label(), "Reindex Now");
    }

    #[test]
    fn test_panel_log_without_stdout() {
        let mut panel = AdminPanel::new();
        panel.begin();
        panel.finish(Ok(IndexOutput::default()));
        assert!(panel.log().ends_with("✅ Indexing complete.\n\n(no stdout)"));
    }

    #[test]
    fn test_panel_log_on_failures() {
        let mut panel = AdminPanel::new();
        panel.begin();
        panel.finish(Err(ChatError::AdminTrigger("Invalid nonce".to_string())));
        assert!(panel.log().ends_with("❌ Error: Invalid nonce"));

        panel.begin();
        panel.finish(Err(ChatError::TaskFailed("cancelled".to_string())));
        assert_eq!(
            panel.log(),
            "⏳ Starting indexing...\n❌ Request failed: Request task failed: cancelled"
        );
    }

    #[tokio::test]
    async fn test_trigger_posts_form_with_nonce() {
        let (url, server) = serve_once(
            "application/json",
            r#"{"success":true,"data":{"response":"{\"stdout\":\"ok\"}"}}"#,
        )
        .await;

        let output = ReindexTrigger::with_client(direct_client(), &url, "abc123").trigger().await.unwrap();
        assert_eq!(output.stdout.as_deref(), Some("ok"));
        assert_eq!(output.stderr, None);

        let request = server.await.unwrap();
        assert!(request.request_line().starts_with("POST "));
        assert_eq!(
            request.header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(request.body, "action=ai_index_trigger&nonce=abc123");
    }

    #[tokio::test]
    async fn test_trigger_transport_failure() {
        let url = closed_port_url().await;
        let err = ReindexTrigger::with_client(direct_client(), &url, "n").trigger().await.unwrap_err();
        assert!(matches!(err, ChatError::Network(_)));
    }
}
