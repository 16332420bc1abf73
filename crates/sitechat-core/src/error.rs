use thiserror::Error;

/// Failures surfaced by the ask dispatcher and the admin reindex trigger.
///
/// None of these are fatal: the chat session maps every variant to a fixed
/// fallback message and the admin panel writes them to its log.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Malformed response body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("Request task failed: {0}")]
    TaskFailed(String),

    #[error("{0}")]
    AdminTrigger(String),
}

pub type ChatResult<T> = Result<T, ChatError>;
