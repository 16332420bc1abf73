//! UI-agnostic chat state types
//!
//! Shared by every front end; nothing here depends on a UI framework.

use crate::markup::escape_html;
use serde::{Deserialize, Serialize};

/// A message in the chat transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    /// Plain text shown while the message is being revealed
    pub display_text: String,
    /// Sanitized HTML shown once the message has settled
    pub rich_html: String,
    pub settled: bool,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatMessage {
    /// A user turn. The query is kept as literal text and never read as markup.
    pub fn user(query: &str) -> Self {
        Self {
            role: ChatRole::User,
            display_text: query.to_string(),
            rich_html: escape_html(query),
            settled: true,
        }
    }

    /// An empty assistant turn waiting for its answer to be revealed.
    pub fn assistant() -> Self {
        Self {
            role: ChatRole::Assistant,
            display_text: String::new(),
            rich_html: String::new(),
            settled: false,
        }
    }
}
