//! Chat transcript controller.
//!
//! `ChatSession` is the whole widget context: the transcript, the input
//! line, the typing indicator and the renderer. Front ends forward user
//! actions to it, dispatch the query it hands back, report the outcome with
//! [`ChatSession::resolve`] and call [`ChatSession::advance`] at the reveal
//! cadence.
//!
//! Input is disabled for the whole interval between a submit and the moment
//! the answer settles, which is what keeps at most one request in flight.

use crate::client::AskResponse;
use crate::error::ChatResult;
use crate::markup::{error_answer, render_answer};
use crate::state::{ChatMessage, ChatRole};
use crate::typewriter::{Step, Typewriter};
use tracing::{debug, warn};

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[derive(Debug)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    input: String,
    cursor: usize,
    input_enabled: bool,
    input_focused: bool,
    typing_visible: bool,
    awaiting_response: bool,
    scroll_requested: bool,
    typewriter: Typewriter,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            input: String::new(),
            cursor: 0,
            input_enabled: true,
            input_focused: true,
            typing_visible: false,
            awaiting_response: false,
            scroll_requested: false,
            typewriter: Typewriter::new(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Cursor position in the input, in characters
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn input_focused(&self) -> bool {
        self.input_focused
    }

    pub fn typing_visible(&self) -> bool {
        self.typing_visible
    }

    /// A request is in flight or an answer is still being revealed.
    pub fn is_busy(&self) -> bool {
        self.awaiting_response || self.typewriter.is_revealing()
    }

    /// Whether the transcript should be scrolled to the bottom. Clears the request.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }

    /// Submit the current input.
    ///
    /// Returns the query to dispatch, or `None` when the trimmed input is
    /// empty or a previous query has not settled yet. On success the user
    /// turn is appended, the input cleared and disabled, and the typing
    /// indicator shown, all before the caller issues the request.
    pub fn submit(&mut self) -> Option<String> {
        if self.is_busy() {
            debug!("submit ignored while a query is pending");
            return None;
        }

        let query = self.input.trim();
        if query.is_empty() {
            return None;
        }
        let query = query.to_string();

        self.messages.push(ChatMessage::user(&query));
        self.input.clear();
        self.cursor = 0;
        self.input_enabled = false;
        self.input_focused = false;
        self.typing_visible = true;
        self.awaiting_response = true;
        self.scroll_requested = true;

        Some(query)
    }

    /// Record the dispatcher's outcome and start revealing the answer.
    ///
    /// Failures render the fixed "error contacting" text; a reply without an
    /// answer renders "no response". Either way the turn completes normally.
    pub fn resolve(&mut self, outcome: ChatResult<AskResponse>) {
        if !self.awaiting_response {
            warn!("answer arrived with no pending query; ignoring");
            return;
        }

        let rendered = match outcome {
            Ok(response) => render_answer(response.answer.as_deref()),
            Err(err) => {
                warn!(error = %err, "ask request failed");
                error_answer()
            }
        };

        self.awaiting_response = false;
        self.typing_visible = false;
        self.messages.push(ChatMessage::assistant());
        self.typewriter.start(rendered);
    }

    /// Reveal one more character of the pending answer, or settle it.
    ///
    /// Returns `false` when there was nothing to do.
    pub fn advance(&mut self) -> bool {
        let Some(step) = self.typewriter.step() else {
            return false;
        };

        let message = self
            .messages
            .last_mut()
            .filter(|m| m.role == ChatRole::Assistant && !m.settled);

        let settled = match step {
            Step::Frame { ch, .. } => {
                if let Some(message) = message {
                    message.display_text.push(ch);
                }
                false
            }
            Step::Settled { html } => {
                if let Some(message) = message {
                    message.rich_html = html.to_string();
                    message.settled = true;
                }
                true
            }
        };

        self.scroll_requested = true;
        if settled {
            self.input_enabled = true;
            self.input_focused = true;
            debug!("answer settled");
        }

        true
    }

    /// Replace the input line. Ignored while input is disabled.
    pub fn set_input(&mut self, text: &str) {
        if !self.input_enabled {
            return;
        }
        self.input = text.to_string();
        self.cursor = self.input.chars().count();
    }

    pub fn insert_char(&mut self, c: char) {
        if !self.input_enabled {
            return;
        }
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if !self.input_enabled || self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.remove(byte_pos);
    }

    pub fn delete(&mut self) {
        if !self.input_enabled || self.cursor >= self.input.chars().count() {
            return;
        }
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.remove(byte_pos);
    }

    pub fn move_left(&mut self) {
        if self.input_enabled {
            self.cursor = self.cursor.saturating_sub(1);
        }
    }

    pub fn move_right(&mut self) {
        if self.input_enabled {
            self.cursor = (self.cursor + 1).min(self.input.chars().count());
        }
    }

    pub fn move_home(&mut self) {
        if self.input_enabled {
            self.cursor = 0;
        }
    }

    pub fn move_end(&mut self) {
        if self.input_enabled {
            self.cursor = self.input.chars().count();
        }
    }
}
