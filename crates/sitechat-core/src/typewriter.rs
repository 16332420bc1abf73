//! Typewriter rendering.
//!
//! The reveal of an answer is modelled as a sequence of steps: one frame per
//! character of the plain text, then a final step that swaps in the rich
//! HTML. Stepping is separate from timing, so a UI can advance the renderer
//! from its own tick and tests can step it synchronously.

use crate::markup::RenderedAnswer;
use std::time::Duration;

/// Delay between revealed characters.
pub const DEFAULT_CADENCE: Duration = Duration::from_millis(30);

/// Reveal order of a text: yields its characters one at a time and tracks the
/// prefix shown so far.
#[derive(Debug, Clone, Default)]
pub struct RevealSteps {
    text: String,
    // byte offset of the first unrevealed char
    offset: usize,
}

impl RevealSteps {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            offset: 0,
        }
    }

    /// Text revealed so far
    pub fn revealed(&self) -> &str {
        &self.text[..self.offset]
    }
}

impl Iterator for RevealSteps {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        let ch = self.text[self.offset..].chars().next()?;
        self.offset += ch.len_utf8();
        Some(ch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.text[self.offset..].chars().count();
        (remaining, Some(remaining))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RendererState {
    #[default]
    Idle,
    Revealing,
    Settled,
}

/// Result of a single renderer step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<'a> {
    /// One more character was revealed; `revealed` is the full prefix so far.
    Frame { ch: char, revealed: &'a str },
    /// The reveal finished; the rich HTML replaces the plain text.
    Settled { html: &'a str },
}

#[derive(Debug, Default)]
pub struct Typewriter {
    state: RendererState,
    steps: RevealSteps,
    html: String,
}

impl Typewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin revealing an answer. Any previous answer is discarded.
    pub fn start(&mut self, answer: RenderedAnswer) {
        self.steps = RevealSteps::new(answer.plain);
        self.html = answer.html;
        self.state = RendererState::Revealing;
    }

    /// Advance by one step. Returns `None` unless the renderer is revealing.
    pub fn step(&mut self) -> Option<Step<'_>> {
        if self.state != RendererState::Revealing {
            return None;
        }

        match self.steps.next() {
            Some(ch) => Some(Step::Frame {
                ch,
                revealed: self.steps.revealed(),
            }),
            None => {
                self.state = RendererState::Settled;
                Some(Step::Settled { html: &self.html })
            }
        }
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn is_revealing(&self) -> bool {
        self.state == RendererState::Revealing
    }

    /// Text revealed so far
    pub fn revealed(&self) -> &str {
        self.steps.revealed()
    }
}

/// Drive a stepping function at a fixed cadence until it reports no more work.
///
/// `step` is called once immediately and then once per `cadence` for as long
/// as it returns `true`.
pub async fn drive<F>(cadence: Duration, mut step: F)
where
    F: FnMut() -> bool,
{
    while step() {
        tokio::time::sleep(cadence).await;
    }
}
