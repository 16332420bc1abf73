pub mod admin;
pub mod client;
pub mod config;
pub mod embed;
pub mod error;
pub mod markup;
pub mod session;
pub mod state;
pub mod typewriter;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use admin::{AdminPanel, IndexOutput, ReindexTrigger};
pub use client::{AskClient, AskResponse};
pub use config::Config;
pub use error::{ChatError, ChatResult};
pub use markup::{render_answer, Fragment, RenderedAnswer};
pub use session::ChatSession;
pub use state::{ChatMessage, ChatRole};
pub use typewriter::{RendererState, Step, Typewriter};
