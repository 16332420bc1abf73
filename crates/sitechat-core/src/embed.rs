//! Host page integration.
//!
//! Markup the host platform emits for the chat shortcode and the admin
//! panel, and the asset list it enqueues. Element IDs here are the anchors
//! the client widget looks up, so they must stay in sync with it.

use crate::markup::escape_html;
use serde_json::json;

pub const SHORTCODE: &str = "ai_chat";

pub const CONTAINER_ID: &str = "ai-chat-container";
pub const MESSAGES_ID: &str = "ai-chat-messages";
pub const TYPING_ID: &str = "ai-typing";
pub const INPUT_ROW_ID: &str = "ai-chat-input";
pub const QUERY_ID: &str = "ai-query";
pub const SUBMIT_ID: &str = "ai-submit";

pub const INDEX_TRIGGER_ID: &str = "ai-index-trigger";
pub const INDEX_LOG_ID: &str = "ai-index-log";

const ASSET_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Script,
    Style,
}

/// A script or stylesheet the page should load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub kind: AssetKind,
    pub handle: &'static str,
    pub src: String,
    pub version: &'static str,
    /// Scripts load at the end of the body
    pub in_footer: bool,
}

impl Asset {
    pub fn to_tag(&self) -> String {
        let src = escape_html(&format!("{}?ver={}", self.src, self.version));
        match self.kind {
            AssetKind::Script => format!(r#"<script id="{}" src="{}"></script>"#, self.handle, src),
            AssetKind::Style => format!(
                r#"<link rel="stylesheet" id="{}" href="{}" media="all" />"#,
                self.handle, src
            ),
        }
    }
}

/// The page being rendered, as far as asset enqueueing cares.
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    /// A single post or page rather than an archive or listing
    pub singular: bool,
    pub content: &'a str,
}

/// Whether `content` uses the `[ai_chat]` shortcode (with or without attributes).
pub fn has_shortcode(content: &str) -> bool {
    let opener = format!("[{}", SHORTCODE);
    content.match_indices(&opener).any(|(start, _)| {
        content[start + opener.len()..]
            .chars()
            .next()
            .is_some_and(|c| c == ']' || c == '/' || c.is_whitespace())
    })
}

/// Assets to enqueue: the widget script and style, only on singular pages
/// whose content contains the chat shortcode.
pub fn enqueue_assets(page: Page<'_>, plugin_url: &str) -> Vec<Asset> {
    if !page.singular || !has_shortcode(page.content) {
        return Vec::new();
    }

    let base = plugin_url.trim_end_matches('/');
    vec![
        Asset {
            kind: AssetKind::Script,
            handle: "wp-ai-chat-js",
            src: format!("{}/js/ai-chat.js", base),
            version: ASSET_VERSION,
            in_footer: true,
        },
        Asset {
            kind: AssetKind::Style,
            handle: "wp-ai-chat-css",
            src: format!("{}/css/ai-chat.css", base),
            version: ASSET_VERSION,
            in_footer: false,
        },
    ]
}

/// Markup the `[ai_chat]` shortcode expands to.
pub fn render_chat_widget() -> String {
    format!(
        r#"<div id="{CONTAINER_ID}">
    <div id="{MESSAGES_ID}"></div>
    <div id="{TYPING_ID}" style="display:none;">💬 Typing...</div>
    <div id="{INPUT_ROW_ID}">
        <input type="text" id="{QUERY_ID}" placeholder="Ask me anything..." />
        <button id="{SUBMIT_ID}">Ask</button>
    </div>
</div>
"#
    )
}

/// Markup for the admin reindex panel.
pub fn render_admin_panel() -> String {
    format!(
        r#"<div class="wrap">
    <h1>AI Search Index</h1>
    <button id="{INDEX_TRIGGER_ID}" class="button button-primary">Reindex Now</button>
    <pre id="{INDEX_LOG_ID}"></pre>
</div>
"#
    )
}

/// Inline script handing the AJAX endpoint and nonce to the admin script.
pub fn admin_script_data(ajax_url: &str, nonce: &str) -> String {
    let data = json!({ "ajax_url": ajax_url, "nonce": nonce });
    // keep a "</script>" inside a value from closing the tag
    let encoded = data.to_string().replace("</", "<\\/");
    format!("var AIIndexAjax = {};", encoded)
}
