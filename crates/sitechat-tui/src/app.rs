use sitechat_core::config::{ENV_AJAX_URL, ENV_NONCE};
use sitechat_core::{
    AdminPanel, AskClient, AskResponse, ChatError, ChatResult, ChatSession, Config, IndexOutput,
    ReindexTrigger,
};
use tokio::task::JoinHandle;
use tracing::{error, info};
use crate::ui;

/// Ticks per frame of the "Typing..." ellipsis
const ELLIPSIS_TICKS: u32 = 10;

pub struct App {
    // Core state
    pub should_quit: bool,

    // Chat widget
    pub session: ChatSession,
    pub client: AskClient,
    pub query_task: Option<JoinHandle<ChatResult<AskResponse>>>,

    // Admin reindex panel
    pub admin: AdminPanel,
    pub show_admin: bool,
    pub reindex: Option<ReindexTrigger>,
    pub admin_task: Option<JoinHandle<ChatResult<IndexOutput>>>,

    // Transcript viewport, updated during render
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
    tick_count: u32,
}

impl App {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = AskClient::with_timeout(&config.api_url, config.request_timeout())?;

        let reindex = match (&config.ajax_url, &config.nonce) {
            (Some(url), Some(nonce)) => Some(ReindexTrigger::new(url, nonce)),
            _ => None,
        };

        Ok(Self {
            should_quit: false,

            session: ChatSession::new(),
            client,
            query_task: None,

            admin: AdminPanel::new(),
            show_admin: false,
            reindex,
            admin_task: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,
            tick_count: 0,
        })
    }

    /// Submit the input line and dispatch the query in the background.
    pub fn submit_query(&mut self) {
        // Input is locked inside submit(), before the request is spawned
        let Some(query) = self.session.submit() else {
            return;
        };

        info!(endpoint = self.client.endpoint(), "query submitted");
        let client = self.client.clone();
        self.query_task = Some(tokio::spawn(async move { client.ask(&query).await }));
        self.scroll_to_bottom();
    }

    /// Called on every tick: collect finished requests, reveal one character.
    pub async fn tick(&mut self) {
        self.tick_count = self.tick_count.wrapping_add(1);
        if self.session.typing_visible() && self.tick_count % ELLIPSIS_TICKS == 0 {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }

        self.poll_query().await;
        self.poll_reindex().await;

        self.session.advance();
        if self.session.take_scroll_request() {
            self.scroll_to_bottom();
        }
    }

    async fn poll_query(&mut self) {
        if !self.query_task.as_ref().is_some_and(|task| task.is_finished()) {
            return;
        }
        let Some(task) = self.query_task.take() else {
            return;
        };

        let outcome = task.await.unwrap_or_else(|err| {
            error!(error = %err, "query task failed");
            Err(ChatError::TaskFailed(err.to_string()))
        });
        self.session.resolve(outcome);
    }

    async fn poll_reindex(&mut self) {
        if !self.admin_task.as_ref().is_some_and(|task| task.is_finished()) {
            return;
        }
        let Some(task) = self.admin_task.take() else {
            return;
        };

        let outcome = task.await.unwrap_or_else(|err| {
            error!(error = %err, "reindex task failed");
            Err(ChatError::TaskFailed(err.to_string()))
        });
        self.admin.finish(outcome);
    }

    /// Open the admin panel and start a reindex run unless one is running.
    pub fn start_reindex(&mut self) {
        self.show_admin = true;
        if !self.admin.begin() {
            return;
        }

        match self.reindex.clone() {
            Some(trigger) => {
                self.admin_task = Some(tokio::spawn(async move { trigger.trigger().await }));
            }
            None => self.admin.finish(Err(ChatError::AdminTrigger(format!(
                "no AJAX endpoint configured (set {} and {})",
                ENV_AJAX_URL, ENV_NONCE
            )))),
        }
    }

    pub fn close_admin(&mut self) {
        self.show_admin = false;
    }

    /// Scroll the transcript so the newest line is visible
    pub fn scroll_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;
        for msg in self.session.messages() {
            for line in ui::message_lines(msg) {
                // Empty line still takes one row
                let rows = (line.width() / wrap_width) + 1;
                total_lines = total_lines.saturating_add(rows as u16);
            }
        }

        if self.session.typing_visible() {
            total_lines = total_lines.saturating_add(1);
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    pub fn scroll_up(&mut self) {
        let step = (self.chat_height / 2).max(1);
        self.chat_scroll = self.chat_scroll.saturating_sub(step);
    }

    pub fn scroll_down(&mut self) {
        let step = (self.chat_height / 2).max(1);
        self.chat_scroll = self.chat_scroll.saturating_add(step);
    }
}
