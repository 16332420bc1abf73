use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use sitechat_core::markup::parse_fragments;
use sitechat_core::{ChatMessage, ChatRole, Fragment};
use crate::app::App;

/// Parse a run of text and convert **bold** markdown to styled spans
fn parse_markdown_spans(text: &str) -> Vec<Span<'static>> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            // Consume the second *
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    spans
}

/// Lines for a settled answer: links underlined with their target alongside
fn rich_lines(html: &str) -> Vec<Line<'static>> {
    let link_style = Style::default()
        .fg(Color::Blue)
        .add_modifier(Modifier::UNDERLINED);

    let mut lines = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();

    for fragment in parse_fragments(html) {
        match fragment {
            Fragment::Text(text) => spans.extend(parse_markdown_spans(&text)),
            Fragment::Link { label, href } => {
                spans.push(Span::styled(label.replace('\n', " "), link_style));
                spans.push(Span::styled(
                    format!(" ({})", href),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            Fragment::LineBreak => lines.push(Line::from(std::mem::take(&mut spans))),
        }
    }

    lines.push(Line::from(spans));
    lines
}

/// Every line a message occupies in the transcript, including its role
/// label and the trailing blank line.
pub fn message_lines(msg: &ChatMessage) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    match msg.role {
        ChatRole::User => {
            lines.push(Line::from(Span::styled(
                "You:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
            for line in msg.display_text.split('\n') {
                lines.push(Line::from(line.to_string()));
            }
        }
        ChatRole::Assistant => {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            if msg.settled {
                lines.extend(rich_lines(&msg.rich_html));
            } else {
                // Plain text while revealing; markup only appears once settled
                let mut revealed: Vec<Line<'static>> = msg
                    .display_text
                    .split('\n')
                    .map(|line| Line::from(line.to_string()))
                    .collect();
                if let Some(last) = revealed.last_mut() {
                    last.push_span(Span::styled("▌", Style::default().fg(Color::DarkGray)));
                }
                lines.extend(revealed);
            }
        }
    }

    lines.push(Line::default());
    lines
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, body_area);
    render_footer(app, frame, footer_area);

    if app.show_admin {
        render_admin_panel(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Site Assistant ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.client.endpoint().to_string(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let (mode_text, mode_style) = if app.show_admin {
        (" ADMIN ", Style::default().bg(Color::Magenta).fg(Color::White))
    } else if app.session.is_busy() {
        (" WAIT ", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White))
    };

    let hints = if app.show_admin {
        vec![
            Span::styled(" Ctrl+R ", key_style),
            Span::styled(" rerun ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" close ", label_style),
        ]
    } else {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" ask ", label_style),
            Span::styled(" PgUp/PgDn ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Ctrl+R ", key_style),
            Span::styled(" reindex ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" quit ", label_style),
        ]
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, typing_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Chat ");

    let chat_text = if app.session.messages().is_empty() {
        Text::from(Span::styled(
            "Ask a question about the site...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::from(
            app.session
                .messages()
                .iter()
                .flat_map(message_lines)
                .collect::<Vec<_>>(),
        )
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    if app.session.typing_visible() {
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        let typing = Paragraph::new(Span::styled(
            format!(" 💬 Typing{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ));
        frame.render_widget(typing, typing_area);
    }

    render_input(app, frame, input_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let enabled = app.session.input_enabled();
    let border_color = if enabled && app.session.input_focused() {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Ask ");

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.session.cursor();

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if app.session.input().is_empty() && enabled {
        Paragraph::new("Ask me anything...").style(Style::default().fg(Color::DarkGray))
    } else {
        let visible_text: String = app
            .session
            .input()
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        let color = if enabled { Color::Cyan } else { Color::DarkGray };
        Paragraph::new(visible_text).style(Style::default().fg(color))
    };

    frame.render_widget(input.block(input_block), area);

    if enabled && app.session.input_focused() && !app.show_admin {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_admin_panel(app: &App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 70.min(area.width.saturating_sub(4));
    let popup_height = 16.min(area.height.saturating_sub(2));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" AI Search Index ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let [button_area, log_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(0),
    ])
    .areas(inner);

    let button_style = if app.admin.is_busy() {
        Style::default().bg(Color::DarkGray).fg(Color::Gray)
    } else {
        Style::default().bg(Color::Magenta).fg(Color::White).bold()
    };
    let button = Paragraph::new(Span::styled(
        format!(" {} ", app.admin.button_label()),
        button_style,
    ));
    frame.render_widget(button, button_area);

    // Keep the tail of the log in view
    let log_lines = app.admin.log().lines().count() as u16;
    let log_scroll = log_lines.saturating_sub(log_area.height);
    let log = Paragraph::new(app.admin.log().to_string())
        .wrap(Wrap { trim: false })
        .scroll((log_scroll, 0));
    frame.render_widget(log, log_area);
}
