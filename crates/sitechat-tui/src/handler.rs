use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::App;
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => app.scroll_to_bottom(),
        AppEvent::Tick => app.tick().await,
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys that work in any mode
    if ctrl && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }
    if ctrl && key.code == KeyCode::Char('r') {
        app.start_reindex();
        return;
    }

    if app.show_admin {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q')) {
            app.close_admin();
        }
        return;
    }

    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Enter => app.submit_query(),
        KeyCode::PageUp => app.scroll_up(),
        KeyCode::PageDown => app.scroll_down(),
        KeyCode::Backspace => app.session.backspace(),
        KeyCode::Delete => app.session.delete(),
        KeyCode::Left => app.session.move_left(),
        KeyCode::Right => app.session.move_right(),
        KeyCode::Home => app.session.move_home(),
        KeyCode::End => app.session.move_end(),
        KeyCode::Char(c) if !ctrl => app.session.insert_char(c),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.chat_scroll = app.chat_scroll.saturating_sub(1),
        MouseEventKind::ScrollDown => app.chat_scroll = app.chat_scroll.saturating_add(1),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitechat_core::Config;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, modifiers))
    }

    #[tokio::test]
    async fn test_typing_edits_input() {
        let mut app = App::new(&Config::new()).unwrap();
        for c in "hi".chars() {
            handle_event(&mut app, key(KeyCode::Char(c), KeyModifiers::NONE)).await.unwrap();
        }
        handle_event(&mut app, key(KeyCode::Backspace, KeyModifiers::NONE)).await.unwrap();
        assert_eq!(app.session.input(), "h");
    }

    #[tokio::test]
    async fn test_admin_popup_swallows_keys() {
        let mut app = App::new(&Config::new()).unwrap();
        handle_event(&mut app, key(KeyCode::Char('r'), KeyModifiers::CONTROL)).await.unwrap();
        assert!(app.show_admin);

        handle_event(&mut app, key(KeyCode::Char('x'), KeyModifiers::NONE)).await.unwrap();
        assert_eq!(app.session.input(), "");

        handle_event(&mut app, key(KeyCode::Esc, KeyModifiers::NONE)).await.unwrap();
        assert!(!app.show_admin);
        assert!(!app.should_quit);

        handle_event(&mut app, key(KeyCode::Esc, KeyModifiers::NONE)).await.unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_ctrl_c_quits() {
        let mut app = App::new(&Config::new()).unwrap();
        handle_event(&mut app, key(KeyCode::Char('c'), KeyModifiers::CONTROL)).await.unwrap();
        assert!(app.should_quit);
    }
}
