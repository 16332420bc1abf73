use std::io::{self, Stderr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyEvent, KeyEventKind, MouseEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use futures_util::StreamExt;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
    /// One typewriter frame
    Tick,
}

/// Merges terminal input and the reveal clock into one stream of events.
pub struct EventHandler {
    rx: UnboundedReceiver<AppEvent>,
    // set while a Tick sits unread in the channel
    tick_pending: Arc<AtomicBool>,
}

impl EventHandler {
    /// `tick_rate` paces the typewriter: one character is revealed per tick.
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = unbounded_channel();
        let tick_pending = Arc::new(AtomicBool::new(false));
        spawn_terminal_reader(tx.clone());
        spawn_ticker(tx, tick_rate, tick_pending.clone());
        Self { rx, tick_pending }
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        let event = self.rx.recv().await;
        if matches!(event, Some(AppEvent::Tick)) {
            self.tick_pending.store(false, Ordering::Release);
        }
        event
    }
}

fn translate(event: Event) -> Option<AppEvent> {
    match event {
        // Press only; some terminals also report releases
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
        Event::Mouse(mouse) => Some(AppEvent::Mouse(mouse)),
        Event::Resize(w, h) => Some(AppEvent::Resize(w, h)),
        _ => None,
    }
}

fn spawn_terminal_reader(tx: UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let mut reader = EventStream::new();
        while let Some(result) = reader.next().await {
            let event = match result {
                Ok(event) => translate(event),
                Err(err) => {
                    tracing::warn!(error = %err, "terminal event stream failed");
                    None
                }
            };
            if let Some(event) = event {
                if tx.send(event).is_err() {
                    break;
                }
            }
        }
    });
}

/// Ticks are coalesced: at most one is ever queued, so a slow frame drops
/// ticks instead of replaying them as a burst.
fn spawn_ticker(tx: UnboundedSender<AppEvent>, tick_rate: Duration, tick_pending: Arc<AtomicBool>) {
    // interval() panics on a zero period
    let period = tick_rate.max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if tx.is_closed() {
                break;
            }
            if tick_pending.swap(true, Ordering::AcqRel) {
                continue;
            }
            if tx.send(AppEvent::Tick).is_err() {
                break;
            }
        }
    });
}

pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    // Mouse capture is for wheel scrolling in the transcript
    execute!(io::stderr(), EnterAlternateScreen, EnableMouseCapture)?;
    Ok(Terminal::new(CrosstermBackend::new(io::stderr()))?)
}

pub fn restore() -> Result<()> {
    execute!(io::stderr(), DisableMouseCapture, LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// Put the terminal back before the default hook prints the panic.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore();
        default_hook(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers};

    #[test]
    fn test_translate_drops_key_releases() {
        let mut release = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        release.state = KeyEventState::NONE;
        assert!(translate(Event::Key(release)).is_none());

        let press = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        assert!(matches!(translate(Event::Key(press)), Some(AppEvent::Key(_))));
        assert!(matches!(translate(Event::Resize(80, 24)), Some(AppEvent::Resize(80, 24))));
        assert!(translate(Event::FocusGained).is_none());
    }

    fn ticks_only(tick_rate: Duration) -> EventHandler {
        let (tx, rx) = unbounded_channel();
        let tick_pending = Arc::new(AtomicBool::new(false));
        spawn_ticker(tx, tick_rate, tick_pending.clone());
        EventHandler { rx, tick_pending }
    }

    #[tokio::test]
    async fn test_ticks_flow_at_the_cadence() {
        let mut events = ticks_only(Duration::ZERO);
        assert!(matches!(events.next().await, Some(AppEvent::Tick)));
        assert!(matches!(events.next().await, Some(AppEvent::Tick)));
    }

    #[tokio::test]
    async fn test_slow_consumer_sees_one_queued_tick() {
        let mut events = ticks_only(Duration::from_millis(1));

        // Many tick periods pass without the loop reading events
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(matches!(events.next().await, Some(AppEvent::Tick)));
        assert!(events.rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(matches!(events.next().await, Some(AppEvent::Tick)));
        assert!(events.rx.try_recv().is_err());
    }
}
