use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Quit,

    // Playback
    TogglePlayPause,
    Pause,
    NextTrack,
    PreviousTrack,
    PlayIndex(usize),

    // Library
    RefreshLibrary,
    ListLibrary,
}

pub struct EventHandler {
    event_sender: mpsc::UnboundedSender<AppEvent>,
    event_receiver: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();

        Self {
            event_sender,
            event_receiver,
        }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.event_sender.clone()
    }

    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.event_receiver.recv().await
    }

    /// Reads keys on a plain thread (crossterm blocks) until the receiver goes away.
    pub fn spawn_key_reader(&self) {
        let sender = self.sender();
        thread::spawn(move || loop {
            if sender.is_closed() {
                break;
            }
            match event::poll(Duration::from_millis(100)) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        if let Some(app_event) = key_to_app_event(key) {
                            if sender.send(app_event).is_err() {
                                break;
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Terminal read failed: {}", e);
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    warn!("Terminal poll failed: {}", e);
                    break;
                }
            }
        });
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

pub fn key_to_app_event(key: KeyEvent) -> Option<AppEvent> {
    match key.code {
        // Raw mode swallows SIGINT
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(AppEvent::Quit),
        KeyCode::Char('q') | KeyCode::Esc => Some(AppEvent::Quit),

        KeyCode::Char(' ') => Some(AppEvent::TogglePlayPause),
        KeyCode::Char('p') => Some(AppEvent::Pause),
        KeyCode::Char('n') | KeyCode::Right => Some(AppEvent::NextTrack),
        KeyCode::Char('b') | KeyCode::Left => Some(AppEvent::PreviousTrack),
        KeyCode::Char(c @ '1'..='9') => c.to_digit(10).map(|d| AppEvent::PlayIndex(d as usize - 1)),

        KeyCode::Char('r') | KeyCode::F(5) => Some(AppEvent::RefreshLibrary),
        KeyCode::Char('l') => Some(AppEvent::ListLibrary),

        _ => None,
    }
}
