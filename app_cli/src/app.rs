use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use room::{SessionCommand, SessionSnapshot};
use room_core::{Position, SessionEvent};
use std::collections::VecDeque;

/// How many recent session events the UI keeps around
const EVENT_HISTORY: usize = 8;

/// Interactive app state
pub struct App {
    /// Whether the app should exit
    pub should_quit: bool,
    /// Where the listener is being steered to
    pub listener: Position,
    /// Canvas units moved per key press
    pub step: f32,
    /// Clip to attach when replying, if any
    pub reply_clip: Option<String>,
    /// Last state reported by the session
    pub snapshot: Option<SessionSnapshot>,
    /// Most recent session events, newest last
    pub events: VecDeque<String>,
    /// One-line status shown in the footer
    pub status: String,
}

impl App {
    pub fn new(listener: Position, step: f32, reply_clip: Option<String>) -> Self {
        Self {
            should_quit: false,
            listener,
            step,
            reply_clip,
            snapshot: None,
            events: VecDeque::with_capacity(EVENT_HISTORY),
            status: "Arrows move, m mutes, r replies, q quits".to_string(),
        }
    }

    /// Map a key press to the session command it triggers, if any.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<SessionCommand> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        let (dx, dy) = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                return None;
            }
            KeyCode::Char('m') => {
                let muted = self.snapshot.as_ref().is_some_and(|s| s.muted);
                return Some(SessionCommand::SetMuted(!muted));
            }
            KeyCode::Char('r') => return self.reply(),
            KeyCode::Left => (-self.step, 0.0),
            KeyCode::Right => (self.step, 0.0),
            KeyCode::Up => (0.0, -self.step),
            KeyCode::Down => (0.0, self.step),
            _ => return None,
        };

        self.listener = Position::new(self.listener.x + dx, self.listener.y + dy);
        Some(SessionCommand::MoveListener {
            x: self.listener.x,
            y: self.listener.y,
        })
    }

    fn reply(&mut self) -> Option<SessionCommand> {
        let Some(clip) = self.reply_clip.clone() else {
            self.status = "No reply clip configured (--reply-clip)".to_string();
            return None;
        };

        match self.snapshot.as_ref() {
            Some(SessionSnapshot {
                focused: Some(parent),
                reply_unlocked: true,
                ..
            }) => {
                self.status = format!("Replying to {}", parent);
                Some(SessionCommand::AddReply {
                    parent: parent.clone(),
                    audio_url: clip,
                })
            }
            _ => {
                self.status = "Linger near a node to unlock reply".to_string();
                None
            }
        }
    }

    pub fn on_event(&mut self, event: &SessionEvent) {
        if self.events.len() == EVENT_HISTORY {
            self.events.pop_front();
        }
        self.events.push_back(event.to_string());
    }

    pub fn on_snapshot(&mut self, snapshot: SessionSnapshot) {
        self.snapshot = Some(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use room_core::SourceId;

    fn snapshot(focused: Option<&str>, reply_unlocked: bool, muted: bool) -> SessionSnapshot {
        SessionSnapshot {
            listener: Position::default(),
            nodes: Vec::new(),
            distances: Default::default(),
            gains: Vec::new(),
            focused: focused.map(|id| SourceId::new(id).unwrap()),
            reply_unlocked,
            blur: 1.0,
            muted,
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_quit_event_handling() {
        let mut app = App::new(Position::default(), 10.0, None);
        assert!(app.handle_key(press(KeyCode::Char('q'))).is_none());
        assert!(app.should_quit);

        app.should_quit = false;
        app.handle_key(press(KeyCode::Esc));
        assert!(app.should_quit);

        app.should_quit = false;
        app.handle_key(press(KeyCode::Char('x')));
        assert!(!app.should_quit);
    }

    #[test]
    fn test_arrows_move_listener() {
        let mut app = App::new(Position::new(100.0, 100.0), 10.0, None);

        app.handle_key(press(KeyCode::Right));
        app.handle_key(press(KeyCode::Right));
        let command = app.handle_key(press(KeyCode::Up));

        assert!(matches!(
            command,
            Some(SessionCommand::MoveListener { x, y }) if x == 120.0 && y == 90.0
        ));
        assert_eq!(app.listener, Position::new(120.0, 90.0));
    }

    #[test]
    fn test_mute_toggles_from_last_snapshot() {
        let mut app = App::new(Position::default(), 10.0, None);
        assert!(matches!(
            app.handle_key(press(KeyCode::Char('m'))),
            Some(SessionCommand::SetMuted(true))
        ));

        app.on_snapshot(snapshot(None, false, true));
        assert!(matches!(
            app.handle_key(press(KeyCode::Char('m'))),
            Some(SessionCommand::SetMuted(false))
        ));
    }

    #[test]
    fn test_reply_requires_unlock_and_clip() {
        let mut app = App::new(Position::default(), 10.0, None);
        app.on_snapshot(snapshot(Some("a"), true, false));
        assert!(app.handle_key(press(KeyCode::Char('r'))).is_none());
        assert!(app.status.contains("--reply-clip"));

        let mut app = App::new(Position::default(), 10.0, Some("reply.wav".to_string()));
        app.on_snapshot(snapshot(Some("a"), false, false));
        assert!(app.handle_key(press(KeyCode::Char('r'))).is_none());

        app.on_snapshot(snapshot(Some("a"), true, false));
        match app.handle_key(press(KeyCode::Char('r'))) {
            Some(SessionCommand::AddReply { parent, audio_url }) => {
                assert_eq!(parent.as_str(), "a");
                assert_eq!(audio_url, "reply.wav");
            }
            other => panic!("Expected AddReply, got {:?}", other),
        }
    }

    #[test]
    fn test_event_history_is_bounded() {
        let mut app = App::new(Position::default(), 10.0, None);
        for i in 0..20 {
            app.on_event(&SessionEvent::MuteChanged(i % 2 == 0));
        }
        assert_eq!(app.events.len(), EVENT_HISTORY);
        assert_eq!(app.events.back().map(String::as_str), Some("unmuted"));
    }
}
