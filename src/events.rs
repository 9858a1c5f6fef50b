use std::collections::VecDeque;

use bevy::prelude::*;
use serde::Serialize;

const MAX_EVENTS: usize = 256;

/// Notification emitted by the simulation (kills, level-ups, hits, world changes).
#[derive(Serialize, Clone, Debug)]
pub struct GameEvent {
    pub name: String,
    pub data: serde_json::Value,
    pub frame: u64,
}

/// Bounded log of recent notifications. The HUD, telemetry and the scripted
/// simulation all read from it; nothing in the tick depends on it.
#[derive(Default)]
pub struct GameEventBus {
    pub recent: VecDeque<GameEvent>,
    pub frame: u64,
    pub dropped_events: u64,
    last_overflow_log_frame: u64,
}

impl GameEventBus {
    pub fn emit(&mut self, name: impl Into<String>, data: serde_json::Value) {
        self.recent.push_back(GameEvent {
            name: name.into(),
            data,
            frame: self.frame,
        });
        if self.recent.len() > MAX_EVENTS {
            let excess = self.recent.len() - MAX_EVENTS;
            self.recent.drain(..excess);
            self.dropped_events = self.dropped_events.saturating_add(excess as u64);
            if self.frame.saturating_sub(self.last_overflow_log_frame) >= 60 {
                self.last_overflow_log_frame = self.frame;
                warn!(
                    "[Realmfall events] Dropped {} buffered events (total dropped: {})",
                    excess, self.dropped_events
                );
            }
        }
    }

    pub fn advance_frame(&mut self) {
        self.frame = self.frame.saturating_add(1);
    }

    /// Events emitted during the current frame.
    pub fn current_frame(&self) -> impl Iterator<Item = &GameEvent> {
        let frame = self.frame;
        self.recent
            .iter()
            .rev()
            .take_while(move |e| e.frame == frame)
    }

    pub fn count(&self, name: &str) -> usize {
        self.recent.iter().filter(|e| e.name == name).count()
    }

    pub fn last(&self, name: &str) -> Option<&GameEvent> {
        self.recent.iter().rev().find(|e| e.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_bus_tracks_dropped_events() {
        let mut bus = GameEventBus::default();
        for i in 0..(MAX_EVENTS + 25) {
            bus.emit("test", serde_json::json!({ "i": i }));
        }
        assert_eq!(bus.recent.len(), MAX_EVENTS);
        assert_eq!(bus.dropped_events, 25);
        assert_eq!(bus.recent.front().map(|e| e.data["i"].as_u64()), Some(Some(25)));
    }

    #[test]
    fn current_frame_only_yields_latest_frame() {
        let mut bus = GameEventBus::default();
        bus.emit("old", serde_json::json!({}));
        bus.advance_frame();
        bus.emit("new_a", serde_json::json!({}));
        bus.emit("new_b", serde_json::json!({}));
        let names: Vec<&str> = bus.current_frame().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["new_b", "new_a"]);
        assert_eq!(bus.count("old"), 1);
    }
}
