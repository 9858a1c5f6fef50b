use std::collections::VecDeque;
use std::fmt::Write as _;

use bevy::prelude::*;

use crate::components::HeadlessMode;
use crate::events::GameEvent;
use crate::shop;
use crate::state::{GameState, Overlay};

const MAX_TOASTS: usize = 5;
const TOAST_SECONDS: f32 = 3.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Toast {
    pub text: String,
    pub remaining: f32,
}

/// Short-lived notifications distilled from the game event bus.
#[derive(Resource, Default)]
pub struct Notifications {
    pub toasts: VecDeque<Toast>,
}

impl Notifications {
    pub fn push(&mut self, text: String) {
        self.toasts.push_back(Toast {
            text,
            remaining: TOAST_SECONDS,
        });
        while self.toasts.len() > MAX_TOASTS {
            self.toasts.pop_front();
        }
    }

    pub fn tick(&mut self, dt: f32) {
        for toast in &mut self.toasts {
            toast.remaining -= dt;
        }
        self.toasts.retain(|t| t.remaining > 0.0);
    }
}

fn str_field<'a>(event: &'a GameEvent, key: &str) -> &'a str {
    event.data.get(key).and_then(|v| v.as_str()).unwrap_or("?")
}

fn num_field(event: &GameEvent, key: &str) -> i64 {
    event.data.get(key).and_then(|v| v.as_i64()).unwrap_or(0)
}

/// Player-facing line for an event, if it deserves one.
pub fn notification_text(event: &GameEvent) -> Option<String> {
    let text = match event.name.as_str() {
        "level_up" => format!("Level up! Now level {}", num_field(event, "level")),
        "pickup_collected" => format!("Picked up {}", str_field(event, "kind")),
        "item_bought" => format!("Bought {} for {} coins", str_field(event, "item"), num_field(event, "price")),
        "action_refused" => format!("Can't {}: {}", str_field(event, "action"), str_field(event, "reason")),
        "shield_absorbed" => "Shield absorbed the hit".to_string(),
        "boss_spawned" => "The boss has arrived".to_string(),
        "boss_killed" => "Boss defeated!".to_string(),
        "portal_spawned" => format!("A portal to world {} opened", num_field(event, "to")),
        "world_entered" => format!("World {}: {}", num_field(event, "world"), str_field(event, "theme")),
        "tuning_reloaded" => "Tuning reloaded".to_string(),
        "game_over" => "You died".to_string(),
        "victory" => "Victory!".to_string(),
        _ => return None,
    };
    Some(text)
}

pub fn hud_text(state: &GameState, notifications: &Notifications) -> String {
    let p = &state.player;
    let prog = &state.progression;
    let inv = &state.inventory;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "World {} ({})   HP {}/{}   Mana {:.0}/{:.0}",
        state.world.current.index(),
        state.world.theme.name,
        p.hp,
        p.max_hp,
        p.mana,
        p.max_mana
    );
    let _ = writeln!(
        out,
        "Level {}   XP {}/{}   Damage {}   Coins {}",
        prog.level, prog.experience, prog.threshold, prog.damage, inv.coins
    );
    let weapon = inv.equipped.map_or("none", |w| w.label());
    let _ = writeln!(
        out,
        "Weapon {}   Spell {:?}   Food {}   Shields {}{}",
        weapon,
        inv.selected_spell,
        inv.food,
        inv.shields,
        if inv.has_protection { " (raised)" } else { "" }
    );
    if let Some(boss) = &state.boss {
        let _ = writeln!(out, "Boss {}/{} [{}]", boss.body.hp, boss.body.max_hp, boss.phase.label());
    }

    match state.overlay {
        Some(Overlay::Inventory) => {
            let _ = writeln!(out, "\n-- Inventory --");
            for (i, w) in inv.owned_weapons().enumerate() {
                let mark = if inv.is_equipped(w) { "*" } else { " " };
                let _ = writeln!(out, "{mark} [{}] {}", i + 1, w.label());
            }
        }
        Some(Overlay::Shop) => {
            let _ = writeln!(out, "\n-- Shop --");
            for (i, offer) in shop::catalog(state.world.current).iter().enumerate() {
                let _ = writeln!(out, "[{}] {} - {} coins", i + 1, offer.item.label(), offer.price);
            }
        }
        None => {}
    }

    if state.world.transition.is_some() {
        let _ = writeln!(out, "\nTravelling...");
    }
    if state.victory {
        let _ = writeln!(out, "\nVICTORY");
    } else if state.game_over {
        let _ = writeln!(out, "\nGAME OVER");
    }

    for toast in &notifications.toasts {
        let _ = writeln!(out, "{}", toast.text);
    }
    out
}

#[derive(Resource, Default)]
struct UiEventCursor {
    last_frame: u64,
}

#[derive(Component)]
struct HudTextMarker;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Notifications::default())
            .insert_resource(UiEventCursor::default())
            .add_systems(Update, collect_notifications.run_if(resource_exists::<GameState>))
            .add_systems(
                Update,
                sync_hud_text
                    .after(collect_notifications)
                    .run_if(resource_exists::<GameState>),
            );
    }
}

fn collect_notifications(
    time: Res<Time>,
    state: Res<GameState>,
    mut notifications: ResMut<Notifications>,
    mut cursor: ResMut<UiEventCursor>,
) {
    notifications.tick(time.delta_secs());
    let mut newest = cursor.last_frame;
    for event in state.events.recent.iter().filter(|e| e.frame > cursor.last_frame) {
        newest = newest.max(event.frame);
        if let Some(text) = notification_text(event) {
            notifications.push(text);
        }
    }
    cursor.last_frame = newest;
}

fn sync_hud_text(
    mut commands: Commands,
    headless: Res<HeadlessMode>,
    state: Res<GameState>,
    notifications: Res<Notifications>,
    mut query: Query<&mut Text, With<HudTextMarker>>,
) {
    if headless.0 {
        return;
    }
    let text = hud_text(&state, &notifications);
    if let Ok(mut current) = query.get_single_mut() {
        if current.0 != text {
            current.0 = text;
        }
        return;
    }
    commands.spawn((
        Text::new(text),
        TextFont {
            font_size: 18.0,
            ..default()
        },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(12.0),
            left: Val::Px(12.0),
            ..default()
        },
        GlobalZIndex(100),
        HudTextMarker,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::GameTuning;

    fn event(name: &str, data: serde_json::Value) -> GameEvent {
        GameEvent {
            name: name.to_string(),
            data,
            frame: 1,
        }
    }

    #[test]
    fn interesting_events_become_notifications() {
        let bought = event("item_bought", serde_json::json!({ "item": "bow", "price": 60 }));
        assert_eq!(notification_text(&bought).as_deref(), Some("Bought bow for 60 coins"));
        let moved = event("damage_dealt", serde_json::json!({ "amount": 1 }));
        assert_eq!(notification_text(&moved), None);
    }

    #[test]
    fn toasts_expire_and_are_capped() {
        let mut notifications = Notifications::default();
        for i in 0..7 {
            notifications.push(format!("toast {i}"));
        }
        assert_eq!(notifications.toasts.len(), MAX_TOASTS);
        assert_eq!(notifications.toasts[0].text, "toast 2");
        notifications.tick(2.0);
        assert_eq!(notifications.toasts.len(), MAX_TOASTS);
        notifications.tick(1.0);
        assert!(notifications.toasts.is_empty());
    }

    #[test]
    fn hud_lists_the_shop_catalog_when_open() {
        let mut state = GameState::new(GameTuning::default(), 1);
        state.overlay = Some(Overlay::Shop);
        let text = hud_text(&state, &Notifications::default());
        assert!(text.contains("HP 20/20"));
        assert!(text.contains("[3] bow - 60 coins"));
        state.overlay = None;
        assert!(!hud_text(&state, &Notifications::default()).contains("Shop"));
    }

    #[test]
    fn cursor_reads_each_event_once() {
        let mut app = App::new();
        app.insert_resource(GameState::new(GameTuning::default(), 1))
            .insert_resource(Time::<()>::default())
            .insert_resource(HeadlessMode(true))
            .add_plugins(UiPlugin);
        {
            let mut state = app.world_mut().resource_mut::<GameState>();
            state.events.advance_frame();
            state.events.emit("boss_spawned", serde_json::json!({}));
        }
        app.update();
        app.update();
        assert_eq!(app.world().resource::<Notifications>().toasts.len(), 1);
    }
}
