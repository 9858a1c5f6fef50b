use std::collections::HashMap;

use bevy::prelude::*;
use serde::Serialize;

use crate::input::PlayerInput;
use crate::state::GameState;

/// Session counters for tuning playtests. Fed once per fixed tick.
#[derive(Resource, Serialize, Clone, Debug, Default)]
pub struct GameplayTelemetry {
    pub death_location: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub victory_at: Option<u64>,
    pub input_counts: HashMap<String, u64>,
    pub entity_count_samples: Vec<(u64, usize)>,
    pub damage_taken: f32,
    pub damage_dealt: f32,
    pub critical_hits: u64,
    pub shields_absorbed: u64,
    pub enemies_killed: u64,
    pub bosses_killed: u64,
    pub levels_gained: u64,
    pub coins_spent: u64,
    pub pickups_collected: u64,
    pub worlds_entered: u64,
    pub total_frames: u64,
    #[serde(skip)]
    last_bus_frame: Option<u64>,
}

fn pressed_actions(input: &PlayerInput) -> impl Iterator<Item = &'static str> {
    [
        (input.primary, "primary"),
        (input.jump, "jump"),
        (input.dash, "dash"),
        (input.cast.is_some(), "cast"),
        (input.cycle_spell, "cycle_spell"),
        (input.toggle_inventory, "inventory"),
        (input.toggle_shop, "shop"),
        (input.equip.is_some(), "equip"),
        (input.unequip, "unequip"),
        (input.equip_shield, "shield"),
        (input.eat, "eat"),
        (input.buy.is_some(), "buy"),
    ]
    .into_iter()
    .filter_map(|(pressed, name)| pressed.then_some(name))
}

fn amount(data: &serde_json::Value, key: &str) -> f64 {
    data.get(key).and_then(|v| v.as_f64()).unwrap_or(0.0)
}

impl GameplayTelemetry {
    pub fn record_input(&mut self, input: &PlayerInput) {
        for action in pressed_actions(input) {
            *self.input_counts.entry(action.to_string()).or_insert(0) += 1;
        }
    }

    /// Count one tick and fold in the events it emitted. A bus frame that was
    /// already folded in (the tick is stopped) is skipped; returns false then.
    pub fn record_frame(&mut self, state: &GameState) -> bool {
        if self.last_bus_frame == Some(state.events.frame) {
            return false;
        }
        self.last_bus_frame = Some(state.events.frame);
        self.total_frames += 1;
        let frame = self.total_frames;

        // Sample entity count every 60 frames (max 300 samples)
        if frame % 60 == 0 {
            let counts = state.entity_counts();
            self.entity_count_samples.push((frame, counts.enemies + counts.boss));
            if self.entity_count_samples.len() > 300 {
                self.entity_count_samples.remove(0);
            }
        }

        for event in state.events.current_frame() {
            match event.name.as_str() {
                "damage_dealt" => {
                    self.damage_dealt += amount(&event.data, "amount") as f32;
                    if event.data.get("critical").and_then(|v| v.as_bool()) == Some(true) {
                        self.critical_hits += 1;
                    }
                }
                "damage_taken" => self.damage_taken += amount(&event.data, "amount") as f32,
                "shield_absorbed" => self.shields_absorbed += 1,
                "enemy_killed" => self.enemies_killed += 1,
                "boss_killed" => self.bosses_killed += 1,
                "level_up" => self.levels_gained += amount(&event.data, "levels_gained") as u64,
                "item_bought" => self.coins_spent += amount(&event.data, "price") as u64,
                "pickup_collected" => self.pickups_collected += 1,
                "world_entered" => self.worlds_entered += 1,
                "game_over" => {
                    let p = state.player.position;
                    self.death_location = Some([p.x, p.y, p.z]);
                }
                "victory" => {
                    self.victory_at.get_or_insert(frame);
                }
                _ => {}
            }
        }
        true
    }

    pub fn session_ended(&self) -> bool {
        self.death_location.is_some() || self.victory_at.is_some()
    }
}

pub struct TelemetryPlugin;

impl Plugin for TelemetryPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(GameplayTelemetry::default()).add_systems(
            FixedUpdate,
            update_telemetry
                .before(crate::game_runtime::tick_game)
                .run_if(resource_exists::<GameState>),
        );
    }
}

/// Runs ahead of the tick: sees the input about to be consumed and the
/// events the previous tick left on the bus.
fn update_telemetry(
    mut telemetry: ResMut<GameplayTelemetry>,
    state: Res<GameState>,
    input: Res<PlayerInput>,
) {
    let was_over = telemetry.session_ended();
    telemetry.record_input(&input);
    if telemetry.record_frame(&state) && !was_over && telemetry.session_ended() {
        match serde_json::to_string(&*telemetry) {
            Ok(summary) => info!("[Realmfall telemetry] Session summary: {summary}"),
            Err(e) => warn!("[Realmfall telemetry] Failed to serialize summary: {e}"),
        }
    }
}
