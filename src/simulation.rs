use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::components::{SpellKind, Weapon};
use crate::input::PlayerInput;
use crate::shop::ShopItem;
use crate::state::GameState;
use crate::telemetry::GameplayTelemetry;
use crate::tuning::GameTuning;
use crate::world::{self, WorldId};

const DT: f32 = 1.0 / 60.0;
/// Radians turned per frame by the scripted look actions.
const TURN_STEP: f32 = 0.05;

#[derive(Deserialize, Clone)]
pub struct SimulationRequest {
    #[serde(default = "default_world")]
    pub world: u8,
    #[serde(default)]
    pub seed: u64,
    pub inputs: Vec<SimInput>,
    pub max_frames: u32,
    #[serde(default = "default_record_interval")]
    pub record_interval: u32,
    #[serde(default)]
    pub tuning: Option<GameTuning>,
    #[serde(default)]
    pub setup: SimSetup,
}

fn default_world() -> u8 { 1 }

fn default_record_interval() -> u32 { 1 }

/// Starting loadout applied after the world is built.
#[derive(Deserialize, Clone, Default)]
pub struct SimSetup {
    #[serde(default)]
    pub coins: u32,
    #[serde(default)]
    pub weapons: Vec<Weapon>,
    #[serde(default)]
    pub food: u32,
    #[serde(default)]
    pub shields: u32,
    #[serde(default)]
    pub clear_enemies: bool,
}

#[derive(Deserialize, Clone)]
pub struct SimInput {
    pub frame: u32,
    pub action: String,
    #[serde(default)]
    pub duration: u32,
}

#[derive(Serialize, Clone)]
pub struct SimulationResult {
    pub outcome: String,
    pub frames_elapsed: u32,
    pub world: u8,
    pub level: u32,
    pub trace: Vec<TraceFrame>,
    pub events: Vec<SimEvent>,
    pub telemetry: GameplayTelemetry,
}

#[derive(Serialize, Clone)]
pub struct TraceFrame {
    pub frame: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub yaw: f32,
    pub hp: i32,
    pub mana: f32,
    pub experience: u32,
    pub enemies: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boss_phase: Option<&'static str>,
}

#[derive(Serialize, Clone)]
pub struct SimEvent {
    pub frame: u64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: serde_json::Value,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum SimAction {
    Forward,
    Back,
    Left,
    Right,
    TurnLeft,
    TurnRight,
    LookUp,
    LookDown,
    Jump,
    Primary,
    Dash,
    Cast(SpellKind),
    CycleSpell,
    Inventory,
    Shop,
    Close,
    Equip(Weapon),
    Unequip,
    Shield,
    Eat,
    Buy(ShopItem),
}

impl SimAction {
    fn parse(label: &str) -> Option<Self> {
        let action = match label {
            "forward" | "up" => Self::Forward,
            "back" | "down" => Self::Back,
            "left" => Self::Left,
            "right" => Self::Right,
            "turn_left" => Self::TurnLeft,
            "turn_right" => Self::TurnRight,
            "look_up" => Self::LookUp,
            "look_down" => Self::LookDown,
            "jump" => Self::Jump,
            "attack" | "primary" => Self::Primary,
            "dash" => Self::Dash,
            "fireball" => Self::Cast(SpellKind::Fireball),
            "freezeball" => Self::Cast(SpellKind::Freezeball),
            "cycle_spell" => Self::CycleSpell,
            "inventory" => Self::Inventory,
            "shop" => Self::Shop,
            "close" => Self::Close,
            "unequip" => Self::Unequip,
            "shield" => Self::Shield,
            "eat" => Self::Eat,
            other => {
                if let Some(weapon) = other.strip_prefix("equip_") {
                    return Weapon::from_label(weapon).map(Self::Equip);
                }
                if let Some(item) = other.strip_prefix("buy_") {
                    return ShopItem::from_label(item).map(Self::Buy);
                }
                return None;
            }
        };
        Some(action)
    }

    fn apply(self, input: &mut PlayerInput) {
        match self {
            Self::Forward => input.move_forward += 1.0,
            Self::Back => input.move_forward -= 1.0,
            Self::Left => input.move_right -= 1.0,
            Self::Right => input.move_right += 1.0,
            Self::TurnLeft => input.look_delta += Vec2::new(TURN_STEP, 0.0),
            Self::TurnRight => input.look_delta -= Vec2::new(TURN_STEP, 0.0),
            Self::LookUp => input.look_delta += Vec2::new(0.0, TURN_STEP),
            Self::LookDown => input.look_delta -= Vec2::new(0.0, TURN_STEP),
            Self::Jump => input.jump = true,
            Self::Primary => input.primary = true,
            Self::Dash => input.dash = true,
            Self::Cast(spell) => input.cast = Some(spell),
            Self::CycleSpell => input.cycle_spell = true,
            Self::Inventory => input.toggle_inventory = true,
            Self::Shop => input.toggle_shop = true,
            Self::Close => input.close_overlay = true,
            Self::Equip(weapon) => input.equip = Some(weapon),
            Self::Unequip => input.unequip = true,
            Self::Shield => input.equip_shield = true,
            Self::Eat => input.eat = true,
            Self::Buy(item) => input.buy = Some(item),
        }
    }
}

fn trace_frame(frame: u32, state: &GameState) -> TraceFrame {
    let p = &state.player;
    TraceFrame {
        frame,
        x: p.position.x,
        y: p.position.y,
        z: p.position.z,
        yaw: p.yaw,
        hp: p.hp,
        mana: p.mana,
        experience: state.progression.experience,
        enemies: state.enemies.len(),
        boss_phase: state.boss.as_ref().map(|b| b.phase.label()),
    }
}

/// Run a scripted session headless at 60 Hz and report what happened.
pub fn run_simulation(request: &SimulationRequest) -> Result<SimulationResult, String> {
    let world_id = WorldId::from_index(request.world)
        .ok_or_else(|| format!("world must be 1-3, got {}", request.world))?;

    // Pre-process inputs into per-frame active actions
    let mut active_inputs: Vec<Vec<SimAction>> = vec![Vec::new(); request.max_frames as usize];
    for input in &request.inputs {
        let action = SimAction::parse(&input.action)
            .ok_or_else(|| format!("unknown action '{}' at frame {}", input.action, input.frame))?;
        let duration = input.duration.max(1);
        for f in input.frame..input.frame.saturating_add(duration).min(request.max_frames) {
            active_inputs[f as usize].push(action);
        }
    }

    let tuning = request.tuning.clone().unwrap_or_default();
    let mut state = GameState::new(tuning, request.seed);
    world::build_world(&mut state, world_id);
    apply_setup(&mut state, &request.setup);

    let mut trace = Vec::new();
    let mut events: Vec<SimEvent> = state
        .events
        .recent
        .iter()
        .map(|e| SimEvent {
            frame: e.frame,
            event_type: e.name.clone(),
            data: e.data.clone(),
        })
        .collect();
    let mut telemetry = GameplayTelemetry::default();
    let mut outcome = "timeout".to_string();
    let mut frames_elapsed = 0;

    for (frame, actions) in (0u32..).zip(&active_inputs) {
        let mut input = PlayerInput::default();
        for action in actions {
            action.apply(&mut input);
        }
        input.move_forward = input.move_forward.clamp(-1.0, 1.0);
        input.move_right = input.move_right.clamp(-1.0, 1.0);

        state.tick(&input, DT);
        telemetry.record_input(&input);
        telemetry.record_frame(&state);
        frames_elapsed = frame + 1;

        let mut fresh: Vec<SimEvent> = state
            .events
            .current_frame()
            .map(|e| SimEvent {
                frame: e.frame,
                event_type: e.name.clone(),
                data: e.data.clone(),
            })
            .collect();
        fresh.reverse();
        events.extend(fresh);

        let finished = state.is_finished();
        if finished || (request.record_interval > 0 && frame % request.record_interval == 0) {
            trace.push(trace_frame(frame, &state));
        }
        if finished {
            outcome = if state.victory { "victory" } else { "game_over" }.to_string();
            break;
        }
    }

    Ok(SimulationResult {
        outcome,
        frames_elapsed,
        world: state.world.current.index(),
        level: state.progression.level,
        trace,
        events,
        telemetry,
    })
}

fn apply_setup(state: &mut GameState, setup: &SimSetup) {
    let inv = &mut state.inventory;
    inv.coins = setup.coins;
    inv.food = setup.food;
    inv.shields = setup.shields;
    for weapon in &setup.weapons {
        inv.grant_weapon(*weapon);
    }
    if setup.clear_enemies {
        state.enemies.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> SimulationRequest {
        serde_json::from_value(json).expect("valid request")
    }

    #[test]
    fn walking_forward_moves_down_negative_z() {
        let req = request(serde_json::json!({
            "seed": 3,
            "inputs": [{ "frame": 0, "action": "forward", "duration": 30 }],
            "max_frames": 30,
            "record_interval": 10,
            "setup": { "clear_enemies": true }
        }));
        let result = run_simulation(&req).expect("simulation runs");
        assert_eq!(result.outcome, "timeout");
        assert_eq!(result.frames_elapsed, 30);
        assert_eq!(result.trace.len(), 3);
        let last = result.trace.last().expect("trace");
        assert!(last.z < -4.0, "z = {}", last.z);
        assert!(last.x.abs() < 1e-4);
    }

    #[test]
    fn swarmed_player_reaches_game_over() {
        let mut tuning = GameTuning::default();
        tuning.spawn.ring = [3.0, 4.0];
        tuning.enemies.contact_damage = 100;
        let req = SimulationRequest {
            world: 1,
            seed: 5,
            inputs: Vec::new(),
            max_frames: 120,
            record_interval: 0,
            tuning: Some(tuning),
            setup: SimSetup::default(),
        };
        let result = run_simulation(&req).expect("simulation runs");
        assert_eq!(result.outcome, "game_over");
        assert!(result.events.iter().any(|e| e.event_type == "game_over"));
        assert_eq!(result.trace.len(), 1);
        assert!(result.telemetry.death_location.is_some());
    }

    #[test]
    fn scripted_purchase_and_equip() {
        let req = request(serde_json::json!({
            "inputs": [
                { "frame": 0, "action": "buy_bow" },
                { "frame": 1, "action": "equip_bow" },
                { "frame": 2, "action": "attack" }
            ],
            "max_frames": 5,
            "setup": { "coins": 100, "clear_enemies": true }
        }));
        let result = run_simulation(&req).expect("simulation runs");
        let names: Vec<&str> = result.events.iter().map(|e| e.event_type.as_str()).collect();
        assert!(names.contains(&"item_bought"));
        assert!(names.contains(&"weapon_attached"));
        assert!(names.contains(&"arrow_fired"));
        assert_eq!(result.telemetry.coins_spent, 60);
    }

    #[test]
    fn bad_requests_are_rejected() {
        let req = request(serde_json::json!({ "world": 4, "inputs": [], "max_frames": 1 }));
        assert!(run_simulation(&req).is_err());
        let req = request(serde_json::json!({
            "inputs": [{ "frame": 0, "action": "moonwalk" }],
            "max_frames": 1
        }));
        assert!(run_simulation(&req).is_err());
    }
}
