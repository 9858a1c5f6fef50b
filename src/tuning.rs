use bevy::prelude::*;
use serde::{Deserialize, Serialize};

const EMBEDDED_TUNING: &str = include_str!(concat!(env!("OUT_DIR"), "/realmfall_embedded_tuning.json"));

/// Every gameplay constant, grouped by subsystem. All fields default so a
/// tuning file only needs the values it overrides.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameTuning {
    pub player: PlayerTuning,
    pub weapons: WeaponTuning,
    pub projectiles: ProjectileTuning,
    pub enemies: EnemyTuning,
    pub boss: BossTuning,
    pub progression: ProgressionTuning,
    pub spawn: SpawnTuning,
    pub world: WorldTuning,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub max_hp: i32,
    pub base_damage: i32,
    pub max_mana: f32,
    pub mana_regen: f32,
    pub move_speed: f32,
    pub eye_height: f32,
    pub body_half_extent: f32,
    pub gravity: f32,
    pub jump_velocity: f32,
    pub big_jump_velocity: f32,
    pub big_jump_mana: f32,
    pub dash_speed: f32,
    pub dash_cooldown: f32,
    pub impulse_decay: f32,
    pub food_heal: i32,
    pub spawn_point: [f32; 3],
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            max_hp: 20,
            base_damage: 1,
            max_mana: 100.0,
            mana_regen: 5.0,
            move_speed: 10.0,
            eye_height: 1.6,
            body_half_extent: 0.4,
            gravity: 20.0,
            jump_velocity: 8.0,
            big_jump_velocity: 14.0,
            big_jump_mana: 30.0,
            dash_speed: 30.0,
            dash_cooldown: 1.5,
            impulse_decay: 8.0,
            food_heal: 5,
            spawn_point: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponTuning {
    pub sword_range: f32,
    pub axe_range: f32,
    pub cone_degrees: f32,
    pub sword_cooldown: f32,
    pub axe_cooldown: f32,
    pub axe_damage_multiplier: i32,
    pub bow_cooldown: f32,
    pub crit_chance: f32,
    pub crit_multiplier: i32,
    pub flash_seconds: f32,
    pub swing_seconds: f32,
}

impl Default for WeaponTuning {
    fn default() -> Self {
        Self {
            sword_range: 3.0,
            axe_range: 2.5,
            cone_degrees: 30.0,
            sword_cooldown: 0.5,
            axe_cooldown: 2.5,
            axe_damage_multiplier: 3,
            bow_cooldown: 0.8,
            crit_chance: 0.05,
            crit_multiplier: 2,
            flash_seconds: 0.2,
            swing_seconds: 0.3,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileTuning {
    pub arrow_speed: f32,
    pub arrow_gravity: f32,
    pub arrow_range: f32,
    pub arrow_damage: i32,
    pub spell_speed: f32,
    pub spell_range: f32,
    pub spell_drag: f32,
    pub fireball_damage: i32,
    pub fireball_boss_damage: i32,
    pub fireball_mana: f32,
    pub freezeball_damage: i32,
    pub freezeball_boss_damage: i32,
    pub freezeball_mana: f32,
    pub freeze_enemy_seconds: f32,
    pub freeze_boss_seconds: f32,
    pub enemy_hit_radius: f32,
    pub boss_hit_radius: f32,
    pub hostile_speed: f32,
    pub hostile_turn_rate: f32,
    pub hostile_hit_radius: f32,
    pub hostile_lifetime: f32,
    pub hostile_knockback: f32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            arrow_speed: 40.0,
            arrow_gravity: 9.8,
            arrow_range: 100.0,
            arrow_damage: 1,
            spell_speed: 25.0,
            spell_range: 60.0,
            spell_drag: 0.0,
            fireball_damage: 3,
            fireball_boss_damage: 5,
            fireball_mana: 20.0,
            freezeball_damage: 2,
            freezeball_boss_damage: 3,
            freezeball_mana: 25.0,
            freeze_enemy_seconds: 3.0,
            freeze_boss_seconds: 5.0,
            enemy_hit_radius: 1.5,
            boss_hit_radius: 4.0,
            hostile_speed: 12.0,
            hostile_turn_rate: 2.5,
            hostile_hit_radius: 1.0,
            hostile_lifetime: 6.0,
            hostile_knockback: 6.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTuning {
    pub speed: f32,
    /// Indexed by world (1..=3).
    pub melee_hp: [i32; 3],
    pub ranged_hp: [i32; 3],
    pub base_height: f32,
    pub body_radius: f32,
    pub body_half_extent: f32,
    pub contact_radius: f32,
    pub contact_damage: i32,
    pub contact_cooldown: f32,
    pub knockback: f32,
    pub shield_push: f32,
    pub standoff: f32,
    pub standoff_tolerance: f32,
    pub shoot_interval: f32,
    pub shoot_range: f32,
    pub shot_damage: i32,
    pub bob_frequency: f32,
    pub bob_amplitude: f32,
    pub experience: u32,
    pub coins: u32,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            speed: 3.0,
            melee_hp: [5, 8, 12],
            ranged_hp: [3, 5, 8],
            base_height: 1.0,
            body_radius: 0.5,
            body_half_extent: 0.5,
            contact_radius: 2.5,
            contact_damage: 1,
            contact_cooldown: 1.0,
            knockback: 12.0,
            shield_push: 2.0,
            standoff: 20.0,
            standoff_tolerance: 10.0,
            shoot_interval: 2.0,
            shoot_range: 50.0,
            shot_damage: 1,
            bob_frequency: 4.0,
            bob_amplitude: 0.15,
            experience: 100,
            coins: 10,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BossTuning {
    pub hp: i32,
    pub speed_factor: f32,
    pub base_height: f32,
    pub body_radius: f32,
    pub jump_cooldown: f32,
    pub jump_velocity: f32,
    pub gravity: f32,
    pub stun_seconds: f32,
    pub contact_radius: f32,
    pub contact_damage: i32,
    pub knockback: f32,
    pub shockwave_speed: f32,
    pub shockwave_max_radius: f32,
    pub shockwave_band: f32,
    pub shockwave_damage: i32,
    pub shockwave_max_height: f32,
    pub ranged_interval: f32,
    pub ranged_range: f32,
    pub ranged_damage: i32,
    pub spawn_threshold: u32,
    pub spawn_ring: [f32; 2],
    pub spawn_min_player_distance: f32,
    pub spawn_attempts: u32,
    pub experience: u32,
    pub coins: u32,
    pub portal_delay: f32,
}

impl Default for BossTuning {
    fn default() -> Self {
        Self {
            hp: 100,
            speed_factor: 0.5,
            base_height: 3.0,
            body_radius: 2.0,
            jump_cooldown: 8.0,
            jump_velocity: 15.0,
            gravity: 20.0,
            stun_seconds: 5.0,
            contact_radius: 5.0,
            contact_damage: 2,
            knockback: 20.0,
            shockwave_speed: 15.0,
            shockwave_max_radius: 20.0,
            shockwave_band: 2.0,
            shockwave_damage: 3,
            shockwave_max_height: 1.0,
            ranged_interval: 3.0,
            ranged_range: 60.0,
            ranged_damage: 2,
            spawn_threshold: 20,
            spawn_ring: [30.0, 50.0],
            spawn_min_player_distance: 20.0,
            spawn_attempts: 8,
            experience: 1000,
            coins: 100,
            portal_delay: 3.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionTuning {
    /// Experience needed to leave level `i + 1`.
    pub thresholds: Vec<u32>,
    pub max_level: u32,
    pub damage_per_level: i32,
    pub hp_per_level: i32,
}

impl Default for ProgressionTuning {
    fn default() -> Self {
        Self {
            thresholds: vec![500, 1000, 3000, 6000, 10000, 15000, 21000, 28000, 36000],
            max_level: 10,
            damage_per_level: 1,
            hp_per_level: 5,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnTuning {
    pub interval: f32,
    pub max_alive: usize,
    pub ring: [f32; 2],
    pub attempts: u32,
    /// Chance a spawned enemy is ranged, indexed by world.
    pub ranged_share: [f64; 3],
    pub initial_enemies: [u32; 3],
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            interval: 3.0,
            max_alive: 10,
            ring: [25.0, 40.0],
            attempts: 12,
            ranged_share: [0.0, 0.3, 0.5],
            initial_enemies: [5, 8, 10],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldTuning {
    pub transition_delay: f32,
    pub portal_radius: f32,
    pub pickup_radius: f32,
    pub arena_half_size: f32,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            transition_delay: 1.0,
            portal_radius: 2.0,
            pickup_radius: 1.5,
            arena_half_size: 60.0,
        }
    }
}

pub fn tuning_path() -> String {
    std::env::var("REALMFALL_TUNING")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "tuning.json".to_string())
}

pub fn parse_tuning(contents: &str) -> Result<GameTuning, String> {
    serde_json::from_str::<GameTuning>(contents).map_err(|e| e.to_string())
}

/// Tuning file on disk, falling back to the build-time embedded copy and then to defaults.
pub fn load_tuning() -> GameTuning {
    let path = tuning_path();
    match std::fs::read_to_string(&path) {
        Ok(contents) => match parse_tuning(&contents) {
            Ok(tuning) => {
                info!("[Realmfall tuning] Loaded tuning from {}", path);
                return tuning;
            }
            Err(e) => warn!("[Realmfall tuning] Failed to parse {}: {}", path, e),
        },
        Err(_) => debug!("[Realmfall tuning] No tuning file at {}", path),
    }
    parse_tuning(EMBEDDED_TUNING).unwrap_or_else(|e| {
        warn!("[Realmfall tuning] Embedded tuning invalid: {e}");
        GameTuning::default()
    })
}
