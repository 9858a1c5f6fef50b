use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;

use crate::components::{collides_with_any, horizontal, tick_slot, Ability, Countdown, Weapon};
use crate::input::PlayerInput;
use crate::state::GameState;
use crate::tuning::PlayerTuning;
use crate::{combat, projectile};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Swing {
    pub weapon: Weapon,
    pub timer: Countdown,
}

/// The camera proxy: feet position plus view angles.
#[derive(Clone, Debug)]
pub struct Player {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub vertical_velocity: f32,
    pub grounded: bool,
    pub hp: i32,
    pub max_hp: i32,
    pub mana: f32,
    pub max_mana: f32,
    /// Dash and knockback velocity, decaying every tick.
    pub impulse: Vec3,
    pub attack_cooldown: Option<Countdown>,
    pub dash_cooldown: Option<Countdown>,
    pub swing: Option<Swing>,
    pub eye_height: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerHit {
    /// Shield protection took the hit.
    Absorbed,
    Damaged { remaining: i32 },
}

impl Player {
    pub fn new(tuning: &PlayerTuning) -> Self {
        let [x, y, z] = tuning.spawn_point;
        Self {
            position: Vec3::new(x, y, z),
            yaw: 0.0,
            pitch: 0.0,
            vertical_velocity: 0.0,
            grounded: true,
            hp: tuning.max_hp,
            max_hp: tuning.max_hp,
            mana: tuning.max_mana,
            max_mana: tuning.max_mana,
            impulse: Vec3::ZERO,
            attack_cooldown: None,
            dash_cooldown: None,
            swing: None,
            eye_height: tuning.eye_height,
        }
    }

    pub fn eye(&self) -> Vec3 {
        self.position + Vec3::Y * self.eye_height
    }

    /// Camera forward, pitch included.
    pub fn forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(-sy * cp, sp, -cy * cp)
    }

    pub fn flat_forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        Vec3::new(-sy, 0.0, -cy)
    }

    pub fn right(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        Vec3::new(cy, 0.0, -sy)
    }

    /// Heal up to max HP; returns the amount actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.hp = (self.hp + amount.max(0)).min(self.max_hp);
        self.hp - before
    }

    pub fn is_airborne(&self) -> bool {
        !self.grounded
    }
}

impl GameState {
    /// Resolve one incoming hit on the player. `normal` points from the source towards the player.
    pub fn hit_player(&mut self, amount: i32, normal: Vec3, knockback: f32, source: &str) -> PlayerHit {
        let push = horizontal(normal).normalize_or_zero();
        if self.inventory.take_protection() {
            self.player.impulse += push * knockback * 0.5;
            self.events.emit(
                "shield_absorbed",
                serde_json::json!({ "source": source, "amount": amount }),
            );
            return PlayerHit::Absorbed;
        }
        self.player.hp = (self.player.hp - amount.max(0)).max(0);
        self.player.impulse += push * knockback;
        self.events.emit(
            "damage_taken",
            serde_json::json!({ "source": source, "amount": amount, "hp": self.player.hp }),
        );
        if self.player.hp <= 0 && !self.game_over {
            self.game_over = true;
            info!("[Realmfall] Player died (killed by {source})");
            self.events.emit(
                "game_over",
                serde_json::json!({ "level": self.progression.level, "world": self.world.current.index() }),
            );
        }
        PlayerHit::Damaged {
            remaining: self.player.hp,
        }
    }
}

pub fn update_player(state: &mut GameState, input: &PlayerInput, dt: f32) {
    look(&mut state.player, input.look_delta);

    if input.primary {
        primary_action(state);
    }
    if let Some(spell) = input.cast {
        if let Err(reason) = projectile::cast_spell(state, spell) {
            state.refuse("cast", reason);
        }
    }
    if input.dash {
        dash(state, input);
    }
    if input.jump {
        jump(state);
    }

    move_horizontally(state, input, dt);
    apply_vertical(&mut state.player, state.tuning.player.gravity, dt);

    let regen = state.tuning.player.mana_regen * dt;
    state.player.mana = (state.player.mana + regen).min(state.player.max_mana);
}

fn look(player: &mut Player, delta: Vec2) {
    player.yaw = (player.yaw + delta.x).rem_euclid(std::f32::consts::TAU);
    player.pitch = (player.pitch + delta.y).clamp(-FRAC_PI_2, FRAC_PI_2);
}

/// Click: shoot with the bow, cast with the spellbook, otherwise swing.
fn primary_action(state: &mut GameState) {
    match state.inventory.equipped {
        Some(Weapon::Bow) => {
            if let Err(reason) = projectile::fire_arrow(state) {
                state.refuse("shoot", reason);
            }
        }
        Some(Weapon::Spellbook) => {
            let spell = state.inventory.selected_spell;
            if let Err(reason) = projectile::cast_spell(state, spell) {
                state.refuse("cast", reason);
            }
        }
        Some(Weapon::Sword | Weapon::Axe) => {
            combat::resolve_melee_attack(state);
        }
        None => {}
    }
}

fn dash(state: &mut GameState, input: &PlayerInput) {
    if state.player.dash_cooldown.is_some() {
        return;
    }
    let player = &mut state.player;
    let wish = player.flat_forward() * input.move_forward + player.right() * input.move_right;
    let dir = if wish.length_squared() > 1e-4 {
        wish.normalize()
    } else {
        player.flat_forward()
    };
    player.impulse = dir * state.tuning.player.dash_speed;
    player.dash_cooldown = Some(Countdown::new(state.tuning.player.dash_cooldown));
    state.events.emit("dash", serde_json::json!({}));
}

fn jump(state: &mut GameState) {
    if !state.player.grounded {
        return;
    }
    let tuning = &state.tuning.player;
    let big = state.inventory.has_ability(Ability::BigJump) && state.player.mana >= tuning.big_jump_mana;
    if big {
        state.player.mana -= tuning.big_jump_mana;
        state.player.vertical_velocity = tuning.big_jump_velocity;
    } else {
        state.player.vertical_velocity = tuning.jump_velocity;
    }
    state.player.grounded = false;
}

fn move_horizontally(state: &mut GameState, input: &PlayerInput, dt: f32) {
    let tuning = &state.tuning;
    let player = &mut state.player;
    let wish = player.flat_forward() * input.move_forward + player.right() * input.move_right;
    let walk = wish.normalize_or_zero() * tuning.player.move_speed;
    let delta = (walk + player.impulse) * dt;

    let half = tuning.player.body_half_extent;
    let obstacles = &state.world.obstacles;
    let bound = tuning.world.arena_half_size;
    let try_x = player.position + Vec3::new(delta.x, 0.0, 0.0);
    if !collides_with_any(obstacles, try_x, half) {
        player.position.x = try_x.x.clamp(-bound, bound);
    }
    let try_z = player.position + Vec3::new(0.0, 0.0, delta.z);
    if !collides_with_any(obstacles, try_z, half) {
        player.position.z = try_z.z.clamp(-bound, bound);
    }

    player.impulse *= (1.0 - tuning.player.impulse_decay * dt).max(0.0);
    if player.impulse.length_squared() < 0.0025 {
        player.impulse = Vec3::ZERO;
    }
}

fn apply_vertical(player: &mut Player, gravity: f32, dt: f32) {
    if player.grounded {
        return;
    }
    player.position.y += player.vertical_velocity * dt;
    player.vertical_velocity -= gravity * dt;
    if player.position.y <= 0.0 && player.vertical_velocity <= 0.0 {
        player.position.y = 0.0;
        player.vertical_velocity = 0.0;
        player.grounded = true;
    }
}

pub fn tick_player_cooldowns(state: &mut GameState, dt: f32) {
    let player = &mut state.player;
    tick_slot(&mut player.attack_cooldown, dt);
    tick_slot(&mut player.dash_cooldown, dt);
    if player.swing.as_mut().is_some_and(|s| s.timer.tick(dt)) {
        player.swing = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Aabb;
    use crate::tuning::GameTuning;

    fn state() -> GameState {
        GameState::new(GameTuning::default(), 3)
    }

    #[test]
    fn pitch_is_clamped_to_straight_up_and_down() {
        let mut s = state();
        let input = PlayerInput {
            look_delta: Vec2::new(0.0, 10.0),
            ..Default::default()
        };
        update_player(&mut s, &input, 0.016);
        assert_eq!(s.player.pitch, FRAC_PI_2);
        let input = PlayerInput {
            look_delta: Vec2::new(0.0, -20.0),
            ..Default::default()
        };
        update_player(&mut s, &input, 0.016);
        assert_eq!(s.player.pitch, -FRAC_PI_2);
    }

    #[test]
    fn walking_stops_at_obstacles() {
        let mut s = state();
        s.world.obstacles.push(Aabb::ground_box(0.0, -3.0, 2.0, 0.5, 2.0));
        let input = PlayerInput {
            move_forward: 1.0,
            ..Default::default()
        };
        for _ in 0..60 {
            update_player(&mut s, &input, 1.0 / 60.0);
        }
        assert!(s.player.position.z > -2.5 + 0.4 - 0.01);
        assert!(s.player.position.z < 0.0);
    }

    #[test]
    fn jump_lands_back_on_the_ground() {
        let mut s = state();
        let jump = PlayerInput {
            jump: true,
            ..Default::default()
        };
        update_player(&mut s, &jump, 0.05);
        assert!(s.player.is_airborne());
        assert!(s.player.position.y > 0.0);
        for _ in 0..40 {
            update_player(&mut s, &PlayerInput::default(), 0.05);
        }
        assert!(s.player.grounded);
        assert_eq!(s.player.position.y, 0.0);
    }

    #[test]
    fn big_jump_spends_mana_only_when_owned() {
        let mut s = state();
        let jump = PlayerInput {
            jump: true,
            ..Default::default()
        };
        update_player(&mut s, &jump, 0.0);
        assert_eq!(s.player.vertical_velocity, s.tuning.player.jump_velocity);
        assert_eq!(s.player.mana, s.player.max_mana);

        let mut s = state();
        s.inventory.grant_ability(Ability::BigJump);
        update_player(&mut s, &jump, 0.0);
        assert_eq!(s.player.vertical_velocity, s.tuning.player.big_jump_velocity);
        assert_eq!(s.player.mana, s.player.max_mana - s.tuning.player.big_jump_mana);
    }

    #[test]
    fn shield_protection_absorbs_one_hit() {
        let mut s = state();
        s.inventory.shields = 1;
        s.inventory.equip_shield(&mut s.events).expect("shield equips");
        let hit = s.hit_player(3, Vec3::Z, 10.0, "test");
        assert_eq!(hit, PlayerHit::Absorbed);
        assert_eq!(s.player.hp, 20);
        let hit = s.hit_player(3, Vec3::Z, 10.0, "test");
        assert_eq!(hit, PlayerHit::Damaged { remaining: 17 });
        assert!(s.player.impulse.z > 0.0);
    }

    #[test]
    fn lethal_hit_ends_the_game_once() {
        let mut s = state();
        s.hit_player(25, Vec3::X, 0.0, "test");
        s.hit_player(25, Vec3::X, 0.0, "test");
        assert!(s.game_over);
        assert_eq!(s.player.hp, 0);
        assert_eq!(s.events.count("game_over"), 1);
    }

    #[test]
    fn dash_has_a_cooldown() {
        let mut s = state();
        let dash = PlayerInput {
            dash: true,
            ..Default::default()
        };
        update_player(&mut s, &dash, 0.0);
        assert!(s.player.impulse.length() > 0.0);
        assert!(s.player.dash_cooldown.is_some());
        s.player.impulse = Vec3::ZERO;
        update_player(&mut s, &dash, 0.0);
        assert_eq!(s.player.impulse, Vec3::ZERO);
        tick_player_cooldowns(&mut s, 1.5);
        assert!(s.player.dash_cooldown.is_none());
    }
}
