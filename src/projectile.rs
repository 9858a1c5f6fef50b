use bevy::prelude::*;

use crate::components::{Countdown, ProjectileKind, SpellKind, Weapon};
use crate::player::PlayerHit;
use crate::state::GameState;
use crate::combat;

/// Player-fired arrow or spell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projectile {
    pub kind: ProjectileKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub travelled: f32,
    pub max_range: f32,
    pub gravity: f32,
    /// Fraction of speed lost per second.
    pub drag: f32,
}

impl Projectile {
    pub fn advance(&mut self, dt: f32) {
        self.velocity.y -= self.gravity * dt;
        if self.drag > 0.0 {
            self.velocity *= (1.0 - self.drag * dt).max(0.0);
        }
        let step = self.velocity * dt;
        self.position += step;
        self.travelled += step.length();
    }

    pub fn is_spent(&self) -> bool {
        self.position.y <= 0.0 || self.travelled >= self.max_range || self.velocity.length_squared() < 1e-4
    }
}

/// Homing shot fired by ranged enemies and the boss.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HostileProjectile {
    pub position: Vec3,
    pub velocity: Vec3,
    pub damage: i32,
    pub lifetime: Countdown,
    pub source: &'static str,
}

fn launch_point(state: &GameState) -> (Vec3, Vec3) {
    let forward = state.player.forward();
    (state.player.eye() + forward * 0.5, forward)
}

pub fn fire_arrow(state: &mut GameState) -> Result<(), String> {
    if !state.inventory.is_equipped(Weapon::Bow) {
        return Err("bow not equipped".to_string());
    }
    if state.player.attack_cooldown.is_some() {
        return Err("bow is reloading".to_string());
    }
    let tuning = &state.tuning.projectiles;
    let (origin, forward) = launch_point(state);
    state.projectiles.push(Projectile {
        kind: ProjectileKind::Arrow,
        position: origin,
        velocity: forward * tuning.arrow_speed,
        travelled: 0.0,
        max_range: tuning.arrow_range,
        gravity: tuning.arrow_gravity,
        drag: 0.0,
    });
    state.player.attack_cooldown = Some(Countdown::new(state.tuning.weapons.bow_cooldown));
    state.events.emit("arrow_fired", serde_json::json!({ "origin": [origin.x, origin.y, origin.z] }));
    Ok(())
}

pub fn cast_spell(state: &mut GameState, spell: SpellKind) -> Result<(), String> {
    if !state.inventory.owns(Weapon::Spellbook) {
        return Err("spellbook not owned".to_string());
    }
    let tuning = &state.tuning.projectiles;
    let cost = match spell {
        SpellKind::Fireball => tuning.fireball_mana,
        SpellKind::Freezeball => tuning.freezeball_mana,
    };
    let kind = ProjectileKind::from(spell);
    if state.player.mana < cost {
        return Err(format!("not enough mana for {kind:?} ({:.0}/{cost:.0})", state.player.mana));
    }
    let (origin, forward) = launch_point(state);
    state.projectiles.push(Projectile {
        kind,
        position: origin,
        velocity: forward * tuning.spell_speed,
        travelled: 0.0,
        max_range: tuning.spell_range,
        gravity: 0.0,
        drag: tuning.spell_drag,
    });
    state.player.mana -= cost;
    state.events.emit(
        "spell_cast",
        serde_json::json!({ "spell": kind, "mana": state.player.mana }),
    );
    Ok(())
}

/// Body centre the hostile shots steer for.
fn player_target(state: &GameState) -> Vec3 {
    state.player.position + Vec3::Y * (state.player.eye_height * 0.5)
}

pub fn spawn_hostile(state: &mut GameState, from: Vec3, damage: i32, source: &'static str) {
    let tuning = &state.tuning.projectiles;
    let dir = (player_target(state) - from).normalize_or_zero();
    state.hostile_projectiles.push(HostileProjectile {
        position: from,
        velocity: dir * tuning.hostile_speed,
        damage,
        lifetime: Countdown::new(tuning.hostile_lifetime),
        source,
    });
}

/// Integrate every projectile; walks both collections backward so removal is safe.
pub fn update_projectiles(state: &mut GameState, dt: f32) {
    for i in (0..state.projectiles.len()).rev() {
        let mut projectile = state.projectiles[i];
        projectile.advance(dt);
        if let Some(target) = combat::find_projectile_target(state, &projectile) {
            state.projectiles.remove(i);
            combat::resolve_projectile_hit(state, projectile.kind, target);
            continue;
        }
        if projectile.is_spent() {
            state.projectiles.remove(i);
            continue;
        }
        state.projectiles[i] = projectile;
    }

    update_hostile_projectiles(state, dt);
}

fn update_hostile_projectiles(state: &mut GameState, dt: f32) {
    let tuning = state.tuning.projectiles.clone();
    for i in (0..state.hostile_projectiles.len()).rev() {
        if state.is_finished() {
            return;
        }
        let target = player_target(state);
        let shot = &mut state.hostile_projectiles[i];
        let desired = (target - shot.position).normalize_or_zero() * tuning.hostile_speed;
        let turn = (tuning.hostile_turn_rate * dt).min(1.0);
        shot.velocity = shot.velocity.lerp(desired, turn).normalize_or_zero() * tuning.hostile_speed;
        shot.position += shot.velocity * dt;
        let expired = shot.lifetime.tick(dt) || shot.position.y <= 0.0;
        let hit = shot.position.distance(target) <= tuning.hostile_hit_radius;
        let shot = *shot;

        if hit {
            state.hostile_projectiles.remove(i);
            let outcome = state.hit_player(shot.damage, shot.velocity, tuning.hostile_knockback, shot.source);
            if outcome == PlayerHit::Absorbed {
                debug!("[Realmfall projectile] Shield blocked a {} shot", shot.source);
            }
        } else if expired {
            state.hostile_projectiles.remove(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::EnemyKind;
    use crate::spawn;
    use crate::tuning::GameTuning;

    const DT: f32 = 1.0 / 60.0;

    fn with_bow() -> GameState {
        let mut state = GameState::new(GameTuning::default(), 3);
        state.inventory.grant_weapon(Weapon::Bow);
        state
            .inventory
            .equip(Weapon::Bow, &mut state.events)
            .expect("bow equips");
        state
    }

    #[test]
    fn arrow_hits_the_enemy_ahead_once() {
        let mut state = with_bow();
        spawn::spawn_enemy(&mut state, EnemyKind::Melee, Vec3::new(0.0, 0.0, -10.0), 5);
        fire_arrow(&mut state).expect("arrow");
        assert!(fire_arrow(&mut state).is_err());
        for _ in 0..60 {
            update_projectiles(&mut state, DT);
        }
        assert!(state.projectiles.is_empty());
        assert_eq!(state.enemies[0].body.hp, 4);
        assert_eq!(state.events.count("damage_dealt"), 1);
    }

    #[test]
    fn one_projectile_damages_one_target() {
        let mut state = with_bow();
        spawn::spawn_enemy(&mut state, EnemyKind::Melee, Vec3::new(0.0, 0.0, -8.0), 5);
        spawn::spawn_enemy(&mut state, EnemyKind::Melee, Vec3::new(0.2, 0.0, -8.0), 5);
        fire_arrow(&mut state).expect("arrow");
        for _ in 0..60 {
            update_projectiles(&mut state, DT);
        }
        let total: i32 = state.enemies.iter().map(|e| e.body.hp).sum();
        assert_eq!(total, 9);
    }

    #[test]
    fn spells_need_the_spellbook_and_mana() {
        let mut state = GameState::new(GameTuning::default(), 3);
        assert!(cast_spell(&mut state, SpellKind::Fireball).is_err());
        state.inventory.grant_weapon(Weapon::Spellbook);
        cast_spell(&mut state, SpellKind::Fireball).expect("fireball");
        assert_eq!(state.player.mana, 80.0);
        state.player.mana = 24.0;
        assert!(cast_spell(&mut state, SpellKind::Freezeball).is_err());
        assert_eq!(state.player.mana, 24.0);
        assert_eq!(state.projectiles.len(), 1);
    }

    #[test]
    fn spell_expires_at_max_range() {
        let mut state = GameState::new(GameTuning::default(), 3);
        state.inventory.grant_weapon(Weapon::Spellbook);
        cast_spell(&mut state, SpellKind::Fireball).expect("fireball");
        for _ in 0..200 {
            update_projectiles(&mut state, DT);
        }
        assert!(state.projectiles.is_empty());
    }

    #[test]
    fn freezeball_freezes_enemy() {
        let mut state = GameState::new(GameTuning::default(), 3);
        state.inventory.grant_weapon(Weapon::Spellbook);
        spawn::spawn_enemy(&mut state, EnemyKind::Ranged, Vec3::new(0.0, 0.0, -6.0), 5);
        cast_spell(&mut state, SpellKind::Freezeball).expect("freezeball");
        for _ in 0..30 {
            update_projectiles(&mut state, DT);
        }
        let enemy = &state.enemies[0];
        assert_eq!(enemy.body.hp, 3);
        assert!(enemy.body.is_frozen());
    }

    #[test]
    fn hostile_shot_homes_in_and_respects_protection() {
        let mut state = GameState::new(GameTuning::default(), 3);
        state.inventory.has_protection = true;
        spawn_hostile(&mut state, Vec3::new(10.0, 1.0, 0.0), 2, "ranged_enemy");
        spawn_hostile(&mut state, Vec3::new(-10.0, 1.0, 0.0), 2, "ranged_enemy");
        for _ in 0..120 {
            update_projectiles(&mut state, DT);
        }
        assert!(state.hostile_projectiles.is_empty());
        assert!(!state.inventory.has_protection);
        assert_eq!(state.player.hp, 18);
        assert_eq!(state.events.count("shield_absorbed"), 1);
    }
}
