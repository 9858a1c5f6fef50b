use bevy::prelude::*;

use crate::actor::{Boss, BossPhase, SteerContext, SteerOutcome, Steerable};
use crate::ai::choose_step;
use crate::components::{horizontal, Countdown};
use crate::projectile;
use crate::state::GameState;

/// Expanding ground ring spawned when the boss lands.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shockwave {
    pub origin: Vec3,
    pub radius: f32,
    /// A ring damages the player at most once.
    pub hit_player: bool,
}

impl Steerable for Boss {
    fn steer(&mut self, ctx: &SteerContext<'_>, dt: f32) -> SteerOutcome {
        let tuning = &ctx.tuning.boss;
        let mut outcome = SteerOutcome::default();

        match self.phase {
            BossPhase::Approaching => {
                if self.body.is_frozen() {
                    return outcome;
                }
                let to_player = horizontal(ctx.player - self.body.position);
                let distance = to_player.length();
                let reach = tuning.body_radius + 1.0;
                if distance > reach {
                    let step = (self.body.speed * dt).min(distance - reach);
                    let dir = to_player.normalize_or_zero();
                    if let Some(delta) =
                        choose_step(self.body.position, dir, step, ctx.obstacles, tuning.body_radius)
                    {
                        self.body.position += delta;
                    }
                }
                self.body.face(ctx.player);
                let bob = &ctx.tuning.enemies;
                self.body.bob(ctx.elapsed, bob.bob_frequency, bob.bob_amplitude);

                if self.ranged_timer.tick(dt) {
                    self.ranged_timer.reset();
                    if distance <= tuning.ranged_range {
                        outcome.fire_at = Some(ctx.player);
                    }
                }
                if self.jump_timer.tick(dt) {
                    self.jump_timer.reset();
                    self.body.position.y = self.body.base_height;
                    self.phase = BossPhase::Jumping {
                        vertical_velocity: tuning.jump_velocity,
                        launch_height: self.body.base_height,
                    };
                }
            }
            BossPhase::Jumping {
                mut vertical_velocity,
                launch_height,
            } => {
                self.body.position.y += vertical_velocity * dt;
                vertical_velocity -= tuning.gravity * dt;
                if self.body.position.y <= launch_height && vertical_velocity <= 0.0 {
                    self.body.position.y = launch_height;
                    self.phase = BossPhase::Stunned(Countdown::new(tuning.stun_seconds));
                    outcome.landed = true;
                } else {
                    self.phase = BossPhase::Jumping {
                        vertical_velocity,
                        launch_height,
                    };
                }
            }
            BossPhase::Stunned(mut timer) => {
                self.phase = if timer.tick(dt) {
                    BossPhase::Approaching
                } else {
                    BossPhase::Stunned(timer)
                };
            }
        }
        outcome
    }
}

pub fn update_boss(state: &mut GameState, dt: f32) {
    let step = state.boss.as_mut().map(|boss| {
        let ctx = SteerContext {
            player: state.player.position,
            obstacles: &state.world.obstacles,
            tuning: &state.tuning,
            elapsed: state.elapsed,
        };
        let before = boss.phase.label();
        let outcome = boss.steer(&ctx, dt);
        (before, boss.phase.label(), boss.body.position, outcome)
    });

    if let Some((before, after, position, outcome)) = step {
        if before != after {
            debug!("[Realmfall boss] {before} -> {after}");
            state
                .events
                .emit("boss_phase", serde_json::json!({ "from": before, "to": after }));
        }
        if outcome.landed {
            state.shockwaves.push(Shockwave {
                origin: horizontal(position),
                radius: 0.0,
                hit_player: false,
            });
            state.events.emit(
                "shockwave",
                serde_json::json!({ "origin": [position.x, position.z] }),
            );
        }
        if outcome.fire_at.is_some() {
            let damage = state.tuning.boss.ranged_damage;
            projectile::spawn_hostile(state, position, damage, "boss");
        }
    }

    update_shockwaves(state, dt);
    resolve_boss_contact(state);
}

/// Expand every ring; each damages a grounded player inside its band once.
pub fn update_shockwaves(state: &mut GameState, dt: f32) {
    let tuning = state.tuning.boss.clone();
    let knockback = state.tuning.enemies.knockback;
    for i in (0..state.shockwaves.len()).rev() {
        let feet = state.player.position;
        let wave = &mut state.shockwaves[i];
        wave.radius += tuning.shockwave_speed * dt;
        let distance = horizontal(feet - wave.origin).length();
        let in_band = (distance - wave.radius).abs() <= tuning.shockwave_band * 0.5;
        let hits = !wave.hit_player && in_band && feet.y <= tuning.shockwave_max_height;
        if hits {
            wave.hit_player = true;
        }
        let (origin, spent) = (wave.origin, wave.radius >= tuning.shockwave_max_radius);

        if hits {
            state.hit_player(tuning.shockwave_damage, feet - origin, knockback, "shockwave");
            if state.is_finished() {
                return;
            }
        }
        if spent {
            state.shockwaves.remove(i);
        }
    }
}

/// Contact runs in every phase, frozen or not.
fn resolve_boss_contact(state: &mut GameState) {
    let Some(boss) = state.boss.as_ref() else {
        return;
    };
    let tuning = &state.tuning.boss;
    if boss.body.contact_cooldown.is_some()
        || boss.body.horizontal_distance_to(state.player.position) > tuning.contact_radius
    {
        return;
    }
    let normal = horizontal(state.player.position - boss.body.position);
    let (damage, knockback) = (tuning.contact_damage, tuning.knockback);
    let cooldown = state.tuning.enemies.contact_cooldown;
    state.hit_player(damage, normal, knockback, "boss");
    if let Some(boss) = state.boss.as_mut() {
        boss.body.contact_cooldown = Some(Countdown::new(cooldown));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spawn;
    use crate::tuning::GameTuning;

    const DT: f32 = 0.25;

    fn boss_far_away() -> GameState {
        let mut state = GameState::new(GameTuning::default(), 2);
        spawn::spawn_boss_at(&mut state, Vec3::new(0.0, 0.0, -40.0));
        state
    }

    fn phase(state: &GameState) -> BossPhase {
        state.boss.as_ref().map(|b| b.phase).expect("boss")
    }

    fn flat_position(state: &GameState) -> Vec3 {
        state.boss.as_ref().map(|b| horizontal(b.body.position)).expect("boss")
    }

    #[test]
    fn jump_timer_starts_the_jump() {
        let mut state = boss_far_away();
        for _ in 0..31 {
            update_boss(&mut state, DT);
            assert_eq!(phase(&state), BossPhase::Approaching);
        }
        update_boss(&mut state, DT);
        assert!(matches!(phase(&state), BossPhase::Jumping { .. }));
        assert_eq!(state.events.count("boss_phase"), 1);
        // Ranged attacks at 3 s and 6 s while in range.
        assert_eq!(state.hostile_projectiles.len(), 2);
    }

    #[test]
    fn jump_lands_into_exact_stun() {
        let mut state = boss_far_away();
        if let Some(boss) = state.boss.as_mut() {
            boss.phase = BossPhase::Jumping {
                vertical_velocity: 15.0,
                launch_height: boss.body.base_height,
            };
        }
        let start = flat_position(&state);
        for _ in 0..6 {
            update_boss(&mut state, DT);
            assert!(matches!(phase(&state), BossPhase::Jumping { .. }));
            assert_eq!(flat_position(&state), start);
        }
        update_boss(&mut state, DT);
        assert!(matches!(phase(&state), BossPhase::Stunned(_)));
        assert_eq!(state.shockwaves.len(), 1);
        let landed_at = state.boss.as_ref().map(|b| b.body.position.y);
        assert_eq!(landed_at, Some(state.tuning.boss.base_height));

        for _ in 0..19 {
            update_boss(&mut state, DT);
            assert!(matches!(phase(&state), BossPhase::Stunned(_)));
            assert_eq!(flat_position(&state), start);
        }
        update_boss(&mut state, DT);
        assert_eq!(phase(&state), BossPhase::Approaching);
    }

    #[test]
    fn contact_applies_while_stunned() {
        let mut state = GameState::new(GameTuning::default(), 2);
        spawn::spawn_boss_at(&mut state, Vec3::new(0.0, 0.0, -4.0));
        if let Some(boss) = state.boss.as_mut() {
            boss.phase = BossPhase::Stunned(Countdown::new(5.0));
        }
        update_boss(&mut state, DT);
        assert_eq!(state.player.hp, 18);
        assert!(state.player.impulse.z > 0.0);
        update_boss(&mut state, DT);
        assert_eq!(state.player.hp, 18);
    }

    #[test]
    fn frozen_boss_holds_but_still_hurts() {
        let mut state = GameState::new(GameTuning::default(), 2);
        spawn::spawn_boss_at(&mut state, Vec3::new(0.0, 0.0, -4.5));
        if let Some(boss) = state.boss.as_mut() {
            boss.body.frozen = Some(Countdown::new(5.0));
        }
        let start = flat_position(&state);
        update_boss(&mut state, DT);
        assert_eq!(flat_position(&state), start);
        assert_eq!(state.boss.as_ref().map(|b| b.jump_timer.elapsed), Some(0.0));
        assert_eq!(state.player.hp, 18);
    }

    #[test]
    fn shockwave_hits_grounded_player_once() {
        let mut state = GameState::new(GameTuning::default(), 2);
        state.shockwaves.push(Shockwave {
            origin: Vec3::new(0.0, 0.0, -5.0),
            radius: 0.0,
            hit_player: false,
        });
        for _ in 0..30 {
            update_shockwaves(&mut state, 0.1);
        }
        assert_eq!(state.player.hp, 17);
        assert!(state.shockwaves.is_empty());
    }

    #[test]
    fn shield_soaks_the_shockwave() {
        let mut state = GameState::new(GameTuning::default(), 2);
        state.inventory.has_protection = true;
        state.shockwaves.push(Shockwave {
            origin: Vec3::new(0.0, 0.0, -5.0),
            radius: 0.0,
            hit_player: false,
        });
        for _ in 0..30 {
            update_shockwaves(&mut state, 0.1);
        }
        assert_eq!(state.player.hp, 20);
        assert!(!state.inventory.has_protection);
        assert_eq!(state.events.count("shield_absorbed"), 1);
        assert_eq!(state.events.count("damage_taken"), 0);
    }

    #[test]
    fn shield_soaks_boss_contact() {
        let mut state = GameState::new(GameTuning::default(), 2);
        state.inventory.has_protection = true;
        spawn::spawn_boss_at(&mut state, Vec3::new(0.0, 0.0, -4.0));
        update_boss(&mut state, DT);
        assert_eq!(state.player.hp, 20);
        assert!(!state.inventory.has_protection);
        assert_eq!(state.events.count("shield_absorbed"), 1);
        assert!(state.player.impulse.z > 0.0);
        // Cooldown still running, so the bare player is safe for now.
        update_boss(&mut state, DT);
        assert_eq!(state.player.hp, 20);
    }

    #[test]
    fn shockwave_misses_airborne_player() {
        let mut state = GameState::new(GameTuning::default(), 2);
        state.player.position.y = 2.0;
        state.player.grounded = false;
        state.shockwaves.push(Shockwave {
            origin: Vec3::new(0.0, 0.0, -5.0),
            radius: 0.0,
            hit_player: false,
        });
        for _ in 0..30 {
            update_shockwaves(&mut state, 0.1);
        }
        assert_eq!(state.player.hp, 20);
    }
}
