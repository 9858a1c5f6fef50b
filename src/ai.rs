use bevy::prelude::*;

use crate::actor::{Enemy, EnemyKind, SteerContext, SteerOutcome, Steerable};
use crate::components::{collides_with_any, horizontal, Aabb, Countdown};
use crate::player::PlayerHit;
use crate::projectile;
use crate::state::GameState;

/// Direct, left, right and the two diagonals, all unit length.
pub fn candidate_steps(dir: Vec3) -> [Vec3; 5] {
    let left = Vec3::new(dir.z, 0.0, -dir.x);
    let right = -left;
    [
        dir,
        (dir + left).normalize_or_zero(),
        (dir + right).normalize_or_zero(),
        left,
        right,
    ]
}

/// Greedy local avoidance: the clear candidate best aligned with `dir`,
/// then an X-only slide, then a Z-only slide. `None` means hold position.
pub fn choose_step(position: Vec3, dir: Vec3, step: f32, obstacles: &[Aabb], half_extent: f32) -> Option<Vec3> {
    let clear = |delta: Vec3| !collides_with_any(obstacles, position + delta, half_extent);

    let mut best: Option<(f32, Vec3)> = None;
    for candidate in candidate_steps(dir) {
        let delta = candidate * step;
        if !clear(delta) {
            continue;
        }
        let score = candidate.dot(dir);
        if best.map_or(true, |(top, _)| score > top) {
            best = Some((score, delta));
        }
    }
    if let Some((_, delta)) = best {
        return Some(delta);
    }

    [Vec3::new(dir.x, 0.0, 0.0), Vec3::new(0.0, 0.0, dir.z)]
        .into_iter()
        .filter(|axis| axis.length_squared() > 1e-6)
        .map(|axis| axis * step)
        .find(|delta| clear(*delta))
}

impl Steerable for Enemy {
    fn steer(&mut self, ctx: &SteerContext<'_>, dt: f32) -> SteerOutcome {
        let tuning = &ctx.tuning.enemies;
        let to_player = horizontal(ctx.player - self.body.position);
        let distance = to_player.length();
        let dir = to_player.normalize_or_zero();
        let step = self.body.speed * dt;
        let mut outcome = SteerOutcome::default();

        match self.kind {
            EnemyKind::Ranged => {
                let wish = if distance < tuning.standoff {
                    -dir
                } else if distance > tuning.standoff + tuning.standoff_tolerance {
                    dir
                } else {
                    Vec3::ZERO
                };
                let next = self.body.position + wish * step;
                if wish != Vec3::ZERO && !collides_with_any(ctx.obstacles, next, tuning.body_half_extent) {
                    self.body.position = next;
                }
                if self.shoot_timer.tick(dt) {
                    self.shoot_timer.reset();
                    if distance <= tuning.shoot_range {
                        outcome.fire_at = Some(ctx.player);
                    }
                }
            }
            EnemyKind::Melee => {
                let touching = ctx.tuning.player.body_half_extent + tuning.body_half_extent;
                if distance > touching {
                    let step = step.min(distance - touching);
                    if let Some(delta) =
                        choose_step(self.body.position, dir, step, ctx.obstacles, tuning.body_half_extent)
                    {
                        self.body.position += delta;
                    }
                }
            }
        }

        self.body.face(ctx.player);
        self.body.bob(ctx.elapsed, tuning.bob_frequency, tuning.bob_amplitude);
        outcome
    }
}

pub fn update_enemies(state: &mut GameState, dt: f32) {
    let ctx = SteerContext {
        player: state.player.position,
        obstacles: &state.world.obstacles,
        tuning: &state.tuning,
        elapsed: state.elapsed,
    };
    let mut shots = Vec::new();
    for enemy in state.enemies.iter_mut().filter(|e| !e.body.is_frozen()) {
        if enemy.steer(&ctx, dt).fire_at.is_some() {
            shots.push(enemy.body.position);
        }
    }

    let damage = state.tuning.enemies.shot_damage;
    for origin in shots {
        projectile::spawn_hostile(state, origin, damage, "ranged_enemy");
    }

    resolve_contacts(state);
}

fn resolve_contacts(state: &mut GameState) {
    let tuning = state.tuning.enemies.clone();
    for i in 0..state.enemies.len() {
        if state.is_finished() {
            return;
        }
        let body = &state.enemies[i].body;
        if body.is_frozen()
            || body.contact_cooldown.is_some()
            || body.horizontal_distance_to(state.player.position) > tuning.contact_radius
        {
            continue;
        }
        let normal = horizontal(state.player.position - body.position).normalize_or_zero();
        let outcome = state.hit_player(tuning.contact_damage, normal, tuning.knockback, "melee_enemy");

        let obstacles = &state.world.obstacles;
        let body = &mut state.enemies[i].body;
        if outcome == PlayerHit::Absorbed {
            let pushed = body.position - normal * tuning.shield_push;
            if !collides_with_any(obstacles, pushed, tuning.body_half_extent) {
                body.position = pushed;
            }
        }
        body.contact_cooldown = Some(Countdown::new(tuning.contact_cooldown));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spawn;
    use crate::tuning::GameTuning;

    const FORWARD: Vec3 = Vec3::new(0.0, 0.0, -1.0);

    #[test]
    fn clear_path_goes_straight() {
        let step = choose_step(Vec3::ZERO, FORWARD, 1.0, &[], 0.5).expect("step");
        assert!((step - FORWARD).length() < 1e-5);
    }

    #[test]
    fn narrow_post_is_skirted_diagonally() {
        let post = [Aabb::ground_box(0.0, -1.4, 0.2, 0.6, 2.0)];
        let step = choose_step(Vec3::ZERO, FORWARD, 1.0, &post, 0.5).expect("step");
        assert!(step.z < 0.0);
        assert!(step.x.abs() > 0.5);
        assert!((step.normalize().dot(FORWARD) - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-4);
    }

    #[test]
    fn wide_wall_falls_back_to_sidestep() {
        let wall = [Aabb::ground_box(0.0, -1.3, 3.0, 0.7, 2.0)];
        let step = choose_step(Vec3::ZERO, FORWARD, 1.0, &wall, 0.5).expect("sidestep");
        assert!(step.z.abs() < 1e-5);
        assert!((step.x.abs() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn boxed_in_enemy_holds() {
        let walls = [
            Aabb::ground_box(0.0, -1.3, 3.0, 0.7, 2.0),
            Aabb::ground_box(0.0, 1.3, 3.0, 0.7, 2.0),
            Aabb::ground_box(-1.3, 0.0, 0.7, 3.0, 2.0),
            Aabb::ground_box(1.3, 0.0, 0.7, 3.0, 2.0),
        ];
        assert_eq!(choose_step(Vec3::ZERO, FORWARD, 1.0, &walls, 0.5), None);
    }

    #[test]
    fn ranged_enemy_keeps_standoff_and_fires() {
        let mut state = GameState::new(GameTuning::default(), 5);
        spawn::spawn_enemy(&mut state, EnemyKind::Ranged, Vec3::new(0.0, 0.0, -10.0), 3);
        spawn::spawn_enemy(&mut state, EnemyKind::Ranged, Vec3::new(0.0, 0.0, -25.0), 3);
        spawn::spawn_enemy(&mut state, EnemyKind::Ranged, Vec3::new(0.0, 0.0, -60.0), 3);
        for _ in 0..8 {
            update_enemies(&mut state, 0.25);
        }
        let z: Vec<f32> = state.enemies.iter().map(|e| e.body.position.z).collect();
        assert!(z[0] < -10.0);
        assert_eq!(z[1], -25.0);
        assert!(z[2] > -60.0);
        assert_eq!(state.hostile_projectiles.len(), 2);
    }

    #[test]
    fn contact_damage_waits_for_cooldown() {
        let mut state = GameState::new(GameTuning::default(), 5);
        spawn::spawn_enemy(&mut state, EnemyKind::Melee, Vec3::new(0.0, 0.0, -2.0), 5);
        update_enemies(&mut state, 0.1);
        assert_eq!(state.player.hp, 19);
        assert!(state.player.impulse.z > 0.0);
        update_enemies(&mut state, 0.1);
        assert_eq!(state.player.hp, 19);
        state.enemies[0].body.tick_statuses(1.0);
        update_enemies(&mut state, 0.1);
        assert_eq!(state.player.hp, 18);
    }

    #[test]
    fn shield_absorbs_contact_and_pushes_enemy_back() {
        let mut state = GameState::new(GameTuning::default(), 5);
        state.inventory.has_protection = true;
        spawn::spawn_enemy(&mut state, EnemyKind::Melee, Vec3::new(0.0, 0.0, -2.0), 5);
        update_enemies(&mut state, 0.0);
        assert_eq!(state.player.hp, 20);
        assert!(!state.inventory.has_protection);
        assert!((state.enemies[0].body.position.z + 4.0).abs() < 1e-4);
    }

    #[test]
    fn frozen_enemy_does_nothing() {
        let mut state = GameState::new(GameTuning::default(), 5);
        spawn::spawn_enemy(&mut state, EnemyKind::Melee, Vec3::new(0.0, 0.0, -2.0), 5);
        state.enemies[0].body.frozen = Some(Countdown::new(3.0));
        let before = state.enemies[0].body.position;
        update_enemies(&mut state, 0.5);
        assert_eq!(state.enemies[0].body.position, before);
        assert_eq!(state.player.hp, 20);
    }
}
