use std::f32::consts::TAU;

use bevy::prelude::*;
use rand::Rng;

use crate::actor::{ActorBody, Boss, BossPhase, Enemy, EnemyKind};
use crate::components::{collides_with_any, horizontal, Aabb, Countdown};
use crate::state::GameState;
use crate::tuning::GameTuning;
use crate::world::WorldId;

pub fn enemy_hp(kind: EnemyKind, world: WorldId, tuning: &GameTuning) -> i32 {
    let slot = world.slot();
    match kind {
        EnemyKind::Melee => tuning.enemies.melee_hp[slot],
        EnemyKind::Ranged => tuning.enemies.ranged_hp[slot],
    }
}

pub fn roll_enemy_kind(rng: &mut impl Rng, world: WorldId, tuning: &GameTuning) -> EnemyKind {
    let share = tuning.spawn.ranged_share[world.slot()].clamp(0.0, 1.0);
    if rng.gen_bool(share) {
        EnemyKind::Ranged
    } else {
        EnemyKind::Melee
    }
}

/// Append an enemy standing on `ground` and count it towards the boss threshold.
/// Returns its registry slot.
pub fn spawn_enemy(state: &mut GameState, kind: EnemyKind, ground: Vec3, hp: i32) -> usize {
    let id = state.next_id();
    let tuning = &state.tuning.enemies;
    state.enemies.push(Enemy {
        body: ActorBody::new(id, ground, hp, tuning.speed, tuning.base_height),
        kind,
        shoot_timer: Countdown::new(tuning.shoot_interval),
    });
    state.world.enemies_spawned += 1;
    state.events.emit(
        "enemy_spawned",
        serde_json::json!({ "id": id, "kind": kind.label(), "hp": hp, "total": state.world.enemies_spawned }),
    );
    state.enemies.len() - 1
}

pub fn spawn_boss_at(state: &mut GameState, ground: Vec3) {
    let id = state.next_id();
    let tuning = &state.tuning;
    let speed = tuning.enemies.speed * tuning.boss.speed_factor;
    state.boss = Some(Boss {
        body: ActorBody::new(id, ground, tuning.boss.hp, speed, tuning.boss.base_height),
        phase: BossPhase::Approaching,
        jump_timer: Countdown::new(tuning.boss.jump_cooldown),
        ranged_timer: Countdown::new(tuning.boss.ranged_interval),
    });
    state.world.boss_spawned = true;
    info!("[Realmfall spawn] Boss spawned at ({:.1}, {:.1})", ground.x, ground.z);
    state.events.emit(
        "boss_spawned",
        serde_json::json!({ "id": id, "world": state.world.current.index(), "position": [ground.x, ground.z] }),
    );
}

/// Random point on a ring around `center`, inside the arena and clear of obstacles.
pub fn pick_spawn_point(state: &mut GameState, center: Vec3, ring: [f32; 2], half_extent: f32) -> Option<Vec3> {
    let bound = state.tuning.world.arena_half_size - half_extent;
    let (lo, hi) = (ring[0].min(ring[1]), ring[0].max(ring[1]));
    for _ in 0..state.tuning.spawn.attempts.max(1) {
        let angle = state.rng.gen_range(0.0..TAU);
        let radius = if hi > lo { state.rng.gen_range(lo..hi) } else { lo };
        let point = Vec3::new(center.x + angle.cos() * radius, 0.0, center.z + angle.sin() * radius);
        if point.x.abs() > bound || point.z.abs() > bound {
            continue;
        }
        if !collides_with_any(&state.world.obstacles, point, half_extent) {
            return Some(point);
        }
    }
    None
}

pub fn update_spawner(state: &mut GameState, dt: f32) {
    if state.world.spawn_timer.tick(dt) {
        state.world.spawn_timer.reset();
        if state.enemies.len() < state.tuning.spawn.max_alive {
            spawn_random_enemy(state);
        }
    }
    maybe_spawn_boss(state);
}

pub fn spawn_random_enemy(state: &mut GameState) -> bool {
    let world = state.world.current;
    let kind = roll_enemy_kind(&mut state.rng, world, &state.tuning);
    let ring = state.tuning.spawn.ring;
    let half = state.tuning.enemies.body_half_extent;
    let center = state.player.position;
    let Some(point) = pick_spawn_point(state, center, ring, half) else {
        debug!("[Realmfall spawn] No clear spawn point this round");
        return false;
    };
    let hp = enemy_hp(kind, world, &state.tuning);
    spawn_enemy(state, kind, point, hp);
    true
}

/// Spawns the boss once the world's spawn counter reaches the threshold. Runs once per world.
pub fn maybe_spawn_boss(state: &mut GameState) {
    let world = &state.world;
    if world.boss_spawned || state.boss.is_some() || world.enemies_spawned < state.tuning.boss.spawn_threshold {
        return;
    }
    let point = boss_spawn_point(state);
    spawn_boss_at(state, point);
}

/// Roll around the arena centre until the point is far enough from the player;
/// after the retries run out, mirror the player's position across the centre.
pub fn boss_spawn_point(state: &mut GameState) -> Vec3 {
    let tuning = state.tuning.boss.clone();
    let player = horizontal(state.player.position);
    for _ in 0..tuning.spawn_attempts.max(1) {
        let Some(point) = pick_spawn_point(state, Vec3::ZERO, tuning.spawn_ring, tuning.body_radius) else {
            continue;
        };
        if point.distance(player) >= tuning.spawn_min_player_distance {
            return point;
        }
    }
    let away = (-player).try_normalize().unwrap_or(Vec3::Z);
    let bound = state.tuning.world.arena_half_size - tuning.body_radius;
    let radius = tuning.spawn_ring[1].max(tuning.spawn_min_player_distance);
    clear_point_near(&state.world.obstacles, away, radius, bound, tuning.body_radius)
}

/// Walk outward from `dir * radius`, then sweep around the centre, until the
/// body fits between obstacles. Falls back to the starting point.
fn clear_point_near(obstacles: &[Aabb], dir: Vec3, radius: f32, bound: f32, half_extent: f32) -> Vec3 {
    const SWEEP: usize = 32;
    let clamp = |p: Vec3| Vec3::new(p.x.clamp(-bound, bound), 0.0, p.z.clamp(-bound, bound));
    let start = clamp(dir * radius);
    let step = half_extent.max(0.5);
    for k in 0..SWEEP {
        // 0, +1, -1, +2, -2 ... slices away from the mirrored direction
        let slice = k.div_ceil(2) as f32 * if k % 2 == 0 { -1.0 } else { 1.0 };
        let heading = Quat::from_rotation_y(slice * TAU / SWEEP as f32) * dir;
        for s in 0..8 {
            let point = clamp(heading * (radius + s as f32 * step));
            if !collides_with_any(obstacles, point, half_extent) {
                return point;
            }
        }
    }
    start
}
