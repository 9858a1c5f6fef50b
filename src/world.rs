use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::{horizontal, Aabb, Countdown, PickupKind, Weapon};
use crate::inventory::Pickup;
use crate::shop::Shop;
use crate::spawn;
use crate::state::GameState;
use crate::tuning::GameTuning;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldId {
    One,
    Two,
    Three,
}

impl WorldId {
    pub const ALL: [WorldId; 3] = [WorldId::One, WorldId::Two, WorldId::Three];

    /// 1-based world number shown to the player.
    pub fn index(self) -> u8 {
        self.slot() as u8 + 1
    }

    /// 0-based slot into per-world tuning tables.
    pub fn slot(self) -> usize {
        match self {
            WorldId::One => 0,
            WorldId::Two => 1,
            WorldId::Three => 2,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index).checked_sub(1)?).copied()
    }

    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }
}

/// Sky, fog and ground colours plus fog range for one world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldTheme {
    pub name: &'static str,
    pub sky: [f32; 3],
    pub fog: [f32; 3],
    pub fog_start: f32,
    pub fog_end: f32,
    pub ground: [f32; 3],
    pub obstacle: [f32; 3],
}

pub fn theme(world: WorldId) -> WorldTheme {
    match world {
        WorldId::One => WorldTheme {
            name: "meadow",
            sky: [0.53, 0.81, 0.92],
            fog: [0.62, 0.84, 0.92],
            fog_start: 30.0,
            fog_end: 120.0,
            ground: [0.30, 0.62, 0.25],
            obstacle: [0.45, 0.42, 0.38],
        },
        WorldId::Two => WorldTheme {
            name: "dunes",
            sky: [0.95, 0.62, 0.36],
            fog: [0.90, 0.58, 0.32],
            fog_start: 20.0,
            fog_end: 90.0,
            ground: [0.82, 0.70, 0.45],
            obstacle: [0.66, 0.45, 0.28],
        },
        WorldId::Three => WorldTheme {
            name: "abyss",
            sky: [0.12, 0.05, 0.20],
            fog: [0.10, 0.03, 0.15],
            fog_start: 10.0,
            fog_end: 60.0,
            ground: [0.18, 0.14, 0.22],
            obstacle: [0.35, 0.12, 0.40],
        },
    }
}

/// Fixed entity set built on entry.
struct WorldLayout {
    obstacles: usize,
    food: usize,
    shields: usize,
    coin_piles: usize,
    coin_value: u32,
    weapons: &'static [Weapon],
}

fn layout(world: WorldId) -> WorldLayout {
    match world {
        WorldId::One => WorldLayout {
            obstacles: 8,
            food: 3,
            shields: 1,
            coin_piles: 2,
            coin_value: 5,
            weapons: &[],
        },
        WorldId::Two => WorldLayout {
            obstacles: 12,
            food: 3,
            shields: 2,
            coin_piles: 3,
            coin_value: 10,
            weapons: &[Weapon::Bow],
        },
        WorldId::Three => WorldLayout {
            obstacles: 16,
            food: 4,
            shields: 2,
            coin_piles: 4,
            coin_value: 15,
            weapons: &[],
        },
    }
}

const SHOP_POSITION: Vec3 = Vec3::new(6.0, 0.0, 6.0);
/// Obstacles keep out of this radius around the spawn point and the shop.
const CLEAR_RADIUS: f32 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Portal {
    pub position: Vec3,
    pub target: WorldId,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingTransition {
    pub target: WorldId,
    pub timer: Countdown,
}

/// Everything scoped to the current world. Replaced wholesale on transition.
#[derive(Clone, Debug)]
pub struct WorldState {
    pub current: WorldId,
    pub theme: WorldTheme,
    pub obstacles: Vec<Aabb>,
    pub portal: Option<Portal>,
    /// Portal waiting to appear where the boss fell.
    pub pending_portal: Option<(Countdown, Vec3)>,
    pub transition: Option<PendingTransition>,
    pub enemies_spawned: u32,
    pub spawn_timer: Countdown,
    pub boss_spawned: bool,
    pub shop: Option<Shop>,
}

impl WorldState {
    pub fn new(world: WorldId, tuning: &GameTuning) -> Self {
        Self {
            current: world,
            theme: theme(world),
            obstacles: Vec::new(),
            portal: None,
            pending_portal: None,
            transition: None,
            enemies_spawned: 0,
            spawn_timer: Countdown::new(tuning.spawn.interval),
            boss_spawned: false,
            shop: None,
        }
    }
}

/// Reset world-scoped state and construct the world's initial entity set.
pub fn build_world(state: &mut GameState, world: WorldId) {
    state.world = WorldState::new(world, &state.tuning);
    let layout = layout(world);

    place_obstacles(state, layout.obstacles);
    state.world.shop = Some(Shop {
        world,
        position: SHOP_POSITION,
    });

    let kinds = std::iter::repeat(PickupKind::Food)
        .take(layout.food)
        .chain(std::iter::repeat(PickupKind::Shield).take(layout.shields))
        .chain(std::iter::repeat(PickupKind::Coins(layout.coin_value)).take(layout.coin_piles))
        .chain(layout.weapons.iter().map(|w| PickupKind::Weapon(*w)));
    for kind in kinds {
        let Some(position) = spawn::pick_spawn_point(state, Vec3::ZERO, [5.0, 30.0], 0.5) else {
            continue;
        };
        let id = state.next_id();
        state.pickups.push(Pickup { id, kind, position });
    }

    let initial = state.tuning.spawn.initial_enemies[world.slot()];
    for _ in 0..initial {
        spawn::spawn_random_enemy(state);
    }

    info!(
        "[Realmfall world] Entered world {} ({}) with {} enemies",
        world.index(),
        state.world.theme.name,
        state.enemies.len()
    );
    state.events.emit(
        "world_entered",
        serde_json::json!({
            "world": world.index(),
            "theme": state.world.theme.name,
            "enemies": state.enemies.len(),
            "pickups": state.pickups.len(),
        }),
    );
}

fn place_obstacles(state: &mut GameState, count: usize) {
    let bound = state.tuning.world.arena_half_size - 4.0;
    let mut attempts = count * 10;
    while state.world.obstacles.len() < count && attempts > 0 {
        attempts -= 1;
        let x = state.rng.gen_range(-bound..bound);
        let z = state.rng.gen_range(-bound..bound);
        let center = Vec3::new(x, 0.0, z);
        if center.length() < CLEAR_RADIUS || center.distance(SHOP_POSITION) < CLEAR_RADIUS {
            continue;
        }
        let half_x = state.rng.gen_range(1.0..3.0);
        let half_z = state.rng.gen_range(1.0..3.0);
        let height = state.rng.gen_range(2.0..6.0);
        state
            .world
            .obstacles
            .push(Aabb::ground_box(x, z, half_x, half_z, height));
    }
}

/// Start the delayed teardown/rebuild. Returns false when the request is ignored:
/// the target is the current world or a transition is already pending.
pub fn request_world_transition(state: &mut GameState, target: WorldId) -> bool {
    if target == state.world.current || state.world.transition.is_some() {
        return false;
    }
    state.world.transition = Some(PendingTransition {
        target,
        timer: Countdown::new(state.tuning.world.transition_delay),
    });
    state.events.emit(
        "world_transition_started",
        serde_json::json!({ "from": state.world.current.index(), "to": target.index() }),
    );
    true
}

/// Advance a pending transition. Returns true while one is in progress,
/// including the tick it completes on, so gameplay sits the tick out.
pub fn advance_transition(state: &mut GameState, dt: f32) -> bool {
    let Some(pending) = state.world.transition.as_mut() else {
        return false;
    };
    if pending.timer.tick(dt) {
        let target = pending.target;
        complete_transition(state, target);
    }
    true
}

fn complete_transition(state: &mut GameState, target: WorldId) {
    let from = state.world.current;
    state.enemies.clear();
    state.boss = None;
    state.projectiles.clear();
    state.hostile_projectiles.clear();
    state.pickups.clear();
    state.shockwaves.clear();
    state.overlay = None;

    let [x, y, z] = state.tuning.player.spawn_point;
    let player = &mut state.player;
    player.position = Vec3::new(x, y, z);
    player.vertical_velocity = 0.0;
    player.grounded = true;
    player.impulse = Vec3::ZERO;

    build_world(state, target);
    state.events.emit(
        "world_transition_completed",
        serde_json::json!({ "from": from.index(), "to": target.index() }),
    );
}

pub fn schedule_portal(state: &mut GameState, position: Vec3) {
    let bound = state.tuning.world.arena_half_size - 2.0;
    let ground = horizontal(position).clamp(Vec3::splat(-bound), Vec3::splat(bound));
    state.world.pending_portal = Some((Countdown::new(state.tuning.boss.portal_delay), ground));
}

pub fn update_portal(state: &mut GameState, dt: f32) {
    if let Some((timer, position)) = state.world.pending_portal.as_mut() {
        if timer.tick(dt) {
            let position = *position;
            state.world.pending_portal = None;
            if let Some(target) = state.world.current.next() {
                state.world.portal = Some(Portal { position, target });
                info!("[Realmfall world] Portal to world {} opened", target.index());
                state
                    .events
                    .emit("portal_spawned", serde_json::json!({ "to": target.index() }));
            }
        }
    }

    let Some(portal) = state.world.portal else {
        return;
    };
    let reach = state.tuning.world.portal_radius;
    if horizontal(state.player.position - portal.position).length() <= reach {
        request_world_transition(state, portal.target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PlayerInput;

    fn state_in(world: WorldId) -> GameState {
        let mut state = GameState::new(GameTuning::default(), 12);
        build_world(&mut state, world);
        state
    }

    #[test]
    fn world_numbers_round_trip() {
        assert_eq!(WorldId::from_index(0), None);
        assert_eq!(WorldId::from_index(2), Some(WorldId::Two));
        assert_eq!(WorldId::Two.next(), Some(WorldId::Three));
        assert_eq!(WorldId::Three.next(), None);
    }

    #[test]
    fn reentering_current_world_is_a_no_op() {
        let mut state = state_in(WorldId::Three);
        let before = state.entity_counts();
        assert!(!request_world_transition(&mut state, WorldId::Three));
        for _ in 0..10 {
            advance_transition(&mut state, 0.25);
        }
        assert_eq!(state.entity_counts(), before);
        assert_eq!(state.world.current.index(), 3);
        assert_eq!(state.events.count("world_transition_started"), 0);
    }

    #[test]
    fn transition_rebuilds_after_delay() {
        let mut state = state_in(WorldId::One);
        state.world.boss_spawned = true;
        state.player.position = Vec3::new(12.0, 0.0, -7.0);
        assert!(request_world_transition(&mut state, WorldId::Two));
        assert!(!request_world_transition(&mut state, WorldId::Three));

        let walk = PlayerInput {
            move_forward: 1.0,
            ..Default::default()
        };
        for _ in 0..3 {
            state.tick(&walk, 0.25);
            assert_eq!(state.world.current, WorldId::One);
            assert_eq!(state.player.position, Vec3::new(12.0, 0.0, -7.0));
        }
        state.tick(&walk, 0.25);
        assert_eq!(state.world.current, WorldId::Two);
        assert!(state.world.transition.is_none());
        assert_eq!(state.player.position, Vec3::ZERO);
        assert_eq!(state.enemies.len(), 8);
        assert_eq!(state.world.enemies_spawned, 8);
        assert!(!state.world.boss_spawned);
        assert_eq!(state.world.shop.map(|s| s.world), Some(WorldId::Two));
        assert_eq!(state.world.theme, theme(WorldId::Two));
    }

    #[test]
    fn boss_portal_opens_then_leads_onward() {
        let mut state = GameState::new(GameTuning::default(), 12);
        schedule_portal(&mut state, Vec3::new(0.0, 3.0, -1.0));
        update_portal(&mut state, 2.0);
        assert!(state.world.portal.is_none());
        update_portal(&mut state, 1.0);
        let portal = state.world.portal.expect("portal open");
        assert_eq!(portal.target, WorldId::Two);
        assert_eq!(portal.position.y, 0.0);
        assert!(state.world.transition.is_some());
    }
}
