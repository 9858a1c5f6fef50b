use bevy::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::actor::{Attackable, Boss, Enemy, TargetRef};
use crate::boss::Shockwave;
use crate::events::GameEventBus;
use crate::input::PlayerInput;
use crate::inventory::{Inventory, Pickup};
use crate::player::Player;
use crate::progression::Progression;
use crate::projectile::{HostileProjectile, Projectile};
use crate::tuning::GameTuning;
use crate::world::{WorldId, WorldState};
use crate::{ai, boss, inventory, player, projectile, shop, spawn, world};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Overlay {
    Inventory,
    Shop,
}

/// Live entity counts, used by the HUD, the scripted simulation and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub enemies: usize,
    pub boss: usize,
    pub projectiles: usize,
    pub hostile_projectiles: usize,
    pub pickups: usize,
    pub shockwaves: usize,
    pub portal: usize,
    pub obstacles: usize,
}

/// Gameplay phases after player movement, in tick order.
const PHASES: [fn(&mut GameState, f32); 6] = [
    ai::update_enemies,
    boss::update_boss,
    update_collectables,
    projectile::update_projectiles,
    decay_cooldowns,
    spawn::update_spawner,
];

/// The whole session: one instance per game, mutated in place by `tick`.
#[derive(Resource)]
pub struct GameState {
    pub tuning: GameTuning,
    pub player: Player,
    pub progression: Progression,
    pub inventory: Inventory,
    pub world: WorldState,
    pub enemies: Vec<Enemy>,
    pub boss: Option<Boss>,
    pub projectiles: Vec<Projectile>,
    pub hostile_projectiles: Vec<HostileProjectile>,
    pub pickups: Vec<Pickup>,
    pub shockwaves: Vec<Shockwave>,
    pub overlay: Option<Overlay>,
    pub game_over: bool,
    pub victory: bool,
    /// Gameplay seconds; paused time does not count.
    pub elapsed: f32,
    pub events: GameEventBus,
    pub rng: SmallRng,
    next_id: u32,
}

impl GameState {
    /// Empty session in world one: no obstacles, actors or pickups.
    pub fn new(tuning: GameTuning, seed: u64) -> Self {
        Self {
            player: Player::new(&tuning.player),
            progression: Progression::new(&tuning),
            inventory: Inventory::new(),
            world: WorldState::new(WorldId::One, &tuning),
            enemies: Vec::new(),
            boss: None,
            projectiles: Vec::new(),
            hostile_projectiles: Vec::new(),
            pickups: Vec::new(),
            shockwaves: Vec::new(),
            overlay: None,
            game_over: false,
            victory: false,
            elapsed: 0.0,
            events: GameEventBus::default(),
            rng: SmallRng::seed_from_u64(seed),
            next_id: 1,
            tuning,
        }
    }

    /// New session with world one fully built.
    pub fn start(tuning: GameTuning, seed: u64) -> Self {
        let mut state = Self::new(tuning, seed);
        world::build_world(&mut state, WorldId::One);
        state
    }

    pub fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    pub fn tick(&mut self, input: &PlayerInput, dt: f32) {
        self.events.advance_frame();
        if self.is_finished() {
            return;
        }
        self.apply_menu_input(input);
        if world::advance_transition(self, dt) {
            return;
        }
        if self.overlay.is_some() {
            return;
        }
        self.elapsed += dt;
        player::update_player(self, input, dt);
        for phase in PHASES {
            if self.is_finished() {
                return;
            }
            phase(self, dt);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.game_over || self.victory
    }

    /// Inventory and shop commands; these still apply while an overlay pauses gameplay.
    fn apply_menu_input(&mut self, input: &PlayerInput) {
        if input.close_overlay {
            self.overlay = None;
        }
        if input.toggle_inventory {
            self.toggle_overlay(Overlay::Inventory);
        }
        if input.toggle_shop {
            self.toggle_overlay(Overlay::Shop);
        }
        if input.cycle_spell {
            self.inventory.selected_spell = self.inventory.selected_spell.next();
        }
        if let Some(weapon) = input.equip {
            if let Err(reason) = self.inventory.equip(weapon, &mut self.events) {
                self.refuse("equip", reason);
            }
        }
        if input.unequip {
            self.inventory.unequip(&mut self.events);
        }
        if input.equip_shield {
            if let Err(reason) = self.inventory.equip_shield(&mut self.events) {
                self.refuse("equip_shield", reason);
            }
        }
        if input.eat {
            if let Err(reason) = inventory::consume_food(self) {
                self.refuse("eat", reason);
            }
        }
        if let Some(item) = input.buy {
            if let Err(reason) = shop::buy(self, item) {
                self.refuse("buy", reason);
            }
        }
    }

    fn toggle_overlay(&mut self, overlay: Overlay) {
        self.overlay = if self.overlay == Some(overlay) {
            None
        } else {
            Some(overlay)
        };
    }

    pub fn refuse(&mut self, action: &str, reason: String) {
        debug!("[Realmfall] {action} refused: {reason}");
        self.events.emit(
            "action_refused",
            serde_json::json!({ "action": action, "reason": reason }),
        );
    }

    pub fn targets(&self) -> impl Iterator<Item = (TargetRef, &dyn Attackable)> + '_ {
        self.enemies
            .iter()
            .enumerate()
            .map(|(i, e)| (TargetRef::Enemy(i), e as &dyn Attackable))
            .chain(self.boss.iter().map(|b| (TargetRef::Boss, b as &dyn Attackable)))
    }

    pub fn attackable_mut(&mut self, target: TargetRef) -> Option<&mut dyn Attackable> {
        match target {
            TargetRef::Enemy(i) => self.enemies.get_mut(i).map(|e| e as &mut dyn Attackable),
            TargetRef::Boss => self.boss.as_mut().map(|b| b as &mut dyn Attackable),
        }
    }

    pub fn entity_counts(&self) -> EntityCounts {
        EntityCounts {
            enemies: self.enemies.len(),
            boss: usize::from(self.boss.is_some()),
            projectiles: self.projectiles.len(),
            hostile_projectiles: self.hostile_projectiles.len(),
            pickups: self.pickups.len(),
            shockwaves: self.shockwaves.len(),
            portal: usize::from(self.world.portal.is_some()),
            obstacles: self.world.obstacles.len(),
        }
    }
}

fn update_collectables(state: &mut GameState, dt: f32) {
    inventory::collect_pickups(state);
    world::update_portal(state, dt);
}

pub fn decay_cooldowns(state: &mut GameState, dt: f32) {
    player::tick_player_cooldowns(state, dt);
    for enemy in &mut state.enemies {
        enemy.body.tick_statuses(dt);
    }
    if let Some(boss) = state.boss.as_mut() {
        boss.body.tick_statuses(dt);
    }
}
