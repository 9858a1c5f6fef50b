use std::collections::{BTreeSet, HashSet};

use bevy::prelude::*;

use crate::components::{horizontal, Ability, PickupKind, SpellKind, Weapon};
use crate::events::GameEventBus;
use crate::state::GameState;

/// World-scoped collectable lying on the ground.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pickup {
    pub id: u32,
    pub kind: PickupKind,
    pub position: Vec3,
}

/// Weapon slot, stackable consumables and purchases.
///
/// At most one weapon is ever equipped; `proxy` mirrors the weapon model
/// attached to the camera and always matches `equipped` between calls.
#[derive(Clone, Debug)]
pub struct Inventory {
    pub equipped: Option<Weapon>,
    pub proxy: Option<Weapon>,
    owned: BTreeSet<Weapon>,
    abilities: HashSet<Ability>,
    pub shields: u32,
    pub food: u32,
    pub has_protection: bool,
    pub selected_spell: SpellKind,
    pub coins: u32,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

impl Inventory {
    /// The sword is always owned and starts equipped.
    pub fn new() -> Self {
        Self {
            equipped: Some(Weapon::Sword),
            proxy: Some(Weapon::Sword),
            owned: BTreeSet::from([Weapon::Sword]),
            abilities: HashSet::new(),
            shields: 0,
            food: 0,
            has_protection: false,
            selected_spell: SpellKind::default(),
            coins: 0,
        }
    }

    pub fn owns(&self, weapon: Weapon) -> bool {
        self.owned.contains(&weapon)
    }

    pub fn owned_weapons(&self) -> impl Iterator<Item = Weapon> + '_ {
        self.owned.iter().copied()
    }

    /// Returns false when the weapon was already owned.
    pub fn grant_weapon(&mut self, weapon: Weapon) -> bool {
        self.owned.insert(weapon)
    }

    pub fn has_ability(&self, ability: Ability) -> bool {
        self.abilities.contains(&ability)
    }

    pub fn grant_ability(&mut self, ability: Ability) -> bool {
        self.abilities.insert(ability)
    }

    pub fn is_equipped(&self, weapon: Weapon) -> bool {
        self.equipped == Some(weapon)
    }

    pub fn equip(&mut self, weapon: Weapon, events: &mut GameEventBus) -> Result<(), String> {
        if !self.owns(weapon) {
            return Err(format!("{} not owned", weapon.label()));
        }
        if self.is_equipped(weapon) {
            return Ok(());
        }
        self.detach(events);
        self.attach(weapon, events);
        Ok(())
    }

    /// Dropping anything but the sword falls back to the sword; dropping the sword leaves hands empty.
    pub fn unequip(&mut self, events: &mut GameEventBus) {
        match self.equipped {
            Some(Weapon::Sword) => self.detach(events),
            Some(_) => {
                self.detach(events);
                self.attach(Weapon::Sword, events);
            }
            None => {}
        }
    }

    fn detach(&mut self, events: &mut GameEventBus) {
        if let Some(old) = self.equipped.take() {
            self.proxy = None;
            events.emit("weapon_detached", serde_json::json!({ "weapon": old.label() }));
        }
    }

    fn attach(&mut self, weapon: Weapon, events: &mut GameEventBus) {
        self.equipped = Some(weapon);
        self.proxy = Some(weapon);
        events.emit("weapon_attached", serde_json::json!({ "weapon": weapon.label() }));
    }

    /// Move one shield from the stack into the one-hit protection flag.
    /// Does nothing while protection is already up.
    pub fn equip_shield(&mut self, events: &mut GameEventBus) -> Result<(), String> {
        if self.has_protection {
            return Ok(());
        }
        if self.shields == 0 {
            return Err("no shields".to_string());
        }
        self.shields -= 1;
        self.has_protection = true;
        events.emit("shield_equipped", serde_json::json!({ "shields_left": self.shields }));
        Ok(())
    }

    /// Consume protection if present.
    pub fn take_protection(&mut self) -> bool {
        std::mem::take(&mut self.has_protection)
    }
}

pub fn consume_food(state: &mut GameState) -> Result<(), String> {
    if state.inventory.food == 0 {
        return Err("no food".to_string());
    }
    state.inventory.food -= 1;
    let healed = state.player.heal(state.tuning.player.food_heal);
    state.events.emit(
        "food_eaten",
        serde_json::json!({ "healed": healed, "hp": state.player.hp, "food_left": state.inventory.food }),
    );
    Ok(())
}

/// Collect every pickup within reach of the player. Walks backward so removal is safe.
pub fn collect_pickups(state: &mut GameState) {
    let reach = state.tuning.world.pickup_radius;
    let feet = state.player.position;
    for i in (0..state.pickups.len()).rev() {
        let pickup = state.pickups[i];
        if horizontal(pickup.position - feet).length() > reach {
            continue;
        }
        state.pickups.remove(i);
        apply_pickup(state, pickup.kind);
        state.events.emit(
            "pickup_collected",
            serde_json::json!({ "id": pickup.id, "kind": format!("{:?}", pickup.kind) }),
        );
    }
}

fn apply_pickup(state: &mut GameState, kind: PickupKind) {
    let inv = &mut state.inventory;
    match kind {
        PickupKind::Food => inv.food += 1,
        PickupKind::Shield => inv.shields += 1,
        PickupKind::Coins(amount) => inv.coins = inv.coins.saturating_add(amount),
        PickupKind::Weapon(weapon) => {
            inv.grant_weapon(weapon);
            if let Err(reason) = inv.equip(weapon, &mut state.events) {
                warn!("[Realmfall inventory] Could not equip picked-up {}: {reason}", weapon.label());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::GameTuning;

    fn equipped_count(inv: &Inventory) -> usize {
        Weapon::ALL.iter().filter(|w| inv.is_equipped(**w)).count()
    }

    #[test]
    fn equipping_swaps_the_single_slot() {
        let mut events = GameEventBus::default();
        let mut inv = Inventory::new();
        inv.grant_weapon(Weapon::Bow);
        inv.grant_weapon(Weapon::Axe);

        inv.equip(Weapon::Bow, &mut events).expect("bow equips");
        assert!(!inv.is_equipped(Weapon::Sword));
        assert!(inv.is_equipped(Weapon::Bow));
        assert_eq!(inv.proxy, Some(Weapon::Bow));
        assert_eq!(equipped_count(&inv), 1);

        inv.equip(Weapon::Axe, &mut events).expect("axe equips");
        assert!(!inv.is_equipped(Weapon::Bow));
        assert_eq!(inv.proxy, Some(Weapon::Axe));
        assert_eq!(equipped_count(&inv), 1);
        assert_eq!(events.count("weapon_detached"), 2);
        assert_eq!(
            events.last("weapon_detached").map(|e| e.data["weapon"].clone()),
            Some(serde_json::json!("bow"))
        );
    }

    #[test]
    fn unowned_weapons_are_refused() {
        let mut events = GameEventBus::default();
        let mut inv = Inventory::new();
        assert!(inv.equip(Weapon::Spellbook, &mut events).is_err());
        assert!(inv.is_equipped(Weapon::Sword));
    }

    #[test]
    fn unequip_falls_back_to_sword_then_empty() {
        let mut events = GameEventBus::default();
        let mut inv = Inventory::new();
        inv.grant_weapon(Weapon::Axe);
        inv.equip(Weapon::Axe, &mut events).expect("axe equips");
        inv.unequip(&mut events);
        assert!(inv.is_equipped(Weapon::Sword));
        inv.unequip(&mut events);
        assert_eq!(inv.equipped, None);
        assert_eq!(inv.proxy, None);
        assert_eq!(equipped_count(&inv), 0);
    }

    #[test]
    fn shield_is_a_flag_not_a_counter() {
        let mut events = GameEventBus::default();
        let mut inv = Inventory::new();
        inv.shields = 2;
        inv.equip_shield(&mut events).expect("first shield");
        inv.equip_shield(&mut events).expect("second press is a no-op");
        assert_eq!(inv.shields, 1);
        assert_eq!(events.count("shield_equipped"), 1);
        assert!(inv.take_protection());
        assert!(!inv.take_protection());
        assert_eq!(inv.shields, 1);
    }

    #[test]
    fn food_heals_clamped_to_max() {
        let mut state = GameState::new(GameTuning::default(), 1);
        state.inventory.food = 2;
        state.player.hp = 18;
        consume_food(&mut state).expect("eat");
        assert_eq!(state.player.hp, 20);
        assert_eq!(state.inventory.food, 1);
        consume_food(&mut state).expect("eat at full health");
        assert_eq!(state.player.hp, 20);
        assert_eq!(state.inventory.food, 0);
        assert!(consume_food(&mut state).is_err());
    }

    #[test]
    fn walking_over_a_weapon_pickup_equips_it() {
        let mut state = GameState::new(GameTuning::default(), 1);
        state.pickups.push(Pickup {
            id: 1,
            kind: PickupKind::Weapon(Weapon::Bow),
            position: Vec3::new(0.5, 0.0, 0.5),
        });
        state.pickups.push(Pickup {
            id: 2,
            kind: PickupKind::Food,
            position: Vec3::new(30.0, 0.0, 0.0),
        });
        collect_pickups(&mut state);
        assert!(state.inventory.is_equipped(Weapon::Bow));
        assert_eq!(state.pickups.len(), 1);
        assert_eq!(state.pickups[0].id, 2);
    }
}
