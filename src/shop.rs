use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::{Ability, Weapon};
use crate::state::GameState;
use crate::world::WorldId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShopItem {
    Food,
    Shield,
    Weapon(Weapon),
    BigJump,
}

impl ShopItem {
    pub fn label(self) -> &'static str {
        match self {
            ShopItem::Food => "food",
            ShopItem::Shield => "shield",
            ShopItem::Weapon(w) => w.label(),
            ShopItem::BigJump => "big_jump",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "food" => Some(ShopItem::Food),
            "shield" => Some(ShopItem::Shield),
            "big_jump" => Some(ShopItem::BigJump),
            other => Weapon::from_label(other).map(ShopItem::Weapon),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShopOffer {
    pub item: ShopItem,
    pub price: u32,
}

const fn offer(item: ShopItem, price: u32) -> ShopOffer {
    ShopOffer { item, price }
}

const WORLD_ONE: [ShopOffer; 3] = [
    offer(ShopItem::Food, 10),
    offer(ShopItem::Shield, 25),
    offer(ShopItem::Weapon(Weapon::Bow), 60),
];

const WORLD_TWO: [ShopOffer; 4] = [
    offer(ShopItem::Food, 15),
    offer(ShopItem::Shield, 30),
    offer(ShopItem::Weapon(Weapon::Axe), 120),
    offer(ShopItem::BigJump, 150),
];

const WORLD_THREE: [ShopOffer; 4] = [
    offer(ShopItem::Food, 20),
    offer(ShopItem::Shield, 40),
    offer(ShopItem::Weapon(Weapon::Spellbook), 200),
    offer(ShopItem::BigJump, 150),
];

pub fn catalog(world: WorldId) -> &'static [ShopOffer] {
    match world {
        WorldId::One => &WORLD_ONE,
        WorldId::Two => &WORLD_TWO,
        WorldId::Three => &WORLD_THREE,
    }
}

/// The world's shopkeeper. Rebuilt on every world transition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shop {
    pub world: WorldId,
    pub position: Vec3,
}

pub fn buy(state: &mut GameState, item: ShopItem) -> Result<(), String> {
    let Some(shop) = state.world.shop else {
        return Err("no shop in this world".to_string());
    };
    let Some(offer) = catalog(shop.world).iter().find(|o| o.item == item) else {
        return Err(format!("{} is not sold here", item.label()));
    };
    let inv = &mut state.inventory;
    match item {
        ShopItem::Weapon(w) if inv.owns(w) => return Err(format!("{} already owned", w.label())),
        ShopItem::BigJump if inv.has_ability(Ability::BigJump) => {
            return Err("big jump already owned".to_string())
        }
        _ => {}
    }
    if inv.coins < offer.price {
        return Err(format!(
            "{} costs {} coins, have {}",
            item.label(),
            offer.price,
            inv.coins
        ));
    }
    inv.coins -= offer.price;
    match item {
        ShopItem::Food => inv.food += 1,
        ShopItem::Shield => inv.shields += 1,
        ShopItem::Weapon(w) => {
            inv.grant_weapon(w);
        }
        ShopItem::BigJump => {
            inv.grant_ability(Ability::BigJump);
        }
    }
    debug!("[Realmfall shop] Bought {} for {}", item.label(), offer.price);
    state.events.emit(
        "item_bought",
        serde_json::json!({ "item": item.label(), "price": offer.price, "coins_left": inv.coins }),
    );
    Ok(())
}
