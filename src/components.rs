use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Set when the app runs without a window (no scene, no cursor, no input devices).
#[derive(Resource, Clone, Copy, Default)]
pub struct HeadlessMode(pub bool);

/// Timed state advanced by the tick: `elapsed += dt` until `duration` is reached.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Countdown {
    pub elapsed: f32,
    pub duration: f32,
}

impl Countdown {
    pub fn new(duration: f32) -> Self {
        Self {
            elapsed: 0.0,
            duration: duration.max(0.0),
        }
    }

    /// Advance and report whether the countdown has run out.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.elapsed += dt.max(0.0);
        self.finished()
    }

    pub fn finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }
}

/// Advance an optional countdown and clear it once it expires.
/// Returns true on the tick the countdown is cleared.
pub fn tick_slot(slot: &mut Option<Countdown>, dt: f32) -> bool {
    let expired = slot.as_mut().is_some_and(|c| c.tick(dt));
    if expired {
        *slot = None;
    }
    expired
}

/// Static obstacle box. Collision only looks at the XZ footprint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Box standing on the ground, centred on (x, z).
    pub fn ground_box(x: f32, z: f32, half_x: f32, half_z: f32, height: f32) -> Self {
        Self {
            min: Vec3::new(x - half_x, 0.0, z - half_z),
            max: Vec3::new(x + half_x, height, z + half_z),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Overlap between this box and a square footprint of `half_extent` around `center`.
    pub fn overlaps_footprint(&self, center: Vec3, half_extent: f32) -> bool {
        center.x + half_extent > self.min.x
            && center.x - half_extent < self.max.x
            && center.z + half_extent > self.min.z
            && center.z - half_extent < self.max.z
    }
}

pub fn collides_with_any(obstacles: &[Aabb], center: Vec3, half_extent: f32) -> bool {
    obstacles
        .iter()
        .any(|o| o.overlaps_footprint(center, half_extent))
}

/// Flatten to the ground plane.
pub fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Yaw that makes a forward vector of `(-sin yaw, 0, -cos yaw)` point along `dir`.
pub fn yaw_towards(dir: Vec3) -> f32 {
    (-dir.x).atan2(-dir.z)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weapon {
    Sword,
    Bow,
    Axe,
    Spellbook,
}

impl Weapon {
    pub const ALL: [Weapon; 4] = [Weapon::Sword, Weapon::Bow, Weapon::Axe, Weapon::Spellbook];

    pub fn label(self) -> &'static str {
        match self {
            Weapon::Sword => "sword",
            Weapon::Bow => "bow",
            Weapon::Axe => "axe",
            Weapon::Spellbook => "spellbook",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.label() == label)
    }

    pub fn is_melee(self) -> bool {
        matches!(self, Weapon::Sword | Weapon::Axe)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellKind {
    #[default]
    Fireball,
    Freezeball,
}

impl SpellKind {
    pub fn next(self) -> Self {
        match self {
            SpellKind::Fireball => SpellKind::Freezeball,
            SpellKind::Freezeball => SpellKind::Fireball,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ability {
    BigJump,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileKind {
    Arrow,
    Fireball,
    Freezeball,
}

impl From<SpellKind> for ProjectileKind {
    fn from(spell: SpellKind) -> Self {
        match spell {
            SpellKind::Fireball => ProjectileKind::Fireball,
            SpellKind::Freezeball => ProjectileKind::Freezeball,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PickupKind {
    Food,
    Shield,
    Weapon(Weapon),
    Coins(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_clears_slot_on_expiry() {
        let mut slot = Some(Countdown::new(1.0));
        assert!(!tick_slot(&mut slot, 0.5));
        assert!(slot.is_some());
        assert!(tick_slot(&mut slot, 0.5));
        assert!(slot.is_none());
        assert!(!tick_slot(&mut slot, 0.5));
    }

    #[test]
    fn footprint_overlap_ignores_height() {
        let rock = Aabb::ground_box(0.0, 0.0, 1.0, 1.0, 2.0);
        assert!(rock.overlaps_footprint(Vec3::new(1.2, 50.0, 0.0), 0.5));
        assert!(!rock.overlaps_footprint(Vec3::new(1.6, 0.0, 0.0), 0.5));
    }

    #[test]
    fn yaw_towards_matches_forward_convention() {
        let yaw = yaw_towards(Vec3::new(-1.0, 0.0, 0.0));
        let forward = Vec3::new(-yaw.sin(), 0.0, -yaw.cos());
        assert!((forward - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5);
    }
}
