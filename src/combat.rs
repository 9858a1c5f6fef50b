use bevy::prelude::*;
use rand::Rng;

use crate::actor::{Attackable, TargetRef};
use crate::components::{Countdown, ProjectileKind, Weapon};
use crate::player::Swing;
use crate::projectile::Projectile;
use crate::state::GameState;
use crate::tuning::WeaponTuning;
use crate::world::WorldId;
use crate::{progression, world};

/// Reach, cone and damage of one melee weapon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeleeProfile {
    pub weapon: Weapon,
    pub range: f32,
    pub cone_degrees: f32,
    pub cooldown: f32,
    pub base_damage: i32,
}

impl MeleeProfile {
    pub fn for_weapon(weapon: Weapon, player_damage: i32, tuning: &WeaponTuning) -> Option<Self> {
        let (range, cooldown, base_damage) = match weapon {
            Weapon::Sword => (tuning.sword_range, tuning.sword_cooldown, player_damage),
            Weapon::Axe => (
                tuning.axe_range,
                tuning.axe_cooldown,
                player_damage * tuning.axe_damage_multiplier,
            ),
            Weapon::Bow | Weapon::Spellbook => return None,
        };
        Some(Self {
            weapon,
            range,
            cone_degrees: tuning.cone_degrees,
            cooldown,
            base_damage,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeleeHit {
    pub target: TargetRef,
    pub damage: i32,
    pub critical: bool,
    pub killed: bool,
}

pub fn roll_critical(rng: &mut impl Rng, chance: f32) -> bool {
    rng.gen_bool(f64::from(chance.clamp(0.0, 1.0)))
}

pub fn critical_damage(base: i32, critical: bool, multiplier: i32) -> i32 {
    if critical {
        base * multiplier
    } else {
        base
    }
}

/// True when the target's body sphere is within `range` of the eye and
/// overlaps the cone around `forward`.
pub fn in_melee_cone(eye: Vec3, forward: Vec3, target: Vec3, body_radius: f32, profile: &MeleeProfile) -> bool {
    let to_target = target - eye;
    let distance = to_target.length();
    if distance - body_radius > profile.range {
        return false;
    }
    if distance <= body_radius.max(f32::EPSILON) {
        return true;
    }
    // Angular half-size of the body as seen from the eye
    let spread = (body_radius / distance).asin();
    (forward.angle_between(to_target) - spread).to_degrees() < profile.cone_degrees
}

/// First candidate, in registry order, that the swing connects with.
pub fn select_melee_target<'a>(
    eye: Vec3,
    forward: Vec3,
    profile: &MeleeProfile,
    candidates: impl Iterator<Item = (TargetRef, &'a dyn Attackable)>,
    reach_of: impl Fn(&dyn Attackable) -> f32,
) -> Option<TargetRef> {
    candidates
        .filter(|(_, actor)| !actor.body().is_dead())
        .find(|(_, actor)| in_melee_cone(eye, forward, actor.body().position, reach_of(*actor), profile))
        .map(|(target, _)| target)
}

/// Swing the equipped sword or axe. Does nothing during the weapon cooldown
/// or when no melee weapon is equipped.
pub fn resolve_melee_attack(state: &mut GameState) -> Option<MeleeHit> {
    let weapon = state.inventory.equipped.filter(|w| w.is_melee())?;
    if state.player.attack_cooldown.is_some() {
        return None;
    }
    let profile = MeleeProfile::for_weapon(weapon, state.progression.damage, &state.tuning.weapons)?;
    state.player.attack_cooldown = Some(Countdown::new(profile.cooldown));
    state.player.swing = Some(Swing {
        weapon,
        timer: Countdown::new(state.tuning.weapons.swing_seconds),
    });

    let eye = state.player.eye();
    let forward = state.player.forward();
    let tuning = &state.tuning;
    let target = select_melee_target(eye, forward, &profile, state.targets(), |a| a.reach_radius(tuning))?;

    let critical = roll_critical(&mut state.rng, state.tuning.weapons.crit_chance);
    let damage = critical_damage(profile.base_damage, critical, state.tuning.weapons.crit_multiplier);
    let killed = damage_target(state, target, damage, weapon.label(), critical);
    Some(MeleeHit {
        target,
        damage,
        critical,
        killed,
    })
}

/// First live target whose hit sphere contains the projectile.
pub fn find_projectile_target(state: &GameState, projectile: &Projectile) -> Option<TargetRef> {
    let tuning = &state.tuning.projectiles;
    state
        .targets()
        .filter(|(_, actor)| !actor.body().is_dead())
        .find(|(_, actor)| {
            actor.body().position.distance(projectile.position) <= actor.projectile_hit_radius(tuning)
        })
        .map(|(target, _)| target)
}

pub fn resolve_projectile_hit(state: &mut GameState, kind: ProjectileKind, target: TargetRef) -> bool {
    let tuning = state.tuning.projectiles.clone();
    let Some(actor) = state.attackable_mut(target) else {
        return false;
    };
    let damage = actor.projectile_damage(kind, &tuning);
    if kind == ProjectileKind::Freezeball {
        actor.freeze(&tuning);
    }
    let label = match kind {
        ProjectileKind::Arrow => "arrow",
        ProjectileKind::Fireball => "fireball",
        ProjectileKind::Freezeball => "freezeball",
    };
    damage_target(state, target, damage, label, false)
}

/// Apply damage to a registry target and run the kill path when it dies.
fn damage_target(state: &mut GameState, target: TargetRef, damage: i32, source: &str, critical: bool) -> bool {
    let flash = state.tuning.weapons.flash_seconds;
    let Some(actor) = state.attackable_mut(target) else {
        return false;
    };
    let killed = actor.apply_hit(damage, flash);
    let body = actor.body();
    let (id, hp, boss) = (body.id, body.hp, actor.is_boss());
    state.events.emit(
        "damage_dealt",
        serde_json::json!({
            "target": id,
            "boss": boss,
            "amount": damage,
            "critical": critical,
            "source": source,
            "hp": hp,
        }),
    );
    if killed {
        kill(state, target);
    }
    killed
}

/// Remove a dead actor and pay out its rewards. Runs at most once per actor
/// because the actor leaves the registry here.
pub fn kill(state: &mut GameState, target: TargetRef) {
    match target {
        TargetRef::Enemy(i) => {
            if i >= state.enemies.len() {
                return;
            }
            let enemy = state.enemies.remove(i);
            let (xp, coins) = (state.tuning.enemies.experience, state.tuning.enemies.coins);
            state.inventory.coins = state.inventory.coins.saturating_add(coins);
            state.events.emit(
                "enemy_killed",
                serde_json::json!({ "id": enemy.body.id, "kind": enemy.kind.label(), "experience": xp }),
            );
            progression::award_experience(state, xp);
        }
        TargetRef::Boss => {
            let Some(boss) = state.boss.take() else {
                return;
            };
            let (xp, coins) = (state.tuning.boss.experience, state.tuning.boss.coins);
            state.inventory.coins = state.inventory.coins.saturating_add(coins);
            info!("[Realmfall combat] Boss defeated in world {}", state.world.current.index());
            state.events.emit(
                "boss_killed",
                serde_json::json!({ "id": boss.body.id, "world": state.world.current.index(), "experience": xp }),
            );
            progression::award_experience(state, xp);
            if state.world.current == WorldId::Three {
                state.victory = true;
                state.events.emit("victory", serde_json::json!({ "level": state.progression.level }));
            } else {
                world::schedule_portal(state, boss.body.position);
            }
        }
    }
}
