use bevy::math::Vec3;

use crate::components::{horizontal, tick_slot, yaw_towards, Aabb, Countdown, ProjectileKind};
use crate::tuning::{GameTuning, ProjectileTuning};

/// State shared by every hostile actor: the body the renderer draws and the
/// timed statuses the tick advances.
#[derive(Clone, Debug)]
pub struct ActorBody {
    pub id: u32,
    pub position: Vec3,
    pub yaw: f32,
    pub hp: i32,
    pub max_hp: i32,
    pub speed: f32,
    pub base_height: f32,
    pub bob_phase: f32,
    /// Set after touching the player; blocks further contact damage until it expires.
    pub contact_cooldown: Option<Countdown>,
    /// Hit flash shown by the renderer.
    pub flash: Option<Countdown>,
    pub frozen: Option<Countdown>,
}

impl ActorBody {
    pub fn new(id: u32, ground: Vec3, hp: i32, speed: f32, base_height: f32) -> Self {
        Self {
            id,
            position: Vec3::new(ground.x, base_height, ground.z),
            yaw: 0.0,
            hp,
            max_hp: hp,
            speed,
            base_height,
            bob_phase: (id as f32 * 1.7) % std::f32::consts::TAU,
            contact_cooldown: None,
            flash: None,
            frozen: None,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    pub fn is_dead(&self) -> bool {
        self.hp <= 0
    }

    /// Yaw-only facing.
    pub fn face(&mut self, target: Vec3) {
        let dir = horizontal(target - self.position);
        if dir.length_squared() > 1e-6 {
            self.yaw = yaw_towards(dir);
        }
    }

    pub fn bob(&mut self, elapsed: f32, frequency: f32, amplitude: f32) {
        self.position.y = self.base_height + (elapsed * frequency + self.bob_phase).sin() * amplitude;
    }

    pub fn horizontal_distance_to(&self, point: Vec3) -> f32 {
        horizontal(point - self.position).length()
    }

    pub fn take_damage(&mut self, amount: i32) -> bool {
        self.hp = (self.hp - amount.max(0)).max(0);
        self.is_dead()
    }

    pub fn tick_statuses(&mut self, dt: f32) {
        tick_slot(&mut self.contact_cooldown, dt);
        tick_slot(&mut self.flash, dt);
        tick_slot(&mut self.frozen, dt);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnemyKind {
    Melee,
    Ranged,
}

impl EnemyKind {
    pub fn label(self) -> &'static str {
        match self {
            EnemyKind::Melee => "melee",
            EnemyKind::Ranged => "ranged",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub body: ActorBody,
    pub kind: EnemyKind,
    pub shoot_timer: Countdown,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BossPhase {
    Approaching,
    Jumping { vertical_velocity: f32, launch_height: f32 },
    Stunned(Countdown),
}

impl BossPhase {
    pub fn label(&self) -> &'static str {
        match self {
            BossPhase::Approaching => "approaching",
            BossPhase::Jumping { .. } => "jumping",
            BossPhase::Stunned(_) => "stunned",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Boss {
    pub body: ActorBody,
    pub phase: BossPhase,
    pub jump_timer: Countdown,
    pub ranged_timer: Countdown,
}

/// Identifies a hit target by registry slot. Slots are only valid within the tick that produced them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetRef {
    Enemy(usize),
    Boss,
}

/// Anything the player can damage.
pub trait Attackable {
    fn body(&self) -> &ActorBody;
    fn body_mut(&mut self) -> &mut ActorBody;
    fn is_boss(&self) -> bool;
    /// Body radius added to melee reach.
    fn reach_radius(&self, tuning: &GameTuning) -> f32;
    fn projectile_hit_radius(&self, tuning: &ProjectileTuning) -> f32;
    fn projectile_damage(&self, kind: ProjectileKind, tuning: &ProjectileTuning) -> i32;
    fn freeze_seconds(&self, tuning: &ProjectileTuning) -> f32;

    /// Apply damage and start the hit flash. Returns true when the hit is lethal.
    fn apply_hit(&mut self, damage: i32, flash_seconds: f32) -> bool {
        let body = self.body_mut();
        body.flash = Some(Countdown::new(flash_seconds));
        body.take_damage(damage)
    }

    fn freeze(&mut self, tuning: &ProjectileTuning) {
        let seconds = self.freeze_seconds(tuning);
        self.body_mut().frozen = Some(Countdown::new(seconds));
    }
}

impl Attackable for Enemy {
    fn body(&self) -> &ActorBody {
        &self.body
    }

    fn body_mut(&mut self) -> &mut ActorBody {
        &mut self.body
    }

    fn is_boss(&self) -> bool {
        false
    }

    fn reach_radius(&self, tuning: &GameTuning) -> f32 {
        tuning.enemies.body_radius
    }

    fn projectile_hit_radius(&self, tuning: &ProjectileTuning) -> f32 {
        tuning.enemy_hit_radius
    }

    fn projectile_damage(&self, kind: ProjectileKind, tuning: &ProjectileTuning) -> i32 {
        match kind {
            ProjectileKind::Arrow => tuning.arrow_damage,
            ProjectileKind::Fireball => tuning.fireball_damage,
            ProjectileKind::Freezeball => tuning.freezeball_damage,
        }
    }

    fn freeze_seconds(&self, tuning: &ProjectileTuning) -> f32 {
        tuning.freeze_enemy_seconds
    }
}

impl Attackable for Boss {
    fn body(&self) -> &ActorBody {
        &self.body
    }

    fn body_mut(&mut self) -> &mut ActorBody {
        &mut self.body
    }

    fn is_boss(&self) -> bool {
        true
    }

    fn reach_radius(&self, tuning: &GameTuning) -> f32 {
        tuning.boss.body_radius
    }

    fn projectile_hit_radius(&self, tuning: &ProjectileTuning) -> f32 {
        tuning.boss_hit_radius
    }

    fn projectile_damage(&self, kind: ProjectileKind, tuning: &ProjectileTuning) -> i32 {
        match kind {
            ProjectileKind::Arrow => tuning.arrow_damage,
            ProjectileKind::Fireball => tuning.fireball_boss_damage,
            ProjectileKind::Freezeball => tuning.freezeball_boss_damage,
        }
    }

    fn freeze_seconds(&self, tuning: &ProjectileTuning) -> f32 {
        tuning.freeze_boss_seconds
    }
}

/// What a steering actor sees of the world for one tick.
pub struct SteerContext<'a> {
    pub player: Vec3,
    pub obstacles: &'a [Aabb],
    pub tuning: &'a GameTuning,
    pub elapsed: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SteerOutcome {
    /// Point the actor fired a projectile at this tick.
    pub fire_at: Option<Vec3>,
    /// Set on the tick a jumping actor touches down.
    pub landed: bool,
}

/// Per-tick movement behaviour.
pub trait Steerable {
    fn steer(&mut self, ctx: &SteerContext<'_>, dt: f32) -> SteerOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enemy(hp: i32) -> Enemy {
        Enemy {
            body: ActorBody::new(1, Vec3::ZERO, hp, 3.0, 1.0),
            kind: EnemyKind::Melee,
            shoot_timer: Countdown::new(2.0),
        }
    }

    #[test]
    fn hp_never_drops_below_zero() {
        let mut e = enemy(5);
        let mut lethal_hits = 0;
        for _ in 0..7 {
            if e.apply_hit(1, 0.2) {
                lethal_hits += 1;
            }
        }
        assert_eq!(e.body.hp, 0);
        assert!(lethal_hits >= 1);
        assert!(e.body.flash.is_some());
    }

    #[test]
    fn boss_damage_table_differs_from_enemy() {
        let t = ProjectileTuning::default();
        let e = enemy(5);
        let boss = Boss {
            body: ActorBody::new(2, Vec3::ZERO, 100, 1.5, 3.0),
            phase: BossPhase::Approaching,
            jump_timer: Countdown::new(8.0),
            ranged_timer: Countdown::new(3.0),
        };
        assert_eq!(e.projectile_damage(ProjectileKind::Fireball, &t), 3);
        assert_eq!(boss.projectile_damage(ProjectileKind::Fireball, &t), 5);
        assert_eq!(e.projectile_damage(ProjectileKind::Freezeball, &t), 2);
        assert_eq!(boss.projectile_damage(ProjectileKind::Freezeball, &t), 3);
        assert_eq!(boss.projectile_damage(ProjectileKind::Arrow, &t), 1);
        assert_eq!(e.projectile_hit_radius(&t), 1.5);
        assert_eq!(boss.projectile_hit_radius(&t), 4.0);
    }

    #[test]
    fn freeze_expires_with_status_tick() {
        let t = ProjectileTuning::default();
        let mut e = enemy(5);
        e.freeze(&t);
        assert!(e.body.is_frozen());
        e.body.tick_statuses(2.0);
        assert!(e.body.is_frozen());
        e.body.tick_statuses(1.0);
        assert!(!e.body.is_frozen());
    }
}
