use std::f32::consts::FRAC_PI_2;

use bevy::gizmos::config::GizmoConfigStore;
use bevy::pbr::{DistanceFog, FogFalloff};
use bevy::prelude::*;

use crate::actor::BossPhase;
use crate::components::{HeadlessMode, PickupKind, ProjectileKind, Weapon};
use crate::player::Player;
use crate::state::GameState;
use crate::world::WorldTheme;

/// Weapon proxy rest pose, relative to the camera.
const PROXY_OFFSET: Vec3 = Vec3::new(0.35, -0.3, -0.6);
/// Downward sweep of a full melee swing, radians.
const SWING_ARC: f32 = 1.2;

#[derive(Component)]
pub struct MainCamera;

/// First-person model of whatever the inventory has attached.
#[derive(Component, Default)]
pub struct WeaponProxy {
    pub weapon: Option<Weapon>,
}

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_camera)
            .add_systems(
                Update,
                (sync_camera, sync_weapon_proxy, sync_theme)
                    .chain()
                    .run_if(resource_exists::<GameState>),
            )
            .add_systems(
                Update,
                draw_world
                    .after(sync_weapon_proxy)
                    .run_if(resource_exists::<GameState>)
                    .run_if(resource_exists::<GizmoConfigStore>),
            );
    }
}

fn rgb(c: [f32; 3]) -> Color {
    Color::srgb(c[0], c[1], c[2])
}

fn fog_for(theme: &WorldTheme) -> DistanceFog {
    DistanceFog {
        color: rgb(theme.fog),
        falloff: FogFalloff::Linear {
            start: theme.fog_start,
            end: theme.fog_end,
        },
        ..default()
    }
}

pub fn camera_transform(player: &Player) -> Transform {
    Transform::from_translation(player.eye())
        .with_rotation(Quat::from_euler(EulerRot::YXZ, player.yaw, player.pitch, 0.0))
}

/// Proxy pose for the current swing progress (0 = rest).
pub fn proxy_transform(swing_progress: f32) -> Transform {
    let t = swing_progress.clamp(0.0, 1.0);
    // Down and back up over one swing
    let angle = -SWING_ARC * (t * std::f32::consts::PI).sin();
    Transform::from_translation(PROXY_OFFSET).with_rotation(Quat::from_rotation_x(angle))
}

fn spawn_camera(mut commands: Commands, headless: Res<HeadlessMode>, state: Option<Res<GameState>>) {
    if headless.0 {
        return;
    }
    let (transform, fog) = match state.as_deref() {
        Some(s) => (camera_transform(&s.player), fog_for(&s.world.theme)),
        None => (Transform::default(), DistanceFog::default()),
    };
    commands
        .spawn((MainCamera, Camera3d::default(), transform, fog))
        .with_children(|parent| {
            parent.spawn((WeaponProxy::default(), proxy_transform(0.0)));
        });
    commands.spawn((
        DirectionalLight {
            illuminance: 8_000.0,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(EulerRot::XYZ, -0.9, 0.4, 0.0)),
    ));
}

fn sync_camera(state: Res<GameState>, mut camera: Query<&mut Transform, With<MainCamera>>) {
    let Ok(mut transform) = camera.get_single_mut() else {
        return;
    };
    *transform = camera_transform(&state.player);
}

fn sync_weapon_proxy(state: Res<GameState>, mut proxies: Query<(&mut WeaponProxy, &mut Transform)>) {
    let swing = state.player.swing.as_ref().map_or(0.0, |s| s.timer.progress());
    for (mut proxy, mut transform) in &mut proxies {
        if proxy.weapon != state.inventory.proxy {
            proxy.weapon = state.inventory.proxy;
        }
        *transform = proxy_transform(swing);
    }
}

fn sync_theme(
    state: Res<GameState>,
    mut clear: ResMut<ClearColor>,
    mut fog: Query<&mut DistanceFog, With<MainCamera>>,
) {
    if !state.is_changed() {
        return;
    }
    let theme = &state.world.theme;
    let sky = rgb(theme.sky);
    if clear.0 != sky {
        clear.0 = sky;
        for mut f in &mut fog {
            *f = fog_for(theme);
        }
    }
}

fn flat_circle(gizmos: &mut Gizmos, center: Vec3, radius: f32, color: Color) {
    gizmos.circle(Isometry3d::new(center, Quat::from_rotation_x(FRAC_PI_2)), radius, color);
}

fn draw_world(state: Res<GameState>, proxies: Query<(&WeaponProxy, &GlobalTransform)>, mut gizmos: Gizmos) {
    let theme = &state.world.theme;
    let half = state.tuning.world.arena_half_size;
    gizmos.rect(
        Isometry3d::new(Vec3::ZERO, Quat::from_rotation_x(FRAC_PI_2)),
        Vec2::splat(half * 2.0),
        rgb(theme.ground),
    );

    for aabb in &state.world.obstacles {
        gizmos.cuboid(
            Transform::from_translation(aabb.center()).with_scale(aabb.size()),
            rgb(theme.obstacle),
        );
    }

    let enemy_radius = state.tuning.enemies.body_radius;
    for enemy in &state.enemies {
        let color = if enemy.body.is_frozen() {
            Color::srgb(0.5, 0.8, 1.0)
        } else if enemy.body.flash.is_some() {
            Color::WHITE
        } else {
            Color::srgb(0.9, 0.2, 0.2)
        };
        gizmos.sphere(Isometry3d::from_translation(enemy.body.position), enemy_radius, color);
    }

    if let Some(boss) = &state.boss {
        let color = match boss.phase {
            BossPhase::Stunned(_) => Color::srgb(1.0, 1.0, 0.3),
            _ if boss.body.is_frozen() => Color::srgb(0.5, 0.8, 1.0),
            _ => Color::srgb(0.6, 0.1, 0.6),
        };
        gizmos.sphere(
            Isometry3d::from_translation(boss.body.position),
            state.tuning.boss.body_radius,
            color,
        );
    }

    for shot in &state.projectiles {
        let color = match shot.kind {
            ProjectileKind::Arrow => Color::srgb(0.8, 0.7, 0.5),
            ProjectileKind::Fireball => Color::srgb(1.0, 0.4, 0.1),
            ProjectileKind::Freezeball => Color::srgb(0.4, 0.8, 1.0),
        };
        let tail = shot.position - shot.velocity.normalize_or_zero() * 0.5;
        gizmos.line(tail, shot.position, color);
    }
    for shot in &state.hostile_projectiles {
        gizmos.sphere(Isometry3d::from_translation(shot.position), 0.2, Color::srgb(0.9, 0.1, 0.1));
    }

    for pickup in &state.pickups {
        let color = match pickup.kind {
            PickupKind::Food => Color::srgb(0.3, 0.9, 0.3),
            PickupKind::Shield => Color::srgb(0.3, 0.5, 1.0),
            PickupKind::Weapon(_) => Color::srgb(0.9, 0.9, 0.9),
            PickupKind::Coins(_) => Color::srgb(1.0, 0.85, 0.1),
        };
        gizmos.cuboid(
            Transform::from_translation(pickup.position + Vec3::Y * 0.3).with_scale(Vec3::splat(0.4)),
            color,
        );
    }

    for wave in &state.shockwaves {
        flat_circle(&mut gizmos, wave.origin + Vec3::Y * 0.1, wave.radius, Color::srgb(1.0, 0.6, 0.2));
    }
    if let Some(portal) = state.world.portal {
        flat_circle(
            &mut gizmos,
            portal.position + Vec3::Y * 0.1,
            state.tuning.world.portal_radius,
            Color::srgb(0.5, 0.2, 1.0),
        );
    }
    if let Some(shop) = state.world.shop {
        gizmos.cuboid(
            Transform::from_translation(shop.position + Vec3::Y).with_scale(Vec3::new(2.0, 2.0, 1.0)),
            Color::srgb(0.8, 0.6, 0.3),
        );
    }

    for (proxy, transform) in &proxies {
        let Some(weapon) = proxy.weapon else { continue };
        let (length, color) = match weapon {
            Weapon::Sword => (0.7, Color::srgb(0.8, 0.8, 0.9)),
            Weapon::Bow => (0.5, Color::srgb(0.6, 0.4, 0.2)),
            Weapon::Axe => (0.6, Color::srgb(0.5, 0.5, 0.5)),
            Weapon::Spellbook => (0.25, Color::srgb(0.5, 0.2, 0.7)),
        };
        let base = transform.translation();
        let tip = base + transform.up() * length;
        gizmos.line(base, tip, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::PlayerTuning;

    #[test]
    fn camera_looks_where_the_player_does() {
        let mut player = Player::new(&PlayerTuning::default());
        player.yaw = 0.7;
        player.pitch = -0.2;
        let transform = camera_transform(&player);
        assert!((transform.forward().as_vec3() - player.forward()).length() < 1e-4);
        assert_eq!(transform.translation, player.eye());
    }

    #[test]
    fn proxy_returns_to_rest_after_a_swing() {
        let rest = proxy_transform(0.0);
        let mid = proxy_transform(0.5);
        let done = proxy_transform(1.0);
        assert_eq!(rest.translation, PROXY_OFFSET);
        assert!(mid.rotation.angle_between(rest.rotation) > 1.0);
        assert!(done.rotation.angle_between(rest.rotation) < 1e-4);
    }
}
