use bevy::input::mouse::MouseMotion;
use bevy::input::InputSystem;
use bevy::prelude::*;
use bevy::window::{CursorGrabMode, PrimaryWindow};

use crate::components::{SpellKind, Weapon};
use crate::game_runtime::gameplay_systems_enabled;
use crate::shop::{self, ShopItem};
use crate::state::{GameState, Overlay};

const LOOK_SENSITIVITY: f32 = 0.0025;

/// One tick's worth of player intent. The windowed key map and the scripted
/// simulation both fill this in; the simulation core only ever reads it.
///
/// Axes are overwritten every frame. One-shot actions accumulate until the
/// next fixed tick consumes them, so a press between ticks is never lost.
#[derive(Resource, Clone, Debug, Default, PartialEq)]
pub struct PlayerInput {
    /// -1 back .. 1 forward.
    pub move_forward: f32,
    /// -1 left .. 1 right.
    pub move_right: f32,
    /// Radians: x turns (yaw), y looks up (pitch).
    pub look_delta: Vec2,
    pub jump: bool,
    pub primary: bool,
    pub dash: bool,
    pub cast: Option<SpellKind>,
    pub cycle_spell: bool,
    pub toggle_inventory: bool,
    pub toggle_shop: bool,
    pub close_overlay: bool,
    pub equip: Option<Weapon>,
    pub unequip: bool,
    pub equip_shield: bool,
    pub eat: bool,
    pub buy: Option<ShopItem>,
}

impl PlayerInput {
    pub fn clear_actions(&mut self) {
        *self = Self {
            move_forward: self.move_forward,
            move_right: self.move_right,
            ..Self::default()
        };
    }
}

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(PlayerInput::default())
            .add_systems(
                PreUpdate,
                (
                    keyboard_to_input.run_if(resource_exists::<ButtonInput<KeyCode>>),
                    mouse_to_input
                        .run_if(resource_exists::<ButtonInput<MouseButton>>)
                        .run_if(gameplay_systems_enabled),
                )
                    .chain()
                    .after(InputSystem),
            )
            .add_systems(
                Update,
                manage_cursor.run_if(resource_exists::<ButtonInput<MouseButton>>),
            );
    }
}

fn axis(keyboard: &ButtonInput<KeyCode>, positive: [KeyCode; 2], negative: [KeyCode; 2]) -> f32 {
    let mut value = 0.0;
    if keyboard.any_pressed(positive) {
        value += 1.0;
    }
    if keyboard.any_pressed(negative) {
        value -= 1.0;
    }
    value
}

fn keyboard_to_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    state: Option<Res<GameState>>,
    mut input: ResMut<PlayerInput>,
) {
    input.move_forward = axis(
        &keyboard,
        [KeyCode::KeyW, KeyCode::ArrowUp],
        [KeyCode::KeyS, KeyCode::ArrowDown],
    );
    input.move_right = axis(
        &keyboard,
        [KeyCode::KeyD, KeyCode::ArrowRight],
        [KeyCode::KeyA, KeyCode::ArrowLeft],
    );

    input.jump |= keyboard.just_pressed(KeyCode::Space);
    input.dash |= keyboard.just_pressed(KeyCode::KeyR);
    input.toggle_inventory |= keyboard.just_pressed(KeyCode::KeyI);
    input.toggle_shop |= keyboard.just_pressed(KeyCode::KeyE);
    input.cycle_spell |= keyboard.just_pressed(KeyCode::KeyQ);
    input.eat |= keyboard.just_pressed(KeyCode::KeyC);
    input.equip_shield |= keyboard.just_pressed(KeyCode::KeyX);
    if keyboard.just_pressed(KeyCode::KeyF) {
        input.cast = Some(SpellKind::Fireball);
    }
    if keyboard.just_pressed(KeyCode::KeyG) {
        input.cast = Some(SpellKind::Freezeball);
    }

    // Digits equip weapons, or buy catalog entries while the shop is open.
    let shop_world = state
        .as_deref()
        .filter(|s| s.overlay == Some(Overlay::Shop))
        .map(|s| s.world.current);
    let digits = [KeyCode::Digit1, KeyCode::Digit2, KeyCode::Digit3, KeyCode::Digit4];
    for (slot, key) in digits.into_iter().enumerate() {
        if !keyboard.just_pressed(key) {
            continue;
        }
        match shop_world {
            Some(world) => {
                if let Some(offer) = shop::catalog(world).get(slot) {
                    input.buy = Some(offer.item);
                }
            }
            None => input.equip = Some(Weapon::ALL[slot]),
        }
    }
}

fn mouse_to_input(
    buttons: Res<ButtonInput<MouseButton>>,
    mut motion: EventReader<MouseMotion>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut input: ResMut<PlayerInput>,
) {
    let locked = windows
        .get_single()
        .map(|w| w.cursor_options.grab_mode != CursorGrabMode::None)
        .unwrap_or(false);
    for ev in motion.read() {
        if locked {
            input.look_delta.x -= ev.delta.x * LOOK_SENSITIVITY;
            input.look_delta.y -= ev.delta.y * LOOK_SENSITIVITY;
        }
    }
    if locked {
        input.primary |= buttons.just_pressed(MouseButton::Left);
    }
}

/// Click locks the pointer; Escape closes an open overlay first, then releases it.
fn manage_cursor(
    buttons: Res<ButtonInput<MouseButton>>,
    keyboard: Option<Res<ButtonInput<KeyCode>>>,
    state: Option<Res<GameState>>,
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
    mut input: ResMut<PlayerInput>,
) {
    let Ok(mut window) = windows.get_single_mut() else {
        return;
    };
    let overlay_open = state.is_some_and(|s| s.overlay.is_some());
    if buttons.just_pressed(MouseButton::Left) && !overlay_open {
        window.cursor_options.grab_mode = CursorGrabMode::Locked;
        window.cursor_options.visible = false;
    }
    if keyboard.is_some_and(|k| k.just_pressed(KeyCode::Escape)) {
        if overlay_open {
            input.close_overlay = true;
        } else {
            window.cursor_options.grab_mode = CursorGrabMode::None;
            window.cursor_options.visible = true;
        }
    }
}
