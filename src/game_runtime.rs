use bevy::prelude::*;
use bevy::utils::Instant;
use serde::Serialize;

use crate::input::PlayerInput;
use crate::state::GameState;

#[derive(States, Default, Clone, Copy, Eq, PartialEq, Debug, Hash, Serialize)]
pub enum EngineFlowState {
    #[default]
    Playing,
    /// Inventory or shop overlay open.
    Paused,
    WorldTransition,
    GameOver,
    Victory,
}

impl EngineFlowState {
    pub fn from_game(state: &GameState) -> Self {
        if state.victory {
            Self::Victory
        } else if state.game_over {
            Self::GameOver
        } else if state.world.transition.is_some() {
            Self::WorldTransition
        } else if state.overlay.is_some() {
            Self::Paused
        } else {
            Self::Playing
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::GameOver | Self::Victory)
    }
}

#[derive(Resource, Clone)]
pub struct RuntimeState {
    pub state: EngineFlowState,
    entered_at: Instant,
    transitions: u64,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            state: EngineFlowState::Playing,
            entered_at: Instant::now(),
            transitions: 0,
        }
    }
}

#[derive(Serialize, Clone)]
pub struct RuntimeStateSnapshot {
    pub state: EngineFlowState,
    pub time_in_state_seconds: f32,
    pub transitions: u64,
}

impl RuntimeState {
    pub fn set_state(&mut self, to: EngineFlowState) {
        if self.state == to {
            return;
        }
        info!("[Realmfall runtime] {:?} -> {:?}", self.state, to);
        self.state = to;
        self.entered_at = Instant::now();
        self.transitions += 1;
    }

    pub fn snapshot(&self) -> RuntimeStateSnapshot {
        RuntimeStateSnapshot {
            state: self.state,
            time_in_state_seconds: self.entered_at.elapsed().as_secs_f32(),
            transitions: self.transitions,
        }
    }
}

/// True only while the session is live and unpaused.
pub fn gameplay_systems_enabled(state: Option<Res<State<EngineFlowState>>>) -> bool {
    state.is_some_and(|s| *s.get() == EngineFlowState::Playing)
}

fn session_live(runtime: Option<Res<RuntimeState>>) -> bool {
    runtime.map_or(true, |r| !r.state.is_terminal())
}

/// One fixed step of the simulation. Overlays and transitions are handled inside
/// `GameState::tick`, so this runs in every non-terminal flow state.
pub fn tick_game(time: Res<Time>, mut state: ResMut<GameState>, mut input: ResMut<PlayerInput>) {
    state.tick(&input, time.delta_secs());
    input.clear_actions();
}

fn sync_flow_state(
    game: Res<GameState>,
    mut runtime: ResMut<RuntimeState>,
    state: Res<State<EngineFlowState>>,
    mut next_state: ResMut<NextState<EngineFlowState>>,
) {
    let desired = EngineFlowState::from_game(&game);
    runtime.set_state(desired);
    if state.get() != &desired {
        next_state.set(desired);
    }
}

pub struct RuntimeStatePlugin;

impl Plugin for RuntimeStatePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(RuntimeState::default())
            .init_state::<EngineFlowState>()
            .add_systems(
                FixedUpdate,
                tick_game
                    .run_if(resource_exists::<GameState>)
                    .run_if(session_live),
            )
            .add_systems(Update, sync_flow_state.run_if(resource_exists::<GameState>));
    }
}
