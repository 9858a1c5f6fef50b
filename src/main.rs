#![cfg_attr(target_arch = "wasm32", allow(dead_code))]

mod actor;
mod ai;
mod boss;
mod combat;
mod components;
mod events;
#[cfg(not(target_arch = "wasm32"))]
mod file_watcher;
mod game_runtime;
mod input;
mod inventory;
mod player;
mod progression;
mod projectile;
mod scene;
mod shop;
mod simulation;
mod spawn;
mod state;
mod telemetry;
mod tuning;
mod ui;
mod world;

use bevy::prelude::*;
use components::HeadlessMode;
use state::GameState;

#[derive(serde::Deserialize, Default)]
struct StartupConfig {
    window_title: Option<String>,
    window_width: Option<f32>,
    window_height: Option<f32>,
    seed: Option<u64>,
}

fn load_startup_config() -> StartupConfig {
    let path = std::env::var("REALMFALL_GAME_CONFIG")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "game.json".to_string());
    match std::fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<StartupConfig>(&contents) {
            Ok(cfg) => {
                println!("[Realmfall] Loaded startup config from {}", path);
                cfg
            }
            Err(e) => {
                eprintln!("[Realmfall] Failed to parse {}: {}", path, e);
                StartupConfig::default()
            }
        },
        Err(_) => StartupConfig::default(),
    }
}

fn run_simulation_file(path: &str) -> Result<String, String> {
    let contents = std::fs::read_to_string(path).map_err(|e| format!("{path}: {e}"))?;
    let request: simulation::SimulationRequest =
        serde_json::from_str(&contents).map_err(|e| format!("{path}: {e}"))?;
    let result = simulation::run_simulation(&request)?;
    serde_json::to_string_pretty(&result).map_err(|e| e.to_string())
}

fn session_seed() -> u64 {
    #[cfg(not(target_arch = "wasm32"))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }
    #[cfg(target_arch = "wasm32")]
    {
        let mut bytes = [0u8; 8];
        let _ = getrandom::fill(&mut bytes);
        u64::from_le_bytes(bytes)
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let headless = args.iter().any(|a| a == "--headless");

    if let Some(pos) = args.iter().position(|a| a == "--simulate") {
        let Some(path) = args.get(pos + 1) else {
            eprintln!("[Realmfall] --simulate needs a request file");
            std::process::exit(2);
        };
        match run_simulation_file(path) {
            Ok(json) => {
                println!("{json}");
                return;
            }
            Err(e) => {
                eprintln!("[Realmfall] Simulation failed: {e}");
                std::process::exit(2);
            }
        }
    }

    let startup_config = load_startup_config();
    let mut app = App::new();

    app.insert_resource(HeadlessMode(headless));

    if headless {
        // No window or renderer; the fixed tick still runs
        app.add_plugins(MinimalPlugins);
        app.add_plugins(bevy::state::app::StatesPlugin);
        println!("[Realmfall] Starting in HEADLESS mode");
    } else {
        let window_title = startup_config
            .window_title
            .unwrap_or_else(|| "Realmfall".to_string());
        let window_width = startup_config.window_width.unwrap_or(1280.0);
        let window_height = startup_config.window_height.unwrap_or(720.0);

        app.add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: window_title,
                resolution: (window_width, window_height).into(),
                present_mode: bevy::window::PresentMode::AutoVsync,
                ..default()
            }),
            ..default()
        }));
        app.add_plugins(scene::ScenePlugin);
        println!("[Realmfall] Starting in WINDOWED mode");
    }

    let seed = startup_config.seed.unwrap_or_else(session_seed);
    let game = GameState::start(tuning::load_tuning(), seed);
    let sky = game.world.theme.sky;

    app.insert_resource(ClearColor(Color::srgb(sky[0], sky[1], sky[2])))
        .insert_resource(game)
        .insert_resource(Time::<Fixed>::from_hz(60.0))
        .add_plugins(input::InputPlugin)
        .add_plugins(game_runtime::RuntimeStatePlugin)
        .add_plugins(telemetry::TelemetryPlugin)
        .add_plugins(ui::UiPlugin);

    #[cfg(not(target_arch = "wasm32"))]
    app.add_plugins(file_watcher::FileWatcherPlugin);

    app.run();
}
