use bevy::prelude::*;
use crossbeam_channel::{Receiver, Sender};
use notify::{Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};

use crate::state::GameState;
use crate::tuning;

pub struct FileWatcherPlugin;

pub enum FileWatchEvent {
    TuningChanged(String),
}

#[derive(Resource)]
pub struct FileWatcherReceiver(pub Receiver<FileWatchEvent>);

impl Plugin for FileWatcherPlugin {
    fn build(&self, app: &mut App) {
        let (tx, rx) = crossbeam_channel::unbounded::<FileWatchEvent>();
        app.insert_resource(FileWatcherReceiver(rx));

        let path = PathBuf::from(tuning::tuning_path());
        std::thread::spawn(move || {
            run_watcher(tx, path);
        });

        app.add_systems(Update, process_file_watch_events.run_if(resource_exists::<GameState>));
    }
}

fn run_watcher(tx: Sender<FileWatchEvent>, tuning_path: PathBuf) {
    let watched = tuning_path.clone();
    let mut watcher: RecommendedWatcher =
        match notify::recommended_watcher(move |res: Result<NotifyEvent, notify::Error>| {
            if let Ok(event) = res {
                handle_fs_event(event, &tx, &watched);
            }
        }) {
            Ok(w) => w,
            Err(e) => {
                warn!("[Realmfall watcher] Failed to create watcher: {e}");
                return;
            }
        };

    // notify needs a directory for single files
    let parent = match tuning_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !parent.exists() {
        debug!("[Realmfall watcher] {} does not exist, hot reload off", parent.display());
        return;
    }
    if let Err(e) = watcher.watch(&parent, RecursiveMode::NonRecursive) {
        warn!("[Realmfall watcher] Failed to watch {}: {e}", parent.display());
        return;
    }
    info!("[Realmfall watcher] Watching tuning: {}", tuning_path.display());

    // The watcher is dropped when this thread exits
    loop {
        std::thread::sleep(std::time::Duration::from_secs(60));
    }
}

fn handle_fs_event(event: NotifyEvent, tx: &Sender<FileWatchEvent>, tuning_path: &Path) {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return;
    }
    for path in &event.paths {
        if path_matches(path, tuning_path) {
            if let Ok(content) = std::fs::read_to_string(path) {
                let _ = tx.send(FileWatchEvent::TuningChanged(content));
            }
        }
    }
}

fn path_matches(a: &Path, b: &Path) -> bool {
    let ca = std::fs::canonicalize(a).unwrap_or_else(|_| a.to_path_buf());
    let cb = std::fs::canonicalize(b).unwrap_or_else(|_| b.to_path_buf());
    ca == cb
}

/// Swap in new tuning. Values already baked into live actors (speeds, timers)
/// keep their old settings until those actors respawn.
pub fn apply_tuning_change(state: &mut GameState, content: &str) -> Result<(), String> {
    let tuning = tuning::parse_tuning(content)?;
    state.tuning = tuning;
    state.events.emit("tuning_reloaded", serde_json::json!({}));
    Ok(())
}

fn process_file_watch_events(watcher: Option<Res<FileWatcherReceiver>>, mut state: ResMut<GameState>) {
    let Some(watcher) = watcher else { return };

    for event in watcher.0.try_iter().take(16) {
        match event {
            FileWatchEvent::TuningChanged(content) => match apply_tuning_change(&mut state, &content) {
                Ok(()) => info!("[Realmfall watcher] Tuning reloaded"),
                Err(e) => warn!("[Realmfall watcher] Tuning parse error, keeping old values: {e}"),
            },
        }
    }
}
