use bevy::prelude::*;
use serde::Serialize;

use crate::player::Player;
use crate::state::GameState;
use crate::tuning::{GameTuning, ProgressionTuning};

/// Level, experience and the damage stat derived from them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Progression {
    pub level: u32,
    pub experience: u32,
    pub damage: i32,
    /// Experience needed to leave the current level; `u32::MAX` at max level.
    pub threshold: u32,
}

impl Progression {
    pub fn new(tuning: &GameTuning) -> Self {
        Self {
            level: 1,
            experience: 0,
            damage: tuning.player.base_damage,
            threshold: threshold_for(1, &tuning.progression),
        }
    }

    pub fn is_max_level(&self, tuning: &ProgressionTuning) -> bool {
        self.level >= tuning.max_level
    }
}

/// Thresholds come from a fixed table; levels past the table (or at max) never level up.
pub fn threshold_for(level: u32, tuning: &ProgressionTuning) -> u32 {
    if level >= tuning.max_level {
        return u32::MAX;
    }
    level
        .checked_sub(1)
        .and_then(|i| tuning.thresholds.get(i as usize))
        .copied()
        .unwrap_or(u32::MAX)
}

/// Apply every level-up the current experience pays for, carrying the remainder.
/// Returns the number of levels gained.
pub fn check_level_up(progression: &mut Progression, player: &mut Player, tuning: &ProgressionTuning) -> u32 {
    let mut gained = 0;
    while !progression.is_max_level(tuning) && progression.experience >= progression.threshold {
        progression.experience -= progression.threshold;
        progression.level += 1;
        progression.damage += tuning.damage_per_level;
        player.max_hp += tuning.hp_per_level;
        player.hp = player.max_hp;
        progression.threshold = threshold_for(progression.level, tuning);
        gained += 1;
    }
    gained
}

pub fn award_experience(state: &mut GameState, amount: u32) {
    state.progression.experience = state.progression.experience.saturating_add(amount);
    let gained = check_level_up(
        &mut state.progression,
        &mut state.player,
        &state.tuning.progression,
    );
    if gained == 0 {
        return;
    }
    let p = &state.progression;
    info!("[Realmfall progression] Reached level {}", p.level);
    state.events.emit(
        "level_up",
        serde_json::json!({
            "level": p.level,
            "levels_gained": gained,
            "damage": p.damage,
            "max_hp": state.player.max_hp,
            "experience": p.experience,
            "threshold": p.threshold,
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> (Progression, Player, ProgressionTuning) {
        let tuning = GameTuning::default();
        (
            Progression::new(&tuning),
            Player::new(&tuning.player),
            tuning.progression.clone(),
        )
    }

    #[test]
    fn five_hundred_experience_is_exactly_one_level() {
        let (mut prog, mut player, t) = fresh();
        player.hp = 7;
        for _ in 0..5 {
            prog.experience += 100;
            check_level_up(&mut prog, &mut player, &t);
        }
        assert_eq!(prog.level, 2);
        assert_eq!(prog.damage, 2);
        assert_eq!(prog.experience, 0);
        assert_eq!(prog.threshold, 1000);
        assert_eq!(player.max_hp, 25);
        assert_eq!(player.hp, 25);
    }

    #[test]
    fn remainder_carries_and_can_chain_levels() {
        let (mut prog, mut player, t) = fresh();
        prog.experience = 1700;
        let gained = check_level_up(&mut prog, &mut player, &t);
        assert_eq!(gained, 2);
        assert_eq!(prog.level, 3);
        assert_eq!(prog.experience, 200);
        assert_eq!(prog.threshold, 3000);
        assert_eq!(player.max_hp, 30);
    }

    #[test]
    fn max_level_freezes_progression() {
        let (mut prog, mut player, t) = fresh();
        prog.experience = u32::MAX / 2;
        check_level_up(&mut prog, &mut player, &t);
        assert_eq!(prog.level, t.max_level);
        assert_eq!(prog.threshold, u32::MAX);
        let xp = prog.experience;
        prog.experience += 1_000_000;
        assert_eq!(check_level_up(&mut prog, &mut player, &t), 0);
        assert_eq!(prog.level, t.max_level);
        assert_eq!(prog.experience, xp + 1_000_000);
    }

    #[test]
    fn award_emits_level_up_event() {
        let mut state = GameState::new(GameTuning::default(), 1);
        award_experience(&mut state, 499);
        assert_eq!(state.events.count("level_up"), 0);
        award_experience(&mut state, 1);
        assert_eq!(state.events.count("level_up"), 1);
        assert_eq!(state.progression.level, 2);
    }
}
