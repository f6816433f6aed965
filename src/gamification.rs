//! XP, levels, hearts and streak rules shared by the answer checker and the
//! login flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_HEARTS: i64 = 5;
pub const MIN_CORRECT_SCORE: i64 = 10;

const ATTEMPT_PENALTY: i64 = 20;
const MAX_TIME_BONUS: f64 = 20.0;
const LEVEL_CAP: i64 = 100;

/// Total XP needed to reach `level`.
pub fn required_xp_for_level(level: i64) -> i64 {
    match level {
        i64::MIN..=1 => 0,
        2 => 50,
        3 => 120,
        4 => 250,
        5 => 370,
        6 => 500,
        _ => (100.0 * (level as f64).powf(1.8)).round() as i64,
    }
}

pub fn level_for_xp(xp: i64) -> i64 {
    let mut level = 1;
    while level < LEVEL_CAP && xp >= required_xp_for_level(level + 1) {
        level += 1;
    }
    level
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelUp {
    pub leveled_up: bool,
    pub new_level: i64,
    pub xp_for_next_level: i64,
}

pub fn check_level_up(current_level: i64, new_xp: i64) -> LevelUp {
    let new_level = level_for_xp(new_xp).max(current_level.max(1));

    LevelUp {
        leveled_up: new_level > current_level,
        new_level,
        xp_for_next_level: required_xp_for_level(new_level + 1),
    }
}

/// XP multiplier for a run of consecutive correct answers.
pub fn streak_multiplier(answer_streak: i64) -> f64 {
    match answer_streak {
        i64::MIN..=4 => 1.0,
        5..=10 => 2.5,
        11..=15 => 3.0,
        _ => 4.0,
    }
}

pub fn xp_with_multiplier(base_xp: i64, answer_streak: i64) -> i64 {
    (base_xp as f64 * streak_multiplier(answer_streak)).round() as i64
}

/// Score for one answer. `attempts` includes the current one. A time bonus
/// needs both a limit and a non-zero time taken.
pub fn attempt_score(
    is_correct: bool,
    attempts: i64,
    time_taken: Option<i64>,
    time_limit: Option<i64>,
) -> i64 {
    if !is_correct {
        return 0;
    }

    let penalty = ATTEMPT_PENALTY.saturating_mul(attempts.max(1) - 1);

    let time_bonus = match (time_taken, time_limit) {
        (Some(taken), Some(limit)) if limit > 0 && taken > 0 => {
            let remaining = limit.saturating_sub(taken).clamp(0, limit) as f64;
            (MAX_TIME_BONUS * remaining / limit as f64).round() as i64
        }
        _ => 0,
    };

    100i64
        .saturating_sub(penalty)
        .saturating_add(time_bonus)
        .max(MIN_CORRECT_SCORE)
}

/// Hearts only move while an exercise is still open.
pub fn heart_change(is_correct: bool, already_completed: bool, hearts: i64) -> i64 {
    if already_completed {
        return 0;
    }

    let next = if is_correct {
        (hearts + 1).min(MAX_HEARTS)
    } else {
        (hearts - 1).max(0)
    };

    next - hearts
}

pub fn next_answer_streak(is_correct: bool, already_completed: bool, answer_streak: i64) -> i64 {
    match (is_correct, already_completed) {
        (false, _) => 0,
        (true, false) => answer_streak + 1,
        (true, true) => answer_streak,
    }
}

/// Daily login streak given the previous login time.
pub fn next_login_streak(
    last_login: Option<DateTime<Utc>>,
    current_streak: i64,
    now: DateTime<Utc>,
) -> i64 {
    let Some(last_login) = last_login else {
        return 1;
    };

    let days = (now.date_naive() - last_login.date_naive()).num_days();

    match days {
        i64::MIN..=0 => current_streak.max(1),
        1 => current_streak + 1,
        _ => 1,
    }
}
