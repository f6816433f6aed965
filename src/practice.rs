//! Daily practice aggregates, goals and favorites.
//!
//! The same shapes are stored by the browser under the `gg_*_v1` keys and
//! by the server in `practice_days`, so both sides share these types.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use validator::Validate;

pub const PRACTICE_LOG_KEY: &str = "gg_practice_log_v1";
pub const DAILY_GOAL_KEY: &str = "gg_daily_goal_v1";
pub const FAVORITE_WORDS_KEY: &str = "gg_favorite_words_v1";

const MAX_STREAK_LOOKBACK: i64 = 365;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeDay {
    pub date: NaiveDate,
    pub xp: i64,
    pub lessons: i64,
    pub correct: i64,
    pub total: i64,
    pub minutes: i64,
    pub sessions: i64,
    pub words: i64,
}

impl PracticeDay {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            xp: 0,
            lessons: 0,
            correct: 0,
            total: 0,
            minutes: 0,
            sessions: 0,
            words: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.xp != 0 || self.minutes != 0 || self.words != 0
    }
}

/// Amounts to add to a day. Missing fields add nothing, except `sessions`
/// which counts one session unless told otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct PracticeInput {
    pub date: Option<NaiveDate>,
    #[validate(range(min = 0, max = 100_000, message = "XP must be between 0 and 100000"))]
    pub xp: Option<i64>,
    #[validate(range(min = 0, max = 1_000, message = "Lessons must be between 0 and 1000"))]
    pub lessons: Option<i64>,
    #[validate(range(min = 0, max = 10_000, message = "Correct must be between 0 and 10000"))]
    pub correct: Option<i64>,
    #[validate(range(min = 0, max = 10_000, message = "Total must be between 0 and 10000"))]
    pub total: Option<i64>,
    #[validate(range(min = 0, max = 1_440, message = "Minutes must be between 0 and 1440"))]
    pub minutes: Option<i64>,
    #[validate(range(min = 0, max = 100, message = "Sessions must be between 0 and 100"))]
    pub sessions: Option<i64>,
    #[validate(range(min = 0, max = 10_000, message = "Words must be between 0 and 10000"))]
    pub words: Option<i64>,
}

impl PracticeInput {
    pub fn apply_to(&self, day: &PracticeDay) -> PracticeDay {
        let add = |current: i64, amount: Option<i64>| current.saturating_add(amount.unwrap_or(0));

        PracticeDay {
            date: day.date,
            xp: add(day.xp, self.xp),
            lessons: add(day.lessons, self.lessons),
            correct: add(day.correct, self.correct),
            total: add(day.total, self.total),
            minutes: add(day.minutes, self.minutes),
            sessions: add(day.sessions, Some(self.sessions.filter(|s| *s != 0).unwrap_or(1))),
            words: add(day.words, self.words),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    #[default]
    Xp,
    Minutes,
}

impl GoalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalType::Xp => "xp",
            GoalType::Minutes => "minutes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyGoal {
    #[serde(rename = "type")]
    pub goal_type: GoalType,
    pub target: i64,
}

impl Default for DailyGoal {
    fn default() -> Self {
        Self {
            goal_type: GoalType::Xp,
            target: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyProgress {
    pub goal: DailyGoal,
    pub xp: i64,
    pub minutes: i64,
    pub value: i64,
    pub percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeTotals {
    pub xp: i64,
    pub lessons: i64,
    pub minutes: i64,
    pub words: i64,
    pub sessions: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PracticeLog {
    pub days: BTreeMap<NaiveDate, PracticeDay>,
}

impl PracticeLog {
    pub fn day(&self, date: NaiveDate) -> PracticeDay {
        self.days
            .get(&date)
            .cloned()
            .unwrap_or_else(|| PracticeDay::empty(date))
    }

    pub fn record(&mut self, today: NaiveDate, input: &PracticeInput) -> PracticeDay {
        let date = input.date.unwrap_or(today);
        let updated = input.apply_to(&self.day(date));
        self.days.insert(date, updated.clone());
        updated
    }

    pub fn daily_progress(&self, date: NaiveDate, goal: DailyGoal) -> DailyProgress {
        let day = self.day(date);
        let value = match goal.goal_type {
            GoalType::Xp => day.xp,
            GoalType::Minutes => day.minutes,
        };
        let percent = if goal.target > 0 {
            (value as f64 / goal.target as f64 * 100.0).min(100.0)
        } else {
            0.0
        };

        DailyProgress {
            goal,
            xp: day.xp,
            minutes: day.minutes,
            value,
            percent,
        }
    }

    /// The last `days` days ending with `today`, oldest first.
    pub fn weekly_activity(&self, today: NaiveDate, days: i64) -> Vec<PracticeDay> {
        (0..days.max(0))
            .rev()
            .map(|offset| self.day(today - Duration::days(offset)))
            .collect()
    }

    pub fn streak_days(&self, today: NaiveDate) -> i64 {
        (0..MAX_STREAK_LOOKBACK)
            .take_while(|offset| {
                self.days
                    .get(&(today - Duration::days(*offset)))
                    .is_some_and(PracticeDay::is_active)
            })
            .count() as i64
    }

    pub fn totals(&self) -> PracticeTotals {
        self.days
            .values()
            .fold(PracticeTotals::default(), |mut acc, day| {
                acc.xp += day.xp;
                acc.lessons += day.lessons;
                acc.minutes += day.minutes;
                acc.words += day.words;
                acc.sessions += day.sessions;
                acc
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSummary {
    pub today: DailyProgress,
    pub weekly_activity: Vec<PracticeDay>,
    pub streak_days: i64,
    pub totals: PracticeTotals,
}

impl PracticeSummary {
    pub fn build(log: &PracticeLog, today: NaiveDate, goal: DailyGoal) -> Self {
        Self {
            today: log.daily_progress(today, goal),
            weekly_activity: log.weekly_activity(today, 7),
            streak_days: log.streak_days(today),
            totals: log.totals(),
        }
    }
}

/// Parses stored JSON, falling back to `fallback` when it is missing or
/// malformed.
pub fn parse_or<T: DeserializeOwned>(raw: Option<&str>, fallback: T) -> T {
    match raw {
        Some(raw) if !raw.trim().is_empty() => match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(error = %err, "Discarding malformed stored value");
                fallback
            }
        },
        _ => fallback,
    }
}

pub fn parse_practice_log(raw: Option<&str>) -> PracticeLog {
    parse_or(raw, PracticeLog::default())
}

pub fn parse_daily_goal(raw: Option<&str>) -> DailyGoal {
    parse_or(raw, DailyGoal::default())
}

pub fn parse_favorite_words(raw: Option<&str>) -> Vec<String> {
    parse_or(raw, Vec::new())
}

/// Adds `id` if absent, removes it otherwise. Order of the rest is kept.
pub fn toggle_favorite(favorites: &[String], id: &str) -> Vec<String> {
    if favorites.iter().any(|f| f == id) {
        favorites.iter().filter(|f| *f != id).cloned().collect()
    } else {
        let mut next = favorites.to_vec();
        next.push(id.to_string());
        next
    }
}
