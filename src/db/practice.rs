use chrono::NaiveDate;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::practice::{PracticeDay, PracticeInput, PracticeLog, toggle_favorite};

#[derive(sqlx::FromRow)]
struct DbPracticeDay {
    day: NaiveDate,
    xp: i64,
    lessons: i64,
    correct: i64,
    total: i64,
    minutes: i64,
    sessions: i64,
    words: i64,
}

impl From<DbPracticeDay> for PracticeDay {
    fn from(db: DbPracticeDay) -> Self {
        Self {
            date: db.day,
            xp: db.xp,
            lessons: db.lessons,
            correct: db.correct,
            total: db.total,
            minutes: db.minutes,
            sessions: db.sessions,
            words: db.words,
        }
    }
}

#[instrument(skip(pool))]
pub async fn load_practice_log(pool: &Pool<Sqlite>, user_id: i64) -> Result<PracticeLog, AppError> {
    info!("Loading practice log");

    let rows = sqlx::query_as::<_, DbPracticeDay>(
        "SELECT day, xp, lessons, correct, total, minutes, sessions, words
         FROM practice_days WHERE user_id = ? ORDER BY day ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(PracticeLog {
        days: rows
            .into_iter()
            .map(PracticeDay::from)
            .map(|day| (day.date, day))
            .collect(),
    })
}

/// Adds a practice session to the user's aggregate for its day.
#[instrument(skip(pool, input))]
pub async fn record_practice(
    pool: &Pool<Sqlite>,
    user_id: i64,
    today: NaiveDate,
    input: &PracticeInput,
) -> Result<PracticeDay, AppError> {
    info!("Recording practice session");

    let date = input.date.unwrap_or(today);
    let delta = input.apply_to(&PracticeDay::empty(date));

    // One additive upsert, so concurrent sessions for a day never read a stale row.
    let row = sqlx::query_as::<_, DbPracticeDay>(
        "INSERT INTO practice_days (user_id, day, xp, lessons, correct, total, minutes, sessions, words)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (user_id, day) DO UPDATE SET
            xp = practice_days.xp + excluded.xp,
            lessons = practice_days.lessons + excluded.lessons,
            correct = practice_days.correct + excluded.correct,
            total = practice_days.total + excluded.total,
            minutes = practice_days.minutes + excluded.minutes,
            sessions = practice_days.sessions + excluded.sessions,
            words = practice_days.words + excluded.words
         RETURNING day, xp, lessons, correct, total, minutes, sessions, words",
    )
    .bind(user_id)
    .bind(delta.date)
    .bind(delta.xp)
    .bind(delta.lessons)
    .bind(delta.correct)
    .bind(delta.total)
    .bind(delta.minutes)
    .bind(delta.sessions)
    .bind(delta.words)
    .fetch_one(pool)
    .await?;

    Ok(PracticeDay::from(row))
}

#[instrument(skip(pool))]
pub async fn list_favorite_words(
    pool: &Pool<Sqlite>,
    user_id: i64,
) -> Result<Vec<String>, AppError> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT word_id FROM favorite_words WHERE user_id = ? ORDER BY created_at ASC, rowid ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(word,)| word).collect())
}

/// Flips a word's favorite flag and returns the resulting list.
#[instrument(skip(pool))]
pub async fn toggle_favorite_word(
    pool: &Pool<Sqlite>,
    user_id: i64,
    word_id: &str,
) -> Result<Vec<String>, AppError> {
    info!("Toggling favorite word");

    let current = list_favorite_words(pool, user_id).await?;
    let next = toggle_favorite(&current, word_id);

    if next.len() > current.len() {
        sqlx::query("INSERT OR IGNORE INTO favorite_words (user_id, word_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(word_id)
            .execute(pool)
            .await?;
    } else {
        sqlx::query("DELETE FROM favorite_words WHERE user_id = ? AND word_id = ?")
            .bind(user_id)
            .bind(word_id)
            .execute(pool)
            .await?;
    }

    Ok(next)
}
