use serde::{Deserialize, Serialize};
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};
use tracing::{info, instrument};
use validator::{Validate, ValidationError};

use crate::error::AppError;
use crate::models::{DbExercise, Exercise, ExerciseOption, ExerciseType, ExerciseWithOptions};
use crate::validation::Patch;

use super::lessons::get_lesson;
use super::options::fetch_options;

pub(crate) const EXERCISE_COLUMNS: &str = "id, lesson_id, type AS exercise_type, question, \
     instruction, \"order\", xp_reward, time_limit, created_at, updated_at";

/// An option submitted together with its exercise.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OptionDraft {
    #[validate(length(min = 1, message = "Option text is required"))]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
    pub order: Option<i64>,
    pub image_src: Option<String>,
    pub audio_src: Option<String>,
}

fn has_correct_option(options: &[OptionDraft]) -> Result<(), ValidationError> {
    if options.is_empty() || options.iter().any(|o| o.is_correct) {
        return Ok(());
    }

    let mut err = ValidationError::new("no_correct_option");
    err.message = Some("At least one option must be marked as correct".into());
    Err(err)
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseInput {
    pub lesson_id: i64,
    #[serde(rename = "type")]
    pub exercise_type: ExerciseType,
    #[validate(length(min = 3, message = "Question must be at least 3 characters long"))]
    pub question: String,
    pub instruction: Option<String>,
    pub order: i64,
    #[validate(range(min = 0, message = "XP reward must be a positive number"))]
    pub xp_reward: Option<i64>,
    #[validate(range(min = 1, message = "Time limit must be at least 1 second"))]
    pub time_limit: Option<i64>,
    #[validate(
        length(min = 2, message = "At least two options are required"),
        custom(function = "has_correct_option"),
        nested
    )]
    pub options: Vec<OptionDraft>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseUpdate {
    #[serde(rename = "type")]
    pub exercise_type: Option<ExerciseType>,
    #[validate(length(min = 3, message = "Question must be at least 3 characters long"))]
    pub question: Option<String>,
    pub instruction: Option<String>,
    pub order: Option<i64>,
    #[validate(range(min = 0, message = "XP reward must be a positive number"))]
    pub xp_reward: Option<i64>,
    #[validate(range(min = 1, message = "Time limit must be at least 1 second"))]
    pub time_limit: Option<i64>,
    /// Replaces every option of the exercise when present.
    #[validate(custom(function = "has_correct_option"), nested)]
    pub options: Option<Vec<OptionDraft>>,
}

impl Patch for ExerciseUpdate {
    fn is_empty(&self) -> bool {
        self.exercise_type.is_none()
            && self.question.is_none()
            && self.instruction.is_none()
            && self.order.is_none()
            && self.xp_reward.is_none()
            && self.time_limit.is_none()
            && self.options.is_none()
    }
}

async fn fetch_exercise(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Exercise>, AppError> {
    let sql = format!("SELECT {} FROM exercises WHERE id = ?", EXERCISE_COLUMNS);
    let row = sqlx::query_as::<_, DbExercise>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(row.map(Exercise::from))
}

async fn insert_options(
    conn: &mut SqliteConnection,
    exercise_id: i64,
    options: &[OptionDraft],
) -> Result<(), AppError> {
    for (i, option) in options.iter().enumerate() {
        sqlx::query(
            "INSERT INTO exercise_options (exercise_id, text, is_correct, \"order\", image_src, audio_src)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(exercise_id)
        .bind(&option.text)
        .bind(option.is_correct)
        .bind(option.order.unwrap_or(i as i64 + 1))
        .bind(&option.image_src)
        .bind(&option.audio_src)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

#[instrument(skip(pool))]
pub async fn list_exercises(
    pool: &Pool<Sqlite>,
    lesson_id: Option<i64>,
    exercise_type: Option<ExerciseType>,
) -> Result<Vec<Exercise>, AppError> {
    info!("Listing exercises");

    let mut query = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {} FROM exercises WHERE 1 = 1",
        EXERCISE_COLUMNS
    ));

    if let Some(lesson_id) = lesson_id {
        query.push(" AND lesson_id = ").push_bind(lesson_id);
    }
    if let Some(exercise_type) = exercise_type {
        query.push(" AND type = ").push_bind(exercise_type.as_str());
    }

    query.push(" ORDER BY lesson_id ASC, \"order\" ASC, id ASC");

    let rows = query.build_query_as::<DbExercise>().fetch_all(pool).await?;

    Ok(rows.into_iter().map(Exercise::from).collect())
}

#[instrument(skip(pool))]
pub async fn get_exercise(pool: &Pool<Sqlite>, id: i64) -> Result<Exercise, AppError> {
    info!("Fetching exercise");

    let mut conn = pool.acquire().await?;
    fetch_exercise(&mut conn, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Exercise with id {} not found", id)))
}

#[instrument(skip(pool))]
pub async fn get_exercise_with_options(
    pool: &Pool<Sqlite>,
    id: i64,
) -> Result<ExerciseWithOptions<ExerciseOption>, AppError> {
    let exercise = get_exercise(pool, id).await?;
    let mut conn = pool.acquire().await?;
    let options = fetch_options(&mut conn, id).await?;

    Ok(ExerciseWithOptions { exercise, options })
}

/// Exercises of a lesson in order, each with its options.
#[instrument(skip(pool))]
pub async fn exercises_for_lesson(
    pool: &Pool<Sqlite>,
    lesson_id: i64,
) -> Result<Vec<ExerciseWithOptions<ExerciseOption>>, AppError> {
    get_lesson(pool, lesson_id).await?;

    let exercises = list_exercises(pool, Some(lesson_id), None).await?;
    let mut conn = pool.acquire().await?;
    let mut result = Vec::with_capacity(exercises.len());

    for exercise in exercises {
        let options = fetch_options(&mut conn, exercise.id).await?;
        result.push(ExerciseWithOptions { exercise, options });
    }

    Ok(result)
}

#[instrument(skip(pool, input), fields(lesson_id = input.lesson_id))]
pub async fn create_exercise(
    pool: &Pool<Sqlite>,
    input: &ExerciseInput,
) -> Result<ExerciseWithOptions<ExerciseOption>, AppError> {
    info!("Creating exercise");

    get_lesson(pool, input.lesson_id).await?;

    let mut tx = pool.begin().await?;

    let exercise_id = sqlx::query(
        "INSERT INTO exercises (lesson_id, type, question, instruction, \"order\", xp_reward, time_limit)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(input.lesson_id)
    .bind(input.exercise_type.as_str())
    .bind(&input.question)
    .bind(&input.instruction)
    .bind(input.order)
    .bind(input.xp_reward.unwrap_or(1))
    .bind(input.time_limit)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    insert_options(&mut tx, exercise_id, &input.options).await?;

    tx.commit().await?;

    info!(exercise_id, "Exercise created");
    get_exercise_with_options(pool, exercise_id).await
}

#[instrument(skip(pool, update))]
pub async fn update_exercise(
    pool: &Pool<Sqlite>,
    id: i64,
    update: &ExerciseUpdate,
) -> Result<ExerciseWithOptions<ExerciseOption>, AppError> {
    info!("Updating exercise");

    let mut tx = pool.begin().await?;

    let res = sqlx::query(
        "UPDATE exercises SET
            type = COALESCE(?, type),
            question = COALESCE(?, question),
            instruction = COALESCE(?, instruction),
            \"order\" = COALESCE(?, \"order\"),
            xp_reward = COALESCE(?, xp_reward),
            time_limit = COALESCE(?, time_limit),
            updated_at = CURRENT_TIMESTAMP
         WHERE id = ?",
    )
    .bind(update.exercise_type.map(|t| t.as_str()))
    .bind(&update.question)
    .bind(&update.instruction)
    .bind(update.order)
    .bind(update.xp_reward)
    .bind(update.time_limit)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Exercise with id {} not found", id)));
    }

    if let Some(options) = &update.options {
        sqlx::query("DELETE FROM exercise_options WHERE exercise_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_options(&mut tx, id, options).await?;
    }

    tx.commit().await?;

    get_exercise_with_options(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_exercise(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting exercise");

    let res = sqlx::query("DELETE FROM exercises WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Exercise with id {} not found", id)));
    }

    Ok(())
}
